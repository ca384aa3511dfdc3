// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the cookie-session backends: `enhanced`, `voyager`
//! and `headless`

use std::{sync::Arc, time::Duration};

use provider_client::{FailureKind, Provider};
use providers::{HeadlessClient, HeadlessConfig, VoyagerClient, VoyagerConfig};
use serde_json::json;
use shared_types::{EntityKey, EntityKind};
use tokio::task::JoinSet;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

mod fixtures;
use fixtures::*;

fn create_voyager_config(base_url: String) -> VoyagerConfig {
    VoyagerConfig::new(base_url, TEST_TIMEOUT_SECONDS).unwrap()
}

fn create_headless_client(base_url: String) -> HeadlessClient {
    HeadlessClient::new(HeadlessConfig::new(base_url, TEST_TIMEOUT_SECONDS, 3000).unwrap()).unwrap()
}

fn profile(identifier: &str) -> EntityKey {
    EntityKey::new(EntityKind::Profile, identifier)
}

#[tokio::test]
async fn enhanced_profile_sends_session_and_fingerprint() {
    let server = MockServer::start().await;
    let client = VoyagerClient::enhanced(create_voyager_config(server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/identity/dash/profiles"))
        .and(query_param("q", "memberIdentity"))
        .and(query_param("memberIdentity", "jane-doe"))
        .and(header(
            "cookie",
            format!("li_at={TEST_LI_AT}; JSESSIONID=\"{TEST_JSESSIONID}\"").as_str(),
        ))
        .and(header("csrf-token", TEST_JSESSIONID))
        .and(header("sec-ch-ua-platform", "\"macOS\""))
        .and(header("accept", "application/vnd.linkedin.normalized+json+2.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"*elements": ["urn:li:fsd_profile:ACoAAA"]},
            "included": [{"firstName": "Jane", "lastName": "Doe"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .fetch(
            &profile("https://www.linkedin.com/in/jane-doe/"),
            &bundle_for(&client),
        )
        .await
        .unwrap();

    assert_eq!(payload["included"][0]["firstName"], "Jane");
}

/// The client never makes one call wait for another, so every call fits in
/// the attempt deadline even when they all arrive together.
#[tokio::test]
async fn concurrent_enhanced_fetches_each_fit_the_attempt_deadline() {
    let server = MockServer::start().await;
    let client = Arc::new(VoyagerClient::enhanced(create_voyager_config(server.uri())).unwrap());

    Mock::given(method("GET"))
        .and(path("/identity/dash/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"*elements": ["urn:li:fsd_profile:ACoAAA"]}
        })))
        .expect(6)
        .mount(&server)
        .await;

    let deadline = client.descriptor().timeout();
    assert_eq!(deadline, Duration::from_secs(TEST_TIMEOUT_SECONDS));

    let mut calls = JoinSet::new();
    for member in 0..6 {
        let client = Arc::clone(&client);
        calls.spawn(async move {
            let key = profile(&format!("member-{member}"));
            let bundle = bundle_for(client.as_ref());
            tokio::time::timeout(deadline, client.fetch(&key, &bundle)).await
        });
    }

    let mut timed_out = 0;
    let mut answered = 0;
    while let Some(joined) = calls.join_next().await {
        match joined.unwrap() {
            Ok(result) => {
                assert!(result.is_ok(), "unexpected failure: {result:?}");
                answered += 1;
            }
            Err(_) => timed_out += 1,
        }
    }
    assert_eq!(timed_out, 0);
    assert_eq!(answered, 6);
}

#[tokio::test]
async fn session_flavour_uses_plain_headers() {
    let server = MockServer::start().await;
    let client = VoyagerClient::session(create_voyager_config(server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/identity/profiles/jane-doe/profileView"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "profile": {"firstName": "Jane"}
        })))
        .mount(&server)
        .await;

    let payload = client
        .fetch(&profile("jane-doe"), &bundle_for(&client))
        .await
        .unwrap();
    let requests = server.received_requests().await.unwrap();

    assert_eq!(payload["profile"]["firstName"], "Jane");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("sec-ch-ua").is_none());
    assert!(requests[0].headers.get("csrf-token").is_some());
}

#[tokio::test]
async fn empty_session_response_is_bot_detection() {
    let server = MockServer::start().await;
    let client = VoyagerClient::session(create_voyager_config(server.uri())).unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client.fetch(&profile("jane-doe"), &bundle_for(&client)).await;

    assert_eq!(result.unwrap_err(), FailureKind::BotDetected);
}

#[tokio::test]
async fn auth_wall_redirect_is_expired_auth() {
    let server = MockServer::start().await;
    let client = VoyagerClient::session(create_voyager_config(server.uri())).unwrap();

    Mock::given(path("/identity/profiles/jane-doe/profileView"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/authwall?trk=x"))
        .mount(&server)
        .await;
    Mock::given(path("/authwall"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
        .mount(&server)
        .await;

    let result = client.fetch(&profile("jane-doe"), &bundle_for(&client)).await;

    assert_eq!(result.unwrap_err(), FailureKind::AuthExpired);
}

#[tokio::test]
async fn checkpoint_redirect_is_bot_detection() {
    let server = MockServer::start().await;
    let client = VoyagerClient::enhanced(create_voyager_config(server.uri())).unwrap();

    Mock::given(path("/organization/companies"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/checkpoint/challenge/abc"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/checkpoint/challenge/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>verify</html>"))
        .mount(&server)
        .await;

    let key = EntityKey::new(EntityKind::Company, "acme");
    let result = client.fetch(&key, &bundle_for(&client)).await;

    assert_eq!(result.unwrap_err(), FailureKind::BotDetected);
}

#[tokio::test]
async fn blocked_status_is_bot_detection() {
    let server = MockServer::start().await;
    let client = VoyagerClient::enhanced(create_voyager_config(server.uri())).unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(999))
        .mount(&server)
        .await;

    let result = client.fetch(&profile("jane-doe"), &bundle_for(&client)).await;

    assert_eq!(result.unwrap_err(), FailureKind::BotDetected);
}

#[tokio::test]
async fn company_lookup_takes_first_element() {
    let server = MockServer::start().await;
    let client = VoyagerClient::session(create_voyager_config(server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/organization/companies"))
        .and(query_param("universalName", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [{"name": "Acme", "staffCount": 2100}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organization/companies"))
        .and(query_param("universalName", "ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"elements": []})))
        .mount(&server)
        .await;

    let bundle = bundle_for(&client);
    let found = client
        .fetch(&EntityKey::new(EntityKind::Company, "acme"), &bundle)
        .await
        .unwrap();
    let missing = client
        .fetch(&EntityKey::new(EntityKind::Company, "ghost"), &bundle)
        .await;

    assert_eq!(found["name"], "Acme");
    assert_eq!(missing.unwrap_err(), FailureKind::NotFound);
}

#[tokio::test]
async fn session_flavour_cannot_read_posts() {
    let server = MockServer::start().await;
    let client = VoyagerClient::session(create_voyager_config(server.uri())).unwrap();

    let key = EntityKey::new(EntityKind::Post, "7150000000000000000");
    let result = client.fetch(&key, &bundle_for(&client)).await;

    assert!(!client.descriptor().supports(EntityKind::Post));
    assert_eq!(result.unwrap_err(), FailureKind::Unsupported);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn headless_render_success() {
    let server = MockServer::start().await;
    let client = create_headless_client(server.uri());

    Mock::given(method("POST"))
        .and(path("/render"))
        .and(body_partial_json(json!({
            "url": "https://www.linkedin.com/in/jane-doe",
            "wait_until": "networkidle",
            "scroll": true,
            "cookies": [
                {"name": "li_at", "value": TEST_LI_AT, "domain": ".linkedin.com"},
                {"name": "JSESSIONID", "value": format!("\"{TEST_JSESSIONID}\""), "domain": ".linkedin.com"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_url": "https://www.linkedin.com/in/jane-doe/",
            "status": 200,
            "title": "Jane Doe | LinkedIn",
            "content": {"name": "Jane Doe", "headline": "Staff Engineer"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .fetch(&profile("jane-doe"), &bundle_for(&client))
        .await
        .unwrap();

    assert_eq!(payload["title"], "Jane Doe | LinkedIn");
    assert_eq!(payload["content"]["headline"], "Staff Engineer");
}

#[tokio::test]
async fn headless_classifies_where_navigation_ended() {
    let cases = [
        (
            json!({"final_url": "https://www.linkedin.com/authwall?trk=x", "status": 200, "content": "<html/>"}),
            FailureKind::AuthExpired,
        ),
        (
            json!({"final_url": "https://www.linkedin.com/in/jane-doe/", "status": 999, "content": ""}),
            FailureKind::BotDetected,
        ),
        (
            json!({"final_url": "https://www.linkedin.com/in/jane-doe/", "status": 404, "content": "x"}),
            FailureKind::NotFound,
        ),
        (
            json!({"final_url": "https://www.linkedin.com/in/jane-doe/", "status": 200, "content": null}),
            FailureKind::BotDetected,
        ),
        (json!({"status": 200}), FailureKind::MalformedResponse),
    ];

    for (body, expected) in cases {
        let server = MockServer::start().await;
        let client = create_headless_client(server.uri());
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let result = client.fetch(&profile("jane-doe"), &bundle_for(&client)).await;

        assert_eq!(result.unwrap_err(), expected);
    }
}

#[tokio::test]
async fn headless_service_outage_is_transient() {
    let server = MockServer::start().await;
    let client = create_headless_client(server.uri());
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let result = client.fetch(&profile("jane-doe"), &bundle_for(&client)).await;

    assert_eq!(result.unwrap_err(), FailureKind::TransientNetwork);
}
