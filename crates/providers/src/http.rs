// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared HTTP plumbing: client construction and response classification

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, header::RETRY_AFTER, redirect::Policy};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{error::ProviderError, non_empty_string::NonEmptyString};

const USER_AGENT: &str = concat!("network-resolver/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;
const BLOCKED_STATUS: u16 = 999;
const CHALLENGE_MARKERS: [&str; 3] = ["CHALLENGE", "CHECKPOINT", "CAPTCHA"];
const BODY_LOG_LIMIT: usize = 200;
const LOGIN_MARKERS: [&str; 3] = ["/login", "authwall", "/uas/"];

/// Who is on the other end of a request
///
/// Keyed APIs and cookie sessions fail differently: a 403 from a keyed API
/// means the key or subscription is wrong, while an empty 200 from a session
/// endpoint is how blocking usually looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Surface {
    /// Authenticated with an API key or OAuth token
    KeyedApi,
    /// Authenticated with browser session cookies
    Session,
}

/// Build a client with a bounded redirect chain and a transport timeout
pub(crate) fn build_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent.unwrap_or(USER_AGENT))
        .build()
        .map_err(ProviderError::Client)
}

/// `base` with `segments` appended as percent-encoded path segments
pub(crate) fn endpoint_url(base: &NonEmptyString, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base.as_str())
        .map_err(|error| ProviderError::Config(format!("invalid base URL {base}: {error}")))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::Config(format!("base URL {base} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Send `request` and decode a JSON body, classifying every failure
pub(crate) async fn fetch_json(
    request: RequestBuilder,
    surface: Surface,
) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(ProviderError::from_transport)?;
    read_json(response, surface).await
}

/// Decode a JSON body, classifying non-success statuses and empty bodies
pub(crate) async fn read_json(response: Response, surface: Surface) -> Result<Value, ProviderError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().await.map_err(ProviderError::from_transport)?;

    if !status.is_success() {
        return Err(classify_status(status, &body, surface, retry_after));
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(match surface {
            Surface::KeyedApi => ProviderError::EmptyBody,
            Surface::Session => ProviderError::EmptySession,
        });
    }

    Ok(serde_json::from_str(trimmed)?)
}

/// Map a non-success status to an error
pub(crate) fn classify_status(
    status: StatusCode,
    body: &str,
    surface: Surface,
    retry_after: Option<u64>,
) -> ProviderError {
    let code = status.as_u16();
    let error = match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        StatusCode::FORBIDDEN if has_challenge_marker(body) => {
            ProviderError::Challenged { status: code }
        }
        StatusCode::FORBIDDEN => match surface {
            Surface::KeyedApi => ProviderError::SubscriptionRequired {
                message: error_message(body).unwrap_or_else(|| "access denied".to_string()),
            },
            Surface::Session => ProviderError::Forbidden,
        },
        StatusCode::NOT_FOUND => ProviderError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        _ if code == BLOCKED_STATUS => ProviderError::Blocked,
        _ if status.is_server_error() => ProviderError::Upstream { status: code },
        _ if status.is_redirection() => ProviderError::RedirectLoop,
        _ => ProviderError::Rejected { status: code },
    };

    if matches!(error, ProviderError::Upstream { .. } | ProviderError::Rejected { .. }) {
        warn!(status = code, body = %truncate(body), "unexpected response status");
    } else {
        debug!(status = code, %error, "classified response status");
    }
    error
}

/// Classify where a session request ended up after redirects
///
/// Expired sessions are bounced to a login or auth wall; suspicious ones to a
/// checkpoint. Both arrive as ordinary pages, so the location is the signal.
pub(crate) fn classify_landing(location: &str, status: u16) -> Option<ProviderError> {
    let lowered = location.to_ascii_lowercase();
    if LOGIN_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        Some(ProviderError::LoginWall {
            location: location.to_string(),
        })
    } else if lowered.contains("checkpoint") || lowered.contains("challenge") {
        Some(ProviderError::Challenged { status })
    } else {
        None
    }
}

fn has_challenge_marker(body: &str) -> bool {
    let upper = body.to_uppercase();
    CHALLENGE_MARKERS
        .iter()
        .any(|marker| upper.contains(marker))
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(BODY_LOG_LIMIT) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

/// Take `field` out of `body`, treating null, empty arrays and empty objects
/// as "no result"
pub(crate) fn take_data(mut body: Value, field: &str) -> Result<Value, ProviderError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ProviderError::NoData);
    }
    let data = body
        .get_mut(field)
        .map(Value::take)
        .ok_or(ProviderError::NoData)?;
    if is_empty(&data) {
        return Err(ProviderError::NoData);
    }
    Ok(data)
}

/// The first of `fields` holding a non-empty value
pub(crate) fn take_any(mut body: Value, fields: &[&str]) -> Result<Value, ProviderError> {
    for field in fields {
        if let Some(value) = body.get_mut(*field)
            && !is_empty(value)
        {
            return Ok(value.take());
        }
    }
    Err(ProviderError::NoData)
}

/// First element of the array at `field`
pub(crate) fn first_element(mut body: Value, field: &str) -> Result<Value, ProviderError> {
    match body.get_mut(field).map(Value::take) {
        Some(Value::Array(elements)) => elements.into_iter().next().ok_or(ProviderError::NoData),
        Some(Value::Null) | None => Err(ProviderError::NoData),
        Some(other) => Err(ProviderError::Unexpected(format!(
            "expected `{field}` to be an array, got {}",
            kind_name(&other)
        ))),
    }
}

pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn forbidden_depends_on_surface_and_body() {
        assert!(matches!(
            classify_status(status(403), "", Surface::KeyedApi, None),
            ProviderError::SubscriptionRequired { .. }
        ));
        assert!(matches!(
            classify_status(status(403), "", Surface::Session, None),
            ProviderError::Forbidden
        ));
        assert!(matches!(
            classify_status(status(403), "<html>checkpoint/challenge</html>", Surface::KeyedApi, None),
            ProviderError::Challenged { status: 403 }
        ));
    }

    #[test]
    fn subscription_message_is_kept() {
        let error = classify_status(
            status(403),
            r#"{"message": "You are not subscribed to this API."}"#,
            Surface::KeyedApi,
            None,
        );
        assert!(
            matches!(error, ProviderError::SubscriptionRequired { ref message } if message == "You are not subscribed to this API.")
        );
    }

    #[test]
    fn remaining_statuses() {
        assert!(matches!(
            classify_status(status(999), "", Surface::Session, None),
            ProviderError::Blocked
        ));
        assert!(matches!(
            classify_status(status(429), "", Surface::KeyedApi, Some(30)),
            ProviderError::RateLimited {
                retry_after: Some(30)
            }
        ));
        assert!(matches!(
            classify_status(status(502), "", Surface::KeyedApi, None),
            ProviderError::Upstream { status: 502 }
        ));
        assert!(matches!(
            classify_status(status(400), "", Surface::KeyedApi, None),
            ProviderError::Rejected { status: 400 }
        ));
        assert!(matches!(
            classify_status(status(401), "", Surface::Session, None),
            ProviderError::Unauthorized
        ));
    }

    #[test]
    fn landing_pages() {
        assert!(matches!(
            classify_landing("https://www.linkedin.com/authwall?trk=x", 200),
            Some(ProviderError::LoginWall { .. })
        ));
        assert!(matches!(
            classify_landing("https://www.linkedin.com/checkpoint/challenge/abc", 200),
            Some(ProviderError::Challenged { status: 200 })
        ));
        assert!(classify_landing("https://www.linkedin.com/in/jane-doe/", 200).is_none());
    }

    #[test]
    fn take_data_rejects_empty_results() {
        assert_eq!(
            take_data(json!({"data": {"name": "Jane"}}), "data").unwrap(),
            json!({"name": "Jane"})
        );
        assert!(matches!(
            take_data(json!({"data": []}), "data"),
            Err(ProviderError::NoData)
        ));
        assert!(matches!(
            take_data(json!({"success": false, "data": {"x": 1}}), "data"),
            Err(ProviderError::NoData)
        ));
        assert!(matches!(take_data(json!({}), "data"), Err(ProviderError::NoData)));
    }

    #[test]
    fn take_any_prefers_earlier_fields() {
        let body = json!({"leads": [], "data": [{"id": 1}]});
        assert_eq!(take_any(body, &["leads", "data"]).unwrap(), json!([{"id": 1}]));
        assert!(matches!(
            take_any(json!({"leads": []}), &["leads", "data"]),
            Err(ProviderError::NoData)
        ));
    }

    #[test]
    fn endpoint_url_encodes_segments() {
        let base = NonEmptyString::new("https://www.linkedin.com/voyager/api/").unwrap();
        let url = endpoint_url(&base, &["identity", "profiles", "jane doe", "profileView"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.linkedin.com/voyager/api/identity/profiles/jane%20doe/profileView"
        );
    }

    #[test]
    fn first_element_checks_shape() {
        assert_eq!(
            first_element(json!({"elements": [{"id": 1}, {"id": 2}]}), "elements").unwrap(),
            json!({"id": 1})
        );
        assert!(matches!(
            first_element(json!({"elements": []}), "elements"),
            Err(ProviderError::NoData)
        ));
        assert!(matches!(
            first_element(json!({"elements": "nope"}), "elements"),
            Err(ProviderError::Unexpected(_))
        ));
    }
}
