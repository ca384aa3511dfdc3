// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Headless browser rendering service
//!
//! Public pages are loaded in a real browser behind a small render service
//! that accepts the session cookies and returns where navigation ended up
//! along with the extracted page content.

use std::time::Duration;

use async_trait::async_trait;
use provider_client::{CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tracing::debug;
use url::Url;

use crate::{
    error::{ProviderError, classify},
    http::{Surface, build_client, classify_landing, classify_status, endpoint_url, fetch_json, is_empty},
    linkedin::{company_url, post_url, profile_url},
    non_empty_string::NonEmptyString,
};

const COOKIE_DOMAIN: &str = ".linkedin.com";
const WAIT_UNTIL: &str = "networkidle";

/// Configuration for the render service client
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Base URL of the render service
    pub render_url: NonEmptyString,
    /// Transport timeout in seconds, covering the whole render
    pub timeout_seconds: u64,
    /// Navigation budget handed to the browser, in milliseconds
    pub navigation_timeout_ms: u64,
}

impl HeadlessConfig {
    /// Validate and build a config
    ///
    /// # Errors
    ///
    /// Returns an error if `render_url` is blank
    pub fn new(
        render_url: impl Into<String>,
        timeout_seconds: u64,
        navigation_timeout_ms: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            render_url: NonEmptyString::new(render_url)?,
            timeout_seconds,
            navigation_timeout_ms,
        })
    }
}

#[derive(Debug, Serialize)]
struct RenderCookie<'a> {
    name: &'a str,
    value: &'a str,
    domain: &'a str,
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    cookies: Vec<RenderCookie<'a>>,
    wait_until: &'a str,
    timeout_ms: u64,
    scroll: bool,
}

#[derive(Debug, Deserialize)]
struct RenderResult {
    final_url: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Value,
}

/// Client for the render service
#[derive(Debug)]
pub struct HeadlessClient {
    client: Client,
    config: HeadlessConfig,
    descriptor: ProviderDescriptor,
}

impl HeadlessClient {
    /// Registered provider name
    pub const NAME: &'static str = "headless";
    /// Default fallback rank
    pub const RANK: u32 = 5;

    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: HeadlessConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = build_client(timeout, None)?;
        let descriptor = ProviderDescriptor::new(Self::NAME, Self::RANK)
            .requires(CredentialKind::Cookies)
            .capable_of_all([EntityKind::Profile, EntityKind::Company, EntityKind::Post])
            .with_timeout(timeout);

        Ok(Self {
            client,
            config,
            descriptor,
        })
    }

    async fn lookup(
        &self,
        key: &EntityKey,
        credentials: &CredentialBundle,
    ) -> Result<Payload, ProviderError> {
        let (li_at, jsessionid) = credentials
            .cookies()
            .ok_or(ProviderError::MissingCredential(CredentialKind::Cookies))?;
        let target = page_url(key)?;

        let mut cookies = vec![RenderCookie {
            name: "li_at",
            value: li_at,
            domain: COOKIE_DOMAIN,
        }];
        if let Some(jsessionid) = jsessionid {
            cookies.push(RenderCookie {
                name: "JSESSIONID",
                value: jsessionid,
                domain: COOKIE_DOMAIN,
            });
        }
        let render = RenderRequest {
            url: &target,
            cookies,
            wait_until: WAIT_UNTIL,
            timeout_ms: self.config.navigation_timeout_ms,
            scroll: true,
        };

        let url = endpoint_url(&self.config.render_url, &["render"])?;
        debug!(provider = Self::NAME, page = %target, "rendering page");
        let body = fetch_json(self.client.post(url).json(&render), Surface::Session).await?;
        let result: RenderResult = serde_json::from_value(body)?;

        interpret(&target, result)
    }
}

/// Public page for a key
fn page_url(key: &EntityKey) -> Result<String, ProviderError> {
    let id = key.identifier();
    let url = match (key.kind(), key.sub_resource()) {
        (EntityKind::Profile, None) => profile_url(id),
        (EntityKind::Profile, Some("posts")) => {
            format!("{}/recent-activity/all/", profile_url(id).trim_end_matches('/'))
        }
        (EntityKind::Company, None) => company_url(id),
        (EntityKind::Company, Some("posts")) => {
            format!("{}/posts/", company_url(id).trim_end_matches('/'))
        }
        (EntityKind::Post, None) => post_url(id),
        (kind, sub) => {
            return Err(ProviderError::UnsupportedRequest(match sub {
                Some(sub) => format!("{kind} sub-resource `{sub}`"),
                None => format!("{kind} lookups"),
            }));
        }
    };
    Ok(url)
}

/// Decide whether a render produced a usable page
fn interpret(target: &str, result: RenderResult) -> Result<Value, ProviderError> {
    let status = result.status.unwrap_or(200);
    let landing = Url::parse(&result.final_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| result.final_url.clone());
    if let Some(error) = classify_landing(&landing, status) {
        return Err(match error {
            ProviderError::LoginWall { .. } => ProviderError::LoginWall {
                location: result.final_url,
            },
            other => other,
        });
    }

    if let Ok(code) = StatusCode::from_u16(status)
        && !code.is_success()
    {
        return Err(classify_status(code, "", Surface::Session, None));
    }
    if is_empty(&result.content) {
        return Err(ProviderError::EmptySession);
    }

    Ok(json!({
        "url": target,
        "final_url": result.final_url,
        "title": result.title,
        "content": result.content,
    }))
}

#[async_trait]
impl Provider for HeadlessClient {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        key: &EntityKey,
        credentials: &CredentialBundle,
    ) -> Result<Payload, FailureKind> {
        self.lookup(key, credentials)
            .await
            .map_err(|error| classify(Self::NAME, &error))
    }
}
