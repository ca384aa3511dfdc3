// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Official Marketing API (OAuth)
//!
//! Only organizations are reachable with a marketing token. Numeric ids are
//! fetched directly; anything else is resolved through the vanity-name finder.

use std::time::Duration;

use async_trait::async_trait;
use provider_client::{CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor};
use reqwest::Client;
use serde_json::{Value, json};
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tracing::debug;

use crate::{
    error::{ProviderError, classify},
    http::{Surface, build_client, endpoint_url, fetch_json, first_element, is_empty},
    linkedin::{is_numeric_id, slug},
    non_empty_string::NonEmptyString,
};

const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";
const FOLLOWER_EDGE: &str = "COMPANY_FOLLOWED_BY_MEMBER";

/// Configuration for the Marketing API client
#[derive(Debug, Clone)]
pub struct MarketingConfig {
    /// Base URL, without the `/rest` prefix
    pub base_url: NonEmptyString,
    /// Value of the `LinkedIn-Version` header, e.g. `202501`
    pub api_version: NonEmptyString,
    /// Transport timeout in seconds
    pub timeout_seconds: u64,
}

impl MarketingConfig {
    /// Validate and build a config
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` or `api_version` is blank
    pub fn new(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            base_url: NonEmptyString::new(base_url)?,
            api_version: NonEmptyString::new(api_version)?,
            timeout_seconds,
        })
    }
}

/// Client for the Marketing API
#[derive(Debug)]
pub struct MarketingClient {
    client: Client,
    config: MarketingConfig,
    descriptor: ProviderDescriptor,
}

impl MarketingClient {
    /// Registered provider name
    pub const NAME: &'static str = "marketing";
    /// Default fallback rank
    pub const RANK: u32 = 3;

    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: MarketingConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = build_client(timeout, None)?;
        let descriptor = ProviderDescriptor::new(Self::NAME, Self::RANK)
            .requires(CredentialKind::OAuth)
            .capable_of(EntityKind::Company)
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
        let token = credentials
            .oauth_token()
            .ok_or(ProviderError::MissingCredential(CredentialKind::OAuth))?;
        if key.kind() != EntityKind::Company {
            return Err(ProviderError::UnsupportedRequest(format!(
                "{} lookups",
                key.kind()
            )));
        }

        let id = key.identifier().trim();
        match key.sub_resource() {
            None if is_numeric_id(id) => {
                let body = self.get(&["rest", "organizations", id], &[], token).await?;
                if is_empty(&body) {
                    return Err(ProviderError::NoData);
                }
                Ok(body)
            }
            None => {
                let vanity = slug(id);
                let body = self
                    .get(
                        &["rest", "organizations"],
                        &[("q", "vanityName"), ("vanityName", vanity.as_str())],
                        token,
                    )
                    .await?;
                first_element(body, "elements")
            }
            Some("followers") if is_numeric_id(id) => self.follower_count(id, token).await,
            Some("followers") => Err(ProviderError::UnsupportedRequest(
                "follower counts need a numeric organization id".to_string(),
            )),
            Some(sub) => Err(ProviderError::UnsupportedRequest(format!(
                "company sub-resource `{sub}`"
            ))),
        }
    }

    async fn follower_count(&self, id: &str, token: &str) -> Result<Value, ProviderError> {
        let urn = format!("urn:li:organization:{id}");
        let body = self
            .get(
                &["rest", "networkSizes", urn.as_str()],
                &[("edgeType", FOLLOWER_EDGE)],
                token,
            )
            .await?;
        let count = body
            .get("firstDegreeSize")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProviderError::Unexpected("missing `firstDegreeSize`".to_string()))?;

        Ok(json!({ "organization_id": id, "follower_count": count }))
    }

    async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<Value, ProviderError> {
        let url = endpoint_url(&self.config.base_url, segments)?;
        debug!(provider = Self::NAME, %url, "calling Marketing API");

        let request = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .header("X-Restli-Protocol-Version", RESTLI_PROTOCOL_VERSION)
            .header("LinkedIn-Version", self.config.api_version.as_str());
        fetch_json(request, Surface::KeyedApi).await
    }
}

#[async_trait]
impl Provider for MarketingClient {
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
