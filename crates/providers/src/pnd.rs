// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Professional Network Data marketplace API
//!
//! The broadest keyed backend: profiles, companies, posts and search, with a
//! handful of sub-resources for each. Every response wraps its result in a
//! `data` field; an empty `data` is reported as "not found" so the engine
//! moves on to the next source.

use std::time::Duration;

use async_trait::async_trait;
use provider_client::{CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor};
use reqwest::Client;
use serde_json::json;
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tracing::debug;

use crate::{
    error::{ProviderError, classify},
    http::{build_client, take_data},
    linkedin::{company_url, post_url, profile_url, slug},
    rapidapi::{RapidApiConfig, RapidApiRequest},
};

/// Default marketplace host
pub const DEFAULT_PND_HOST: &str = "professional-network-data.p.rapidapi.com";

/// Client for the Professional Network Data API
#[derive(Debug)]
pub struct PndClient {
    client: Client,
    config: RapidApiConfig,
    descriptor: ProviderDescriptor,
}

impl PndClient {
    /// Registered provider name
    pub const NAME: &'static str = "pnd";
    /// Default fallback rank
    pub const RANK: u32 = 1;

    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: RapidApiConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = build_client(timeout, None)?;
        let descriptor = ProviderDescriptor::new(Self::NAME, Self::RANK)
            .requires(CredentialKind::ApiKey)
            .capable_of_all(EntityKind::all().iter().copied())
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
        let api_key = credentials
            .api_key()
            .ok_or(ProviderError::MissingCredential(CredentialKind::ApiKey))?;
        let request = route(key)?;
        debug!(provider = Self::NAME, path = request.path(), %key, "calling marketplace API");

        let body = request.send(&self.client, &self.config, api_key).await?;
        take_data(body, "data")
    }
}

/// Map a key onto its endpoint
fn route(key: &EntityKey) -> Result<RapidApiRequest, ProviderError> {
    let id = key.identifier();
    let request = match (key.kind(), key.sub_resource()) {
        (EntityKind::Profile, None) => RapidApiRequest::get("/person", [("link", profile_url(id))]),
        (EntityKind::Profile, Some("posts")) => RapidApiRequest::get(
            "/person-posts",
            [("link", profile_url(id)), ("type", "posts".to_string())],
        ),
        (EntityKind::Profile, Some("network")) => {
            RapidApiRequest::get("/person-network", [("link", profile_url(id))])
        }
        (EntityKind::Profile, Some("similar")) => {
            RapidApiRequest::get("/similar-profiles", [("url", profile_url(id))])
        }
        (EntityKind::Profile, Some("articles")) => {
            RapidApiRequest::get("/get-user-articles", [("username", slug(id))])
        }
        (EntityKind::Company, None) => RapidApiRequest::get("/company", [("link", company_url(id))]),
        (EntityKind::Company, Some("posts")) => RapidApiRequest::get(
            "/company-posts",
            [("link", company_url(id)), ("sort_by", "recent".to_string())],
        ),
        (EntityKind::Post, None) => RapidApiRequest::get("/post", [("link", post_url(id))]),
        (EntityKind::Post, Some("comments")) => RapidApiRequest::get(
            "/post-comments",
            [("link", post_url(id)), ("sort_by", "Most relevant".to_string())],
        ),
        (EntityKind::Post, Some("reactions")) => RapidApiRequest::get(
            "/post-reactions",
            [("link", post_url(id)), ("type", "ALL".to_string())],
        ),
        (EntityKind::Search, None | Some("people")) => {
            RapidApiRequest::post("/search-people", json!({ "keywords": id }))
        }
        (EntityKind::Search, Some("companies")) => {
            RapidApiRequest::post("/search-companies", json!({ "keyword": id }))
        }
        (EntityKind::Search, Some("posts")) => RapidApiRequest::post(
            "/search-posts",
            json!({ "keyword": id, "sortBy": "date_posted" }),
        ),
        (kind, Some(sub)) => {
            return Err(ProviderError::UnsupportedRequest(format!(
                "{kind} sub-resource `{sub}`"
            )));
        }
    };
    Ok(request)
}

#[async_trait]
impl Provider for PndClient {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_addressed_by_public_url() {
        let request = route(&EntityKey::new(EntityKind::Profile, "jane-doe")).unwrap();
        assert_eq!(
            request,
            RapidApiRequest::get("/person", [("link", "https://www.linkedin.com/in/jane-doe")])
        );
    }

    #[test]
    fn articles_use_the_bare_slug() {
        let key = EntityKey::new(EntityKind::Profile, "https://www.linkedin.com/in/jane-doe/")
            .with_sub_resource("articles");
        assert_eq!(
            route(&key).unwrap(),
            RapidApiRequest::get("/get-user-articles", [("username", "jane-doe")])
        );
    }

    #[test]
    fn search_is_posted() {
        let key = EntityKey::new(EntityKind::Search, "rust engineer").with_sub_resource("people");
        assert_eq!(
            route(&key).unwrap(),
            RapidApiRequest::post("/search-people", json!({ "keywords": "rust engineer" }))
        );
    }

    #[test]
    fn unknown_sub_resources_are_unsupported() {
        let key = EntityKey::new(EntityKind::Company, "acme").with_sub_resource("payroll");
        assert!(matches!(
            route(&key),
            Err(ProviderError::UnsupportedRequest(message)) if message.contains("payroll")
        ));
    }
}
