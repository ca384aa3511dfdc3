// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fresh LinkedIn Profile Data marketplace API
//!
//! Profiles and companies are single calls. People search is a job: the
//! submit call returns a `request_id` that is polled until the job completes,
//! fails, or the polling budget runs out. A job still pending after the last
//! poll is reported as a timeout.

use std::time::Duration;

use async_trait::async_trait;
use provider_client::{CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor};
use reqwest::Client;
use serde_json::{Value, json};
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tokio_retry::{RetryIf, strategy::FixedInterval};
use tracing::{debug, info};

use crate::{
    error::{ProviderError, classify},
    http::{build_client, take_any, take_data},
    linkedin::{company_url, profile_url},
    rapidapi::{RapidApiConfig, RapidApiRequest},
};

/// Default marketplace host
pub const DEFAULT_FRESH_DATA_HOST: &str = "web-scraping-api2.p.rapidapi.com";

const PENDING_STATES: [&str; 3] = ["pending", "processing", "in_progress"];

/// How a search job is polled
#[derive(Debug, Clone, Copy)]
pub struct SearchPolling {
    /// Delay between status checks
    pub interval: Duration,
    /// Status checks made before giving up
    pub attempts: usize,
}

impl Default for SearchPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempts: 5,
        }
    }
}

/// Client for the Fresh Data API
#[derive(Debug)]
pub struct FreshDataClient {
    client: Client,
    config: RapidApiConfig,
    polling: SearchPolling,
    descriptor: ProviderDescriptor,
}

/// What a key maps to on this backend
enum Route {
    Single(RapidApiRequest, &'static [&'static str]),
    PeopleSearch(String),
}

impl FreshDataClient {
    /// Registered provider name
    pub const NAME: &'static str = "fresh_data";
    /// Default fallback rank
    pub const RANK: u32 = 2;

    /// Create a client
    ///
    /// The descriptor timeout covers the whole polling loop, so it is never
    /// shorter than the transport timeout plus every poll interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: RapidApiConfig, polling: SearchPolling) -> Result<Self, ProviderError> {
        let transport_timeout = Duration::from_secs(config.timeout_seconds);
        let client = build_client(transport_timeout, None)?;
        let polls = u32::try_from(polling.attempts).unwrap_or(u32::MAX);
        let descriptor = ProviderDescriptor::new(Self::NAME, Self::RANK)
            .requires(CredentialKind::ApiKey)
            .capable_of_all([EntityKind::Profile, EntityKind::Company, EntityKind::Search])
            .with_timeout(transport_timeout + polling.interval.saturating_mul(polls));

        Ok(Self {
            client,
            config,
            polling,
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

        match route(key)? {
            Route::Single(request, fields) => {
                debug!(provider = Self::NAME, path = request.path(), %key, "calling marketplace API");
                let body = request.send(&self.client, &self.config, api_key).await?;
                take_any(body, fields)
            }
            Route::PeopleSearch(keywords) => self.search_people(&keywords, api_key).await,
        }
    }

    async fn search_people(&self, keywords: &str, api_key: &str) -> Result<Value, ProviderError> {
        let submitted = RapidApiRequest::post("/search-leads", json!({ "keywords": keywords }))
            .send(&self.client, &self.config, api_key)
            .await?;

        let Some(request_id) = submitted
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return take_any(submitted, &["leads", "data"]);
        };
        info!(provider = Self::NAME, %request_id, "search job submitted");

        let request_id = request_id.as_str();
        let strategy = FixedInterval::new(self.polling.interval).take(self.polling.attempts);
        RetryIf::spawn(
            strategy,
            || self.poll_search(request_id, api_key),
            |error: &ProviderError| matches!(error, ProviderError::SearchPending { .. }),
        )
        .await
    }

    async fn poll_search(&self, request_id: &str, api_key: &str) -> Result<Value, ProviderError> {
        let status = RapidApiRequest::get("/check-search-status", [("request_id", request_id)])
            .send(&self.client, &self.config, api_key)
            .await?;
        let state = status
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        debug!(provider = Self::NAME, request_id, state = %state, "search job status");

        if PENDING_STATES.contains(&state.as_str()) {
            return Err(ProviderError::SearchPending {
                request_id: request_id.to_string(),
            });
        }
        if state == "failed" {
            return Err(ProviderError::NoData);
        }
        if state != "completed" && status.get("data").is_none() {
            // unknown state, treat as still running
            return Err(ProviderError::SearchPending {
                request_id: request_id.to_string(),
            });
        }

        if let Ok(data) = take_data(status, "data") {
            return Ok(data);
        }
        let results = RapidApiRequest::get("/get-search-results", [("request_id", request_id)])
            .send(&self.client, &self.config, api_key)
            .await?;
        take_any(results, &["data", "leads"])
    }
}

fn route(key: &EntityKey) -> Result<Route, ProviderError> {
    let id = key.identifier();
    let route = match (key.kind(), key.sub_resource()) {
        (EntityKind::Profile, None) => Route::Single(
            RapidApiRequest::get("/get-personal-profile", [("linkedin_url", profile_url(id))]),
            &["data"],
        ),
        (EntityKind::Company, None) => Route::Single(
            RapidApiRequest::get("/get-company-by-linkedinurl", [("linkedin_url", company_url(id))]),
            &["data"],
        ),
        (EntityKind::Search, None | Some("people")) => Route::PeopleSearch(id.to_string()),
        (EntityKind::Search, Some("companies")) => Route::Single(
            RapidApiRequest::post("/search-companies", json!({ "query": id })),
            &["data", "companies"],
        ),
        (kind, sub) => {
            return Err(ProviderError::UnsupportedRequest(match sub {
                Some(sub) => format!("{kind} sub-resource `{sub}`"),
                None => format!("{kind} lookups"),
            }));
        }
    };
    Ok(route)
}

#[async_trait]
impl Provider for FreshDataClient {
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
