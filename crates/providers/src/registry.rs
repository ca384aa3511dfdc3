// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! The standard provider set
//!
//! Builds every adapter from one [`EndpointsConfig`] so the service can hand
//! the whole set to the engine. Ranks and timeouts here are defaults; the
//! engine's per-provider settings override them.

use std::{sync::Arc, time::Duration};

use provider_client::Provider;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::ProviderError,
    fresh_data::{DEFAULT_FRESH_DATA_HOST, FreshDataClient, SearchPolling},
    headless::{HeadlessClient, HeadlessConfig},
    marketing::{MarketingClient, MarketingConfig},
    non_empty_string::NonEmptyString,
    pnd::{DEFAULT_PND_HOST, PndClient},
    rapidapi::RapidApiConfig,
    voyager::{VoyagerClient, VoyagerConfig},
};

/// Where each backend lives and how long to wait for it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Professional Network Data base URL
    pub pnd_base_url: String,
    /// Professional Network Data `x-rapidapi-host`
    pub pnd_host: String,
    /// Fresh Data base URL
    pub fresh_data_base_url: String,
    /// Fresh Data `x-rapidapi-host`
    pub fresh_data_host: String,
    /// Marketing API base URL
    pub marketing_base_url: String,
    /// Marketing API `LinkedIn-Version`
    pub marketing_api_version: String,
    /// Internal web API base URL
    pub voyager_base_url: String,
    /// Render service URL; the headless provider is only built when set
    pub headless_render_url: Option<NonEmptyString>,
    /// Transport timeout for keyed APIs and sessions
    pub request_timeout_seconds: u64,
    /// Transport timeout for the render service
    pub render_timeout_seconds: u64,
    /// Delay between search status checks
    pub search_poll_interval_ms: u64,
    /// Search status checks before giving up
    pub search_poll_attempts: usize,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            pnd_base_url: format!("https://{DEFAULT_PND_HOST}"),
            pnd_host: DEFAULT_PND_HOST.to_string(),
            fresh_data_base_url: format!("https://{DEFAULT_FRESH_DATA_HOST}"),
            fresh_data_host: DEFAULT_FRESH_DATA_HOST.to_string(),
            marketing_base_url: "https://api.linkedin.com".to_string(),
            marketing_api_version: "202501".to_string(),
            voyager_base_url: "https://www.linkedin.com/voyager/api".to_string(),
            headless_render_url: None,
            request_timeout_seconds: 15,
            render_timeout_seconds: 45,
            search_poll_interval_ms: 2000,
            search_poll_attempts: 5,
        }
    }
}

impl EndpointsConfig {
    fn voyager(&self) -> Result<VoyagerConfig, ProviderError> {
        VoyagerConfig::new(&self.voyager_base_url, self.request_timeout_seconds)
            .map_err(ProviderError::Config)
    }
}

/// Build every configured adapter, in default rank order
///
/// # Errors
///
/// Returns an error if a URL or header value is blank or an HTTP client
/// cannot be created
pub fn standard_providers(
    endpoints: &EndpointsConfig,
) -> Result<Vec<Arc<dyn Provider>>, ProviderError> {
    let timeout = endpoints.request_timeout_seconds;

    let pnd = RapidApiConfig::new(&endpoints.pnd_base_url, &endpoints.pnd_host, timeout)
        .map_err(ProviderError::Config)?;
    let fresh_data = RapidApiConfig::new(
        &endpoints.fresh_data_base_url,
        &endpoints.fresh_data_host,
        timeout,
    )
    .map_err(ProviderError::Config)?;
    let polling = SearchPolling {
        interval: Duration::from_millis(endpoints.search_poll_interval_ms),
        attempts: endpoints.search_poll_attempts,
    };
    let marketing = MarketingConfig::new(
        &endpoints.marketing_base_url,
        &endpoints.marketing_api_version,
        timeout,
    )
    .map_err(ProviderError::Config)?;

    let mut providers: Vec<Arc<dyn Provider>> = vec![
        Arc::new(PndClient::new(pnd)?),
        Arc::new(FreshDataClient::new(fresh_data, polling)?),
        Arc::new(MarketingClient::new(marketing)?),
        Arc::new(VoyagerClient::enhanced(endpoints.voyager()?)?),
    ];

    match &endpoints.headless_render_url {
        Some(render_url) => {
            let config = HeadlessConfig {
                render_url: render_url.clone(),
                timeout_seconds: endpoints.render_timeout_seconds,
                navigation_timeout_ms: endpoints
                    .render_timeout_seconds
                    .saturating_sub(5)
                    .saturating_mul(1000),
            };
            providers.push(Arc::new(HeadlessClient::new(config)?));
        }
        None => info!("no render service configured, headless provider disabled"),
    }

    providers.push(Arc::new(VoyagerClient::session(endpoints.voyager()?)?));

    info!(
        providers = ?providers.iter().map(|provider| provider.name()).collect::<Vec<_>>(),
        "built standard providers"
    );
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_skips_headless() {
        let providers = standard_providers(&EndpointsConfig::default()).unwrap();
        let names: Vec<&str> = providers.iter().map(|provider| provider.name()).collect();
        assert_eq!(names, ["pnd", "fresh_data", "marketing", "enhanced", "voyager"]);
    }

    #[test]
    fn render_url_adds_headless() {
        let endpoints = EndpointsConfig {
            headless_render_url: Some(NonEmptyString::new("http://render.local").unwrap()),
            ..EndpointsConfig::default()
        };
        let providers = standard_providers(&endpoints).unwrap();
        let headless = providers
            .iter()
            .find(|provider| provider.name() == HeadlessClient::NAME)
            .unwrap();
        assert_eq!(headless.descriptor().rank(), HeadlessClient::RANK);
        assert_eq!(headless.descriptor().timeout(), Duration::from_secs(45));
    }

    #[test]
    fn blank_urls_are_rejected() {
        let endpoints = EndpointsConfig {
            pnd_base_url: "  ".to_string(),
            ..EndpointsConfig::default()
        };
        assert!(matches!(
            standard_providers(&endpoints),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn deserialises_partial_config() {
        let endpoints: EndpointsConfig = serde_json::from_str(
            r#"{"headless_render_url": "http://render.local", "search_poll_attempts": 2}"#,
        )
        .unwrap();
        assert_eq!(endpoints.search_poll_attempts, 2);
        assert_eq!(endpoints.pnd_host, DEFAULT_PND_HOST);
        assert!(endpoints.headless_render_url.is_some());
    }
}
