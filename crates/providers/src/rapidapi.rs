// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Requests against RapidAPI-hosted marketplace backends

use reqwest::Client;
use serde_json::Value;

use crate::{
    error::ProviderError,
    http::{Surface, endpoint_url, fetch_json},
    non_empty_string::NonEmptyString,
};

const KEY_HEADER: &str = "x-rapidapi-key";
const HOST_HEADER: &str = "x-rapidapi-host";

/// Connection settings for a RapidAPI marketplace backend
#[derive(Debug, Clone)]
pub struct RapidApiConfig {
    /// Base URL requests are sent to
    pub base_url: NonEmptyString,
    /// Value of the `x-rapidapi-host` header
    pub host: NonEmptyString,
    /// Transport timeout in seconds
    pub timeout_seconds: u64,
}

impl RapidApiConfig {
    /// Validate and build a config
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` or `host` is blank
    pub fn new(
        base_url: impl Into<String>,
        host: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            base_url: NonEmptyString::new(base_url)?,
            host: NonEmptyString::new(host)?,
            timeout_seconds,
        })
    }
}

/// One call against a RapidAPI backend
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RapidApiRequest {
    Get {
        path: &'static str,
        query: Vec<(&'static str, String)>,
    },
    Post {
        path: &'static str,
        body: Value,
    },
}

impl RapidApiRequest {
    pub(crate) fn get<V: Into<String>>(
        path: &'static str,
        query: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Self {
        Self::Get {
            path,
            query: query
                .into_iter()
                .map(|(name, value)| (name, value.into()))
                .collect(),
        }
    }

    pub(crate) fn post(path: &'static str, body: Value) -> Self {
        Self::Post { path, body }
    }

    pub(crate) fn path(&self) -> &'static str {
        match self {
            Self::Get { path, .. } | Self::Post { path, .. } => path,
        }
    }

    /// Send with the marketplace headers and decode the JSON body
    pub(crate) async fn send(
        &self,
        client: &Client,
        config: &RapidApiConfig,
        api_key: &str,
    ) -> Result<Value, ProviderError> {
        let url = endpoint_url(&config.base_url, &[self.path().trim_start_matches('/')])?;
        let request = match self {
            Self::Get { query, .. } => client.get(url).query(query),
            Self::Post { body, .. } => client.post(url).json(body),
        };
        let request = request
            .header(KEY_HEADER, api_key)
            .header(HOST_HEADER, config.host.as_str())
            .header("accept", "application/json");
        fetch_json(request, Surface::KeyedApi).await
    }
}
