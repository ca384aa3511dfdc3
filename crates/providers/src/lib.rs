// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP adapters for professional-network data sources
//!
//! Each adapter implements [`provider_client::Provider`] over one backend:
//!
//! - **`pnd`**: Professional Network Data marketplace API (API key)
//! - **`fresh_data`**: Fresh Data marketplace API with polled search jobs (API key)
//! - **`marketing`**: official Marketing API, organizations only (OAuth)
//! - **`enhanced`** / **`voyager`**: internal web API over session cookies
//! - **`headless`**: a browser render service over session cookies
//!
//! Adapters transport and classify; they never retry, fall back or cache.
//! Every failure is reduced to a [`provider_client::FailureKind`] through a
//! shared status and landing-page classifier.

pub mod error;
pub mod fresh_data;
pub mod headless;
mod http;
pub mod linkedin;
pub mod marketing;
pub mod non_empty_string;
pub mod pnd;
pub mod rapidapi;
pub mod registry;
pub mod voyager;

pub use error::ProviderError;
pub use fresh_data::{FreshDataClient, SearchPolling};
pub use headless::{HeadlessClient, HeadlessConfig};
pub use marketing::{MarketingClient, MarketingConfig};
pub use non_empty_string::NonEmptyString;
pub use pnd::PndClient;
pub use rapidapi::RapidApiConfig;
pub use registry::{EndpointsConfig, standard_providers};
pub use voyager::{VoyagerClient, VoyagerConfig, VoyagerFlavour};
