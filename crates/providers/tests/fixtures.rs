// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(missing_docs, dead_code)]

//! Shared fixtures for adapter integration tests
//!
//! Credentials, bundles and canned response bodies used across the adapter
//! suites.

use provider_client::{Credential, CredentialBundle, Provider, StaticCredentials};
use serde_json::{Value, json};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_OAUTH_TOKEN: &str = "test-oauth-token";
pub const TEST_LI_AT: &str = "test-li-at";
pub const TEST_JSESSIONID: &str = "ajax:1234567890";
pub const TEST_TIMEOUT_SECONDS: u64 = 5;

/// A store holding one credential of every kind
pub fn full_store() -> StaticCredentials {
    StaticCredentials::default()
        .with(Credential::api_key(TEST_API_KEY))
        .with(Credential::oauth(TEST_OAUTH_TOKEN))
        .with(Credential::cookies(
            TEST_LI_AT,
            Some(format!("\"{TEST_JSESSIONID}\"")),
        ))
}

/// The bundle the engine would hand `provider`
pub fn bundle_for(provider: &dyn Provider) -> CredentialBundle {
    CredentialBundle::collect(&full_store(), provider.descriptor().required()).unwrap()
}

pub fn person_body() -> Value {
    json!({
        "success": true,
        "message": "",
        "data": {
            "id": "ACoAAA8BYqEBCGLg",
            "firstName": "Jane",
            "lastName": "Doe",
            "headline": "Staff Engineer",
            "username": "jane-doe"
        }
    })
}

pub fn company_body() -> Value {
    json!({
        "success": true,
        "data": {
            "id": "1035",
            "name": "Acme",
            "universalName": "acme",
            "staffCount": 2100
        }
    })
}

pub fn empty_data_body() -> Value {
    json!({ "success": true, "message": "", "data": [] })
}
