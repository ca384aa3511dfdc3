// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Credential families required by data providers

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A family of credentials a provider may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// OAuth bearer token for the official API
    #[serde(rename = "oauth")]
    OAuth,
    /// Browser session cookies (`li_at`, `JSESSIONID`)
    Cookies,
    /// Marketplace API key
    ApiKey,
}

impl CredentialKind {
    /// Returns the snake-case name of the credential kind
    pub const fn name(self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Cookies => "cookies",
            Self::ApiKey => "api_key",
        }
    }

    /// Returns all credential kinds
    pub const fn all() -> &'static [Self] {
        &[Self::OAuth, Self::Cookies, Self::ApiKey]
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a credential kind string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown credential kind: {0}")]
pub struct CredentialKindParseError(pub String);

impl FromStr for CredentialKind {
    type Err = CredentialKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "oauth" => Ok(Self::OAuth),
            "cookies" | "cookie" => Ok(Self::Cookies),
            "api_key" | "apikey" => Ok(Self::ApiKey),
            _ => Err(CredentialKindParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("api-key".parse(), Ok(CredentialKind::ApiKey));
        assert_eq!("API_KEY".parse(), Ok(CredentialKind::ApiKey));
        assert_eq!("cookie".parse(), Ok(CredentialKind::Cookies));
        assert_eq!("OAuth".parse(), Ok(CredentialKind::OAuth));
        assert!("password".parse::<CredentialKind>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&CredentialKind::ApiKey).unwrap(),
            "\"api_key\""
        );
        let parsed: CredentialKind = serde_json::from_str("\"oauth\"").unwrap();
        assert_eq!(parsed, CredentialKind::OAuth);
    }
}
