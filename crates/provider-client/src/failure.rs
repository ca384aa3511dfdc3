// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Failure taxonomy shared by all providers
//!
//! Every transport outcome that is not a usable payload is classified into one
//! [`FailureKind`]. The taxonomy is closed so that the engine's accounting and
//! the user-facing remediation messages stay uniform across backends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified reason a single provider attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials were rejected or the session expired
    #[error("authentication expired")]
    AuthExpired,
    /// The backend reported that its own quota was exceeded
    #[error("rate limited by provider")]
    RateLimited,
    /// The backend served a challenge, captcha or block page
    #[error("blocked by bot detection")]
    BotDetected,
    /// The backend has no such entity
    #[error("entity not found")]
    NotFound,
    /// No response within the attempt timeout
    #[error("timed out")]
    Timeout,
    /// Connection failure or upstream server error
    #[error("transient network error")]
    TransientNetwork,
    /// A response arrived but could not be interpreted
    #[error("malformed response")]
    MalformedResponse,
    /// The backend cannot serve this kind of request
    #[error("unsupported request")]
    Unsupported,
}

impl FailureKind {
    /// Stable snake-case label, used for logs and metric labels
    pub const fn label(self) -> &'static str {
        match self {
            Self::AuthExpired => "auth_expired",
            Self::RateLimited => "rate_limited",
            Self::BotDetected => "bot_detected",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::TransientNetwork => "transient_network",
            Self::MalformedResponse => "malformed_response",
            Self::Unsupported => "unsupported",
        }
    }

    /// Actionable hint for an operator who sees this failure
    pub const fn remediation(self) -> &'static str {
        match self {
            Self::AuthExpired => "credentials expired or were rejected, refresh the token or cookies",
            Self::RateLimited => "provider quota exhausted, wait for the quota window or upgrade the plan",
            Self::BotDetected => {
                "blocked by anti-bot detection, try refreshing session cookies or slowing down"
            }
            Self::NotFound => "entity does not exist at this provider, check the identifier",
            Self::Timeout => "provider did not answer in time, retry later",
            Self::TransientNetwork => "provider or network is unstable, retry later",
            Self::MalformedResponse => {
                "provider returned an unreadable response, its API may have changed"
            }
            Self::Unsupported => "provider cannot serve this request type",
        }
    }

    /// Whether one immediate retry against the same provider is worthwhile
    pub const fn is_locally_retryable(self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Whether the failure points at credentials rather than the backend
    pub const fn is_credential_problem(self) -> bool {
        matches!(self, Self::AuthExpired | Self::BotDetected)
    }

    /// Returns all failure kinds
    pub const fn all() -> &'static [Self] {
        &[
            Self::AuthExpired,
            Self::RateLimited,
            Self::BotDetected,
            Self::NotFound,
            Self::Timeout,
            Self::TransientNetwork,
            Self::MalformedResponse,
            Self::Unsupported,
        ]
    }
}
