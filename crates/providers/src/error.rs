// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Transport-level errors and their classification
//!
//! Adapters work in terms of [`ProviderError`], which keeps enough detail to
//! be useful in logs. At the [`Provider`](provider_client::Provider) boundary
//! every error collapses into a [`FailureKind`].

use provider_client::FailureKind;
use shared_types::CredentialKind;
use thiserror::Error;
use tracing::debug;

/// Errors raised while talking to a backend
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ProviderError {
    /// The HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// Invalid adapter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential the adapter depends on was not supplied
    #[error("Missing {0} credential")]
    MissingCredential(CredentialKind),

    /// The request cannot be expressed against this backend
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    /// Connection failed or was reset
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend did not answer in time
    #[error("Request timed out")]
    TimedOut,

    /// Redirects looped; the session is no longer accepted
    #[error("Redirect loop detected")]
    RedirectLoop,

    /// The request was redirected to a login or auth wall
    #[error("Redirected to login: {location}")]
    LoginWall { location: String },

    /// 401
    #[error("Credentials rejected")]
    Unauthorized,

    /// 403 from a keyed API; the key or subscription is not valid
    #[error("Subscription required: {message}")]
    SubscriptionRequired { message: String },

    /// A challenge page or captcha was served
    #[error("Security challenge served (status {status})")]
    Challenged { status: u16 },

    /// 403 from a session endpoint without a challenge marker
    #[error("Access forbidden")]
    Forbidden,

    /// The non-standard 999 status used to block automated clients
    #[error("Request blocked (status 999)")]
    Blocked,

    /// 404
    #[error("Not found")]
    NotFound,

    /// The request succeeded but carried no result
    #[error("No data returned")]
    NoData,

    /// 429
    #[error("Rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    /// 5xx
    #[error("Upstream error: {status}")]
    Upstream { status: u16 },

    /// Any other non-success status
    #[error("Request rejected: {status}")]
    Rejected { status: u16 },

    /// A success status with an empty body from a keyed API
    #[error("Empty response body")]
    EmptyBody,

    /// A success status with an empty body from a cookie session
    #[error("Empty response from session endpoint")]
    EmptySession,

    /// The body was not valid JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was valid JSON of an unexpected shape
    #[error("Unexpected response shape: {0}")]
    Unexpected(String),

    /// An asynchronous search job did not finish in time
    #[error("Search job {request_id} still pending")]
    SearchPending { request_id: String },
}

impl ProviderError {
    /// Classify a `reqwest` send or body error
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::TimedOut
        } else if error.is_redirect() {
            Self::RedirectLoop
        } else {
            Self::Transport(error)
        }
    }
}

impl From<&ProviderError> for FailureKind {
    fn from(error: &ProviderError) -> Self {
        match error {
            ProviderError::Client(_)
            | ProviderError::Config(_)
            | ProviderError::UnsupportedRequest(_)
            | ProviderError::Rejected { .. } => Self::Unsupported,
            ProviderError::Transport(_) | ProviderError::Upstream { .. } => Self::TransientNetwork,
            ProviderError::TimedOut | ProviderError::SearchPending { .. } => Self::Timeout,
            ProviderError::MissingCredential(_)
            | ProviderError::RedirectLoop
            | ProviderError::LoginWall { .. }
            | ProviderError::Unauthorized
            | ProviderError::SubscriptionRequired { .. } => Self::AuthExpired,
            ProviderError::Challenged { .. }
            | ProviderError::Forbidden
            | ProviderError::Blocked
            | ProviderError::EmptySession => Self::BotDetected,
            ProviderError::NotFound | ProviderError::NoData => Self::NotFound,
            ProviderError::RateLimited { .. } => Self::RateLimited,
            ProviderError::EmptyBody | ProviderError::Json(_) | ProviderError::Unexpected(_) => {
                Self::MalformedResponse
            }
        }
    }
}

impl From<ProviderError> for FailureKind {
    fn from(error: ProviderError) -> Self {
        Self::from(&error)
    }
}

/// Log `error` under `provider` and reduce it to its classification
pub(crate) fn classify(provider: &str, error: &ProviderError) -> FailureKind {
    let kind = FailureKind::from(error);
    debug!(provider, %error, failure = kind.label(), "provider call failed");
    kind
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_problems_share_one_kind() {
        for error in [
            ProviderError::Unauthorized,
            ProviderError::RedirectLoop,
            ProviderError::SubscriptionRequired {
                message: "not subscribed".to_string(),
            },
            ProviderError::LoginWall {
                location: "https://www.linkedin.com/authwall".to_string(),
            },
        ] {
            assert_eq!(FailureKind::from(&error), FailureKind::AuthExpired, "{error}");
        }
    }

    #[test]
    fn blocking_signals_are_bot_detection() {
        for error in [
            ProviderError::Challenged { status: 403 },
            ProviderError::Forbidden,
            ProviderError::Blocked,
            ProviderError::EmptySession,
        ] {
            assert_eq!(FailureKind::from(error), FailureKind::BotDetected);
        }
    }

    #[test]
    fn empty_results_are_not_found() {
        assert_eq!(FailureKind::from(ProviderError::NoData), FailureKind::NotFound);
        assert_eq!(
            FailureKind::from(ProviderError::EmptyBody),
            FailureKind::MalformedResponse
        );
        assert_eq!(
            FailureKind::from(ProviderError::Upstream { status: 503 }),
            FailureKind::TransientNetwork
        );
        assert_eq!(
            FailureKind::from(ProviderError::Rejected { status: 422 }),
            FailureKind::Unsupported
        );
    }
}
