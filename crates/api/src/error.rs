// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Server faults with their HTTP mapping. Provider failures are not server
//! errors: an exhausted or rejected resolution is a normal response body.

use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use providers::ProviderError;
use resolution_engine::EngineError;
use shared_types::EntityKindParseError;
use thiserror::Error;

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Runtime errors during server operation
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// A provider adapter could not be built
    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    /// The resolution engine refused its configuration or lost a resolution
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// Timeout errors for operations that exceed time limits
    #[error("Operation timed out after {timeout_seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        timeout_seconds: u64,
    },

    /// The path named an unknown entity kind
    #[error("Invalid entity kind: {0}")]
    InvalidKind(#[from] EntityKindParseError),

    /// Request validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidKind(..) | Self::ValidationError(..) => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Engine(EngineError::UnknownProvider { .. }) => StatusCode::NOT_FOUND,
            Self::Engine(error) if error.is_configuration() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Engine(..) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config { .. }
            | Self::Bind { .. }
            | Self::Startup { .. }
            | Self::Shutdown { .. }
            | Self::Runtime { .. }
            | Self::Provider(..)
            | Self::TaskJoin { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let error = ServerError::from("spaceship".parse::<shared_types::EntityKind>().unwrap_err());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(error.to_string().contains("spaceship"));

        let error = ServerError::ValidationError("identifier cannot be empty".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_faults() {
        let aborted = ServerError::from(EngineError::ResolutionAborted {
            key: "profile:jane-doe".to_string(),
        });
        assert_eq!(aborted.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let unknown = ServerError::from(EngineError::UnknownProvider {
            name: "nope".to_string(),
        });
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

        let misconfigured = ServerError::from(EngineError::configuration("bad"));
        assert_eq!(
            misconfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_status_and_message() {
        let response = ServerError::Timeout { timeout_seconds: 5 }.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
