// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Engine faults
//!
//! Ordinary provider failures are never errors; they are reported inside
//! [`crate::ResolutionOutcome`]. [`EngineError`] covers the genuinely
//! exceptional cases only.

use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Faults raised by the resolution engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration is inconsistent
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Two providers were registered under one name
    #[error("Duplicate provider name: {name}")]
    DuplicateProvider {
        /// The repeated name
        name: String,
    },

    /// No registered provider has this name
    #[error("Unknown provider: {name}")]
    UnknownProvider {
        /// The requested name
        name: String,
    },

    /// The task resolving a key terminated without publishing an outcome
    #[error("Resolution of {key} aborted before completing")]
    ResolutionAborted {
        /// Display form of the key
        key: String,
    },
}

impl EngineError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the fault comes from startup configuration rather than a request
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::DuplicateProvider { .. })
    }
}
