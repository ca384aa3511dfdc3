// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the resolver service:
//! configuration, the resolution engine and coordinated cancellation.

use std::collections::BTreeMap;

use resolution_engine::{ProviderDiagnostics, ResolutionEngine};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{Environment, ServerConfig};

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// Resolution engine; clones share all state
    engine: ResolutionEngine,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    pub fn new(
        config: ServerConfig,
        engine: ResolutionEngine,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            engine,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The resolution engine
    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    /// Report service liveness and per-provider availability
    ///
    /// The service is `Up` while every provider can be attempted, `Degraded`
    /// while only some can, and `Down` when none can.
    pub fn health_check(&self) -> HealthCheck {
        let diagnostics = self.engine.diagnostics();
        let providers: BTreeMap<String, HealthStatus> = diagnostics
            .providers
            .iter()
            .map(|provider| (provider.name.clone(), provider_status(provider)))
            .collect();

        let available = providers
            .values()
            .filter(|status| **status == HealthStatus::Up)
            .count();
        let status = if providers.is_empty() || available == 0 {
            HealthStatus::Down {
                reason: Box::from("no provider can currently be attempted"),
            }
        } else if available < providers.len() {
            HealthStatus::Degraded {
                reason: format!("{available} of {} providers available", providers.len())
                    .into_boxed_str(),
            }
        } else {
            HealthStatus::Up
        };

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            providers,
        }
    }
}

fn provider_status(provider: &ProviderDiagnostics) -> HealthStatus {
    if !provider.credentials_present {
        let missing = provider
            .requires
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return HealthStatus::Down {
            reason: format!("missing credentials: {missing}").into_boxed_str(),
        };
    }
    if let Some(remaining_ms) = provider.health.cooldown_remaining_ms {
        return HealthStatus::Degraded {
            reason: format!(
                "cooling down after {} consecutive failures, {}s remaining",
                provider.health.consecutive_failures,
                remaining_ms.div_ceil(1000)
            )
            .into_boxed_str(),
        };
    }
    if provider.budget.remaining == 0 {
        return HealthStatus::Degraded {
            reason: format!(
                "rate budget spent, resets in {}s",
                provider.budget.resets_in_ms.div_ceil(1000)
            )
            .into_boxed_str(),
        };
    }
    HealthStatus::Up
}

/// Health status of a service or dependency
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational
    Up,

    /// Not operational
    Down {
        /// Human-readable explanation of why the service is down
        reason: Box<str>,
    },

    /// Operational with reduced capacity
    Degraded {
        /// Human-readable explanation of the degradation condition
        reason: Box<str>,
    },
}

/// Health check status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Service status
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Availability of each registered provider
    pub providers: BTreeMap<String, HealthStatus>,
}
