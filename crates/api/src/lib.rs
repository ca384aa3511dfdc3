// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Resolver HTTP service
//!
//! This crate exposes the multi-source resolution engine over HTTP, built with
//! Axum and designed for production use with layered configuration,
//! Prometheus metrics and graceful shutdown.
//!
//! # Module Structure
//!
//! - [`config`]: Server, engine, endpoint and credential configuration with hierarchical loading
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`metrics`]: Prometheus metrics fed by the engine's observer hook
//! - [`state`]: Shared application state and the aggregated health report
//! - [`server`]: Engine construction, server lifecycle and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//!
//! # Endpoints
//!
//! - `GET /health`: liveness plus per-provider availability
//! - `GET /metrics`: Prometheus text format
//! - `GET /v1/resolve/{kind}/{identifier}`: resolve one entity
//! - `DELETE /v1/cache[/{kind}[/{identifier}]]`: manual cache invalidation
//! - `GET /v1/diagnostics`: read-only engine snapshot

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{CredentialsConfig, Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use state::{HealthCheck, HealthStatus, ServerState};
