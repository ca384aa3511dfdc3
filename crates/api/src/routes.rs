// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration and handlers for the resolver service.

pub mod handlers;

use axum::{
    Router,
    routing::{delete, get, post},
};
use handlers::{
    clear_cache_handler, diagnostics_handler, health_handler, invalidate_handler,
    invalidate_kind_handler, reset_all_providers_handler, reset_provider_handler,
    resolve_handler,
};

use crate::{metrics::metrics_handler, state::ServerState};

/// Create application routes
pub fn create_routes() -> Router<ServerState> {
    let health_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let api_routes = Router::new()
        .route("/resolve/{kind}/{identifier}", get(resolve_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/{kind}", delete(invalidate_kind_handler))
        .route("/cache/{kind}/{identifier}", delete(invalidate_handler))
        .route("/diagnostics", get(diagnostics_handler))
        .route("/providers/reset", post(reset_all_providers_handler))
        .route("/providers/{name}/reset", post(reset_provider_handler));

    let v1 = Router::new().nest("/v1", api_routes);

    Router::new().merge(health_routes).merge(v1)
}
