// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros,
//! a [`ResolutionObserver`] that feeds them from the engine and an
//! Axum-compatible metrics handler.

use std::{sync::LazyLock, time::Duration};

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use prometheus::{
    Encoder, Gauge, HistogramVec, IntCounterVec, TextEncoder, register_gauge,
    register_histogram_vec, register_int_counter_vec,
};
use provider_client::FailureKind;
use resolution_engine::{CacheStats, ResolutionObserver, SkipReason};
use shared_types::EntityKind;

use crate::{
    error::{ServerError, ServerResult},
    state::ServerState,
};

/// Total number of resolutions, labeled by entity kind and outcome.
pub static RESOLUTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "resolver_resolutions_total",
        "Total number of resolutions, labeled by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to create resolver_resolutions_total counter vec")
});

/// Provider attempts, labeled by provider and result (`success` or a failure kind).
pub static PROVIDER_ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "resolver_provider_attempts_total",
        "Total number of provider attempts, labeled by provider and result",
        &["provider", "result"]
    )
    .expect("Failed to create resolver_provider_attempts_total counter vec")
});

/// Histogram for provider attempt durations in seconds.
pub static PROVIDER_ATTEMPT_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "resolver_provider_attempt_duration",
        "Provider attempt durations in seconds",
        &["provider", "result"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]
    )
    .expect("Failed to create provider attempt duration histogram")
});

/// Providers passed over without a call, labeled by provider and reason.
pub static PROVIDER_SKIPS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "resolver_provider_skips_total",
        "Total number of skipped providers, labeled by provider and reason",
        &["provider", "reason"]
    )
    .expect("Failed to create resolver_provider_skips_total counter vec")
});

/// Cache utilization gauge
pub static CACHE_UTILIZATION: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        "resolver_cache_utilization_ratio",
        "Current cache utilization as a ratio (0.0 to 1.0)"
    )
    .expect("Failed to create cache utilization gauge")
});

/// Cache hit rate gauge
pub static CACHE_HIT_RATE: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        "resolver_cache_hit_rate",
        "Cache hit rate as a ratio (0.0 to 1.0)"
    )
    .expect("Failed to create cache hit rate gauge")
});

/// Cache size gauge
pub static CACHE_SIZE: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        "resolver_cache_entries_count",
        "Current number of entries in cache"
    )
    .expect("Failed to create cache size gauge")
});

/// Count one finished resolution
pub fn inc_resolutions(kind: EntityKind, outcome: &str) {
    RESOLUTIONS.with_label_values(&[kind.name(), outcome]).inc();
}

/// Record one provider attempt
///
/// # Arguments
/// * `provider` - The provider name
/// * `result` - `success` or the failure label
/// * `duration_secs` - Wall time of the attempt in seconds
pub fn observe_provider_attempt(provider: &str, result: &str, duration_secs: f64) {
    PROVIDER_ATTEMPTS
        .with_label_values(&[provider, result])
        .inc();
    PROVIDER_ATTEMPT_DURATION
        .with_label_values(&[provider, result])
        .observe(duration_secs);
}

/// Count one skipped provider
pub fn inc_provider_skips(provider: &str, reason: &str) {
    PROVIDER_SKIPS.with_label_values(&[provider, reason]).inc();
}

/// Update cache gauges from an engine snapshot
pub fn update_cache_metrics(stats: &CacheStats) {
    CACHE_UTILIZATION.set(stats.utilization_rate);
    CACHE_HIT_RATE.set(stats.hit_rate);
    #[allow(clippy::cast_precision_loss)]
    CACHE_SIZE.set(stats.entry_count as f64);
}

/// Engine observer that records attempts and skips in the global registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusObserver;

impl ResolutionObserver for PrometheusObserver {
    fn attempt_finished(&self, provider: &str, failure: Option<FailureKind>, elapsed: Duration) {
        let result = failure.map_or("success", FailureKind::label);
        observe_provider_attempt(provider, result, elapsed.as_secs_f64());
    }

    fn provider_skipped(&self, provider: &str, reason: &SkipReason) {
        inc_provider_skips(provider, reason.label());
    }
}

/// Axum handler that exports metrics in Prometheus text format
///
/// Cache gauges are refreshed from the engine on every scrape.
pub async fn metrics_handler(State(state): State<ServerState>) -> ServerResult<impl IntoResponse> {
    update_cache_metrics(&state.engine().diagnostics().cache);

    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&prometheus::gather())
        .map_err(|e| ServerError::Runtime {
            message: format!("failed to encode metrics: {e}"),
        })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        body,
    ))
}
