// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Multi-source resolution engine
//!
//! Resolves an [`EntityKey`](shared_types::EntityKey) by consulting a ranked
//! list of [`Provider`](provider_client::Provider)s, each of which may be
//! unhealthy, rate-limited or lacking credentials at any moment.
//!
//! # Architecture
//!
//! - **Cache** ([`ResponseCache`]): per-kind TTLs, lazy expiry, LRU eviction
//! - **Deduplication**: concurrent requests for one key share one provider walk
//! - **Health** ([`HealthTracker`]): consecutive-failure counting with capped
//!   exponential cooldown
//! - **Budgets** ([`RateLimiter`]): fixed-window call counting per provider
//! - **Spacing** ([`CallSpacer`]): minimum gaps between calls, for providers
//!   that ask for them
//! - **Engine** ([`ResolutionEngine`]): the ranked walk that ties them together
//!
//! Every resolution ends in a [`ResolutionOutcome`] carrying an
//! [`AttemptTrail`] that explains what was tried and why it failed.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod health;
mod inflight;
pub mod observer;
pub mod outcome;
pub mod rate_limit;
pub mod spacing;

pub use cache::{CacheStats, CachedResponse, ResponseCache};
pub use config::{CacheConfig, EngineConfig, KindTtls, ProviderSettings};
pub use diagnostics::{CounterSnapshot, EngineDiagnostics, ProviderDiagnostics};
pub use engine::{ResolutionEngine, ResolutionEngineBuilder, ResolveOptions};
pub use error::{EngineError, EngineResult};
pub use health::{BackoffPolicy, HealthSnapshot, HealthTracker};
pub use observer::{NoopObserver, ResolutionObserver};
pub use outcome::{
    AttemptTrail, CACHE_PROVIDER, PolicyRejection, ResolutionOutcome, SkipReason, TrailEntry,
    TrailStep,
};
pub use rate_limit::{BudgetSnapshot, RateLimiter, WindowPolicy};
pub use spacing::{CallSpacer, SpacingPolicy};
