// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Read-only engine snapshots for the diagnostics surface

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use shared_types::{CredentialKind, EntityKind};

use crate::{
    cache::CacheStats, health::HealthSnapshot, outcome::ResolutionOutcome,
    rate_limit::BudgetSnapshot,
};

/// Point-in-time view of the whole engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineDiagnostics {
    /// One entry per registered provider, in attempt order
    pub providers: Vec<ProviderDiagnostics>,
    /// Response cache statistics
    pub cache: CacheStats,
    /// Request counters since startup
    pub counters: CounterSnapshot,
    /// Keys currently being resolved
    pub in_flight: usize,
}

/// Point-in-time view of one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDiagnostics {
    /// Provider name
    pub name: String,
    /// Effective rank
    pub rank: u32,
    /// Effective attempt timeout
    pub timeout_ms: u64,
    /// Effective minimum gap between calls
    pub min_interval_ms: u64,
    /// Resolvable kinds
    pub capabilities: Vec<EntityKind>,
    /// Required credential kinds
    pub requires: Vec<CredentialKind>,
    /// Whether every required credential is configured
    pub credentials_present: bool,
    /// Health record
    pub health: HealthSnapshot,
    /// Rate budget
    pub budget: BudgetSnapshot,
}

/// Request counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CounterSnapshot {
    /// Calls to `resolve`
    pub resolutions: u64,
    /// Calls answered straight from the cache
    pub cache_hits: u64,
    /// Calls that joined an in-flight resolution
    pub deduplicated: u64,
    /// Calls that ended in success
    pub successes: u64,
    /// Calls that ended with every provider exhausted
    pub exhausted: u64,
    /// Calls refused by policy
    pub rejected: u64,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    resolutions: AtomicU64,
    cache_hits: AtomicU64,
    deduplicated: AtomicU64,
    successes: AtomicU64,
    exhausted: AtomicU64,
    rejected: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn resolution_started(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn joined(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn finished(&self, outcome: &ResolutionOutcome) {
        let counter = match outcome {
            ResolutionOutcome::Success { .. } => &self.successes,
            ResolutionOutcome::Exhausted { .. } => &self.exhausted,
            ResolutionOutcome::RejectedByPolicy { .. } => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
