// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-provider health tracking with exponential cooldown
//!
//! Each provider has one independently locked record. A record is created on
//! first reference and lives for the engine's lifetime. Once consecutive
//! failures reach the threshold, every further failure (re)starts a cooldown of
//! `base * 2^(failures - 1)`, capped. A success resets the record.
//!
//! After a cooldown elapses the provider is eligible again but keeps its
//! failure count, so a single further failure sends it straight back into a
//! longer cooldown.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use provider_client::FailureKind;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Cooldown policy shared by all providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    failure_threshold: u32,
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy; `cap` is raised to `base` if lower
    pub fn new(failure_threshold: u32, base: Duration, cap: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            base,
            cap: cap.max(base),
        }
    }

    /// Consecutive failures that trigger a cooldown
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Raw backoff for a failure count, ignoring the threshold
    ///
    /// Non-decreasing in `failures` and never above the cap.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1_u32 << exponent)
            .map_or(self.cap, |backoff| backoff.min(self.cap))
    }

    /// Cooldown to apply after reaching `failures`, if any
    pub fn cooldown_for(&self, failures: u32) -> Option<Duration> {
        (failures >= self.failure_threshold).then(|| self.backoff(failures))
    }
}

/// Mutable health record for one provider
#[derive(Debug, Clone, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    cooldown_until: Option<Instant>,
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
    last_failure_kind: Option<FailureKind>,
    total_successes: u64,
    total_failures: u64,
}

impl ProviderHealth {
    fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

/// Read-only view of one provider's health
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Whether the provider may be attempted now
    pub eligible: bool,
    /// Time left in the current cooldown
    pub cooldown_remaining_ms: Option<u64>,
    /// Wall-clock time of the last success
    pub last_success: Option<DateTime<Utc>>,
    /// Wall-clock time of the last failure
    pub last_failure: Option<DateTime<Utc>>,
    /// Classification of the last failure
    pub last_failure_kind: Option<FailureKind>,
    /// Lifetime success count
    pub total_successes: u64,
    /// Lifetime failure count
    pub total_failures: u64,
}

/// Health state for every provider known to one engine
#[derive(Debug)]
pub struct HealthTracker {
    records: DashMap<String, ProviderHealth>,
    policy: BackoffPolicy,
}

impl HealthTracker {
    /// Create an empty tracker
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            records: DashMap::new(),
            policy,
        }
    }

    /// The cooldown policy in force
    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    /// Whether `provider` is outside any cooldown
    pub fn is_eligible(&self, provider: &str) -> bool {
        self.cooldown_remaining(provider).is_none()
    }

    /// Time left before `provider` becomes eligible again
    pub fn cooldown_remaining(&self, provider: &str) -> Option<Duration> {
        self.records
            .get(provider)
            .and_then(|record| record.cooldown_remaining(Instant::now()))
    }

    /// Reset the failure streak and clear any cooldown
    pub fn record_success(&self, provider: &str) {
        let mut record = self.records.entry(provider.to_string()).or_default();
        if record.consecutive_failures > 0 {
            debug!(
                provider,
                previous_failures = record.consecutive_failures,
                "provider recovered"
            );
        }
        record.consecutive_failures = 0;
        record.cooldown_until = None;
        record.last_success = Some(Utc::now());
        record.total_successes += 1;
    }

    /// Count a failure and start a cooldown once the threshold is reached
    ///
    /// Returns the cooldown that was started, if any.
    pub fn record_failure(&self, provider: &str, kind: FailureKind) -> Option<Duration> {
        let mut record = self.records.entry(provider.to_string()).or_default();
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.last_failure = Some(Utc::now());
        record.last_failure_kind = Some(kind);
        record.total_failures += 1;

        let cooldown = self.policy.cooldown_for(record.consecutive_failures);
        if let Some(cooldown) = cooldown {
            record.cooldown_until = Some(Instant::now() + cooldown);
            warn!(
                provider,
                failure = kind.label(),
                consecutive_failures = record.consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                "provider entering cooldown"
            );
        }
        cooldown
    }

    /// Clear the failure streak and any cooldown without recording a success
    ///
    /// Lifetime totals and timestamps are kept. Returns whether the provider
    /// was failing or cooling down.
    pub fn reset(&self, provider: &str) -> bool {
        let Some(mut record) = self.records.get_mut(provider) else {
            return false;
        };
        let was_failing = record.consecutive_failures > 0 || record.cooldown_until.is_some();
        record.consecutive_failures = 0;
        record.cooldown_until = None;
        if was_failing {
            info!(provider, "provider health reset");
        }
        was_failing
    }

    /// Reset every provider; returns how many were failing or cooling down
    pub fn reset_all(&self) -> usize {
        let mut reset = 0;
        for mut record in self.records.iter_mut() {
            if record.consecutive_failures > 0 || record.cooldown_until.is_some() {
                record.consecutive_failures = 0;
                record.cooldown_until = None;
                reset += 1;
            }
        }
        if reset > 0 {
            info!(reset, "provider health reset");
        }
        reset
    }

    /// Snapshot of one provider; unknown providers report a clean record
    pub fn snapshot(&self, provider: &str) -> HealthSnapshot {
        let record = self
            .records
            .get(provider)
            .map(|record| record.clone())
            .unwrap_or_default();
        let remaining = record.cooldown_remaining(Instant::now());

        HealthSnapshot {
            consecutive_failures: record.consecutive_failures,
            eligible: remaining.is_none(),
            cooldown_remaining_ms: remaining.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            last_success: record.last_success,
            last_failure: record.last_failure,
            last_failure_kind: record.last_failure_kind,
            total_successes: record.total_successes,
            total_failures: record.total_failures,
        }
    }
}
