// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fixed-window call budgets per provider
//!
//! Each provider gets `limit` calls per `window`. Windows are anchored at the
//! provider's first reference and advance in whole multiples of the window
//! length, so resets happen at deterministic boundaries rather than sliding
//! with each call. A call is only permitted if the counter is below the limit
//! at the moment of acquisition.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// Budget parameters for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Calls permitted per window
    pub limit: u32,
    /// Window length; must be non-zero
    pub window: Duration,
}

impl WindowPolicy {
    /// Create a window policy
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

#[derive(Debug, Clone)]
struct RateBudget {
    policy: WindowPolicy,
    window_start: Instant,
    calls_in_window: u32,
}

impl RateBudget {
    fn new(policy: WindowPolicy, now: Instant) -> Self {
        Self {
            policy,
            window_start: now,
            calls_in_window: 0,
        }
    }

    /// Advance to the window containing `now`, resetting the counter if moved
    fn roll(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.policy.window {
            return;
        }

        let whole_windows = elapsed.as_nanos() / self.policy.window.as_nanos().max(1);
        let advance = u32::try_from(whole_windows)
            .ok()
            .and_then(|n| self.policy.window.checked_mul(n));
        self.window_start = match advance {
            Some(advance) => self.window_start + advance,
            None => now,
        };
        self.calls_in_window = 0;
    }

    fn remaining(&self) -> u32 {
        self.policy.limit.saturating_sub(self.calls_in_window)
    }

    fn resets_in(&self, now: Instant) -> Duration {
        (self.window_start + self.policy.window).saturating_duration_since(now)
    }
}

/// Read-only view of one provider's budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetSnapshot {
    /// Calls permitted per window
    pub window_limit: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Calls made in the current window
    pub calls_in_window: u32,
    /// Calls still permitted in the current window
    pub remaining: u32,
    /// Time until the counter resets
    pub resets_in_ms: u64,
}

/// Call budgets for every provider known to one engine
#[derive(Debug)]
pub struct RateLimiter {
    budgets: DashMap<String, RateBudget>,
    policies: DashMap<String, WindowPolicy>,
    default_policy: WindowPolicy,
}

impl RateLimiter {
    /// Create a limiter applying `default_policy` to unregistered providers
    pub fn new(default_policy: WindowPolicy) -> Self {
        Self {
            budgets: DashMap::new(),
            policies: DashMap::new(),
            default_policy,
        }
    }

    /// Set the policy for one provider before its first use
    pub fn register(&self, provider: &str, policy: WindowPolicy) {
        self.policies.insert(provider.to_string(), policy);
    }

    fn policy_for(&self, provider: &str) -> WindowPolicy {
        self.policies
            .get(provider)
            .map_or(self.default_policy, |policy| *policy)
    }

    /// Consume one call if the current window has room
    pub fn try_acquire(&self, provider: &str) -> bool {
        let now = Instant::now();
        let policy = self.policy_for(provider);
        let mut budget = self
            .budgets
            .entry(provider.to_string())
            .or_insert_with(|| RateBudget::new(policy, now));
        budget.roll(now);

        if budget.calls_in_window < budget.policy.limit {
            budget.calls_in_window += 1;
            true
        } else {
            debug!(
                provider,
                limit = budget.policy.limit,
                resets_in_ms = u64::try_from(budget.resets_in(now).as_millis()).unwrap_or(u64::MAX),
                "rate budget exhausted"
            );
            false
        }
    }

    /// Calls still permitted in the current window
    pub fn remaining(&self, provider: &str) -> u32 {
        self.snapshot(provider).remaining
    }

    /// Snapshot of one provider's budget without consuming anything
    pub fn snapshot(&self, provider: &str) -> BudgetSnapshot {
        let now = Instant::now();
        let mut budget = self.budgets.get(provider).map_or_else(
            || RateBudget::new(self.policy_for(provider), now),
            |budget| budget.clone(),
        );
        budget.roll(now);

        BudgetSnapshot {
            window_limit: budget.policy.limit,
            window_seconds: budget.policy.window.as_secs(),
            calls_in_window: budget.calls_in_window,
            remaining: budget.remaining(),
            resets_in_ms: u64::try_from(budget.resets_in(now).as_millis()).unwrap_or(u64::MAX),
        }
    }
}
