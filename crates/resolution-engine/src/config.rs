// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration
//!
//! Loaded once at startup and immutable afterwards. Every field has a default,
//! so a partial document (or none at all) yields a working engine.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use shared_types::EntityKind;

use crate::error::{EngineError, EngineResult};

// Health defaults
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECONDS: u64 = 30;
const DEFAULT_BACKOFF_CAP_SECONDS: u64 = 3600;

// Rate budget defaults (per provider)
const DEFAULT_WINDOW_LIMIT: u32 = 900;
const DEFAULT_WINDOW_SECONDS: u64 = 3600;

// Cache defaults
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;
const SEVEN_DAYS_SECONDS: u64 = 7 * 24 * 3600;
const DEFAULT_POST_TTL_SECONDS: u64 = 3600;
const DEFAULT_SEARCH_TTL_SECONDS: u64 = 900;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consecutive failures before a provider enters cooldown
    pub failure_threshold: u32,
    /// Cooldown base; doubles with every further consecutive failure
    pub backoff_base_seconds: u64,
    /// Upper bound on any single cooldown
    pub backoff_cap_seconds: u64,
    /// Default calls permitted per provider per window
    pub window_limit: u32,
    /// Default fixed window length
    pub window_seconds: u64,
    /// Response cache settings
    pub cache: CacheConfig,
    /// Per-provider overrides keyed by provider name
    pub providers: HashMap<String, ProviderSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            backoff_base_seconds: DEFAULT_BACKOFF_BASE_SECONDS,
            backoff_cap_seconds: DEFAULT_BACKOFF_CAP_SECONDS,
            window_limit: DEFAULT_WINDOW_LIMIT,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            cache: CacheConfig::default(),
            providers: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] describing the first violation.
    pub fn validate(&self) -> EngineResult<()> {
        if self.failure_threshold == 0 {
            return Err(EngineError::configuration(
                "failure_threshold must be at least 1",
            ));
        }
        if self.backoff_base_seconds == 0 {
            return Err(EngineError::configuration(
                "backoff_base_seconds must be greater than 0",
            ));
        }
        if self.backoff_cap_seconds < self.backoff_base_seconds {
            return Err(EngineError::configuration(
                "backoff_cap_seconds cannot be below backoff_base_seconds",
            ));
        }
        if self.window_seconds == 0 {
            return Err(EngineError::configuration(
                "window_seconds must be greater than 0",
            ));
        }
        self.cache.validate()?;

        for (name, settings) in &self.providers {
            if settings.window_seconds == Some(0) {
                return Err(EngineError::configuration(format!(
                    "provider {name}: window_seconds must be greater than 0"
                )));
            }
            if settings.timeout_seconds == Some(0) {
                return Err(EngineError::configuration(format!(
                    "provider {name}: timeout_seconds must be greater than 0"
                )));
            }
        }
        Ok(())
    }

    /// Cooldown base as a duration
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_seconds)
    }

    /// Cooldown ceiling as a duration
    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_seconds)
    }

    /// Settings for a named provider, falling back to defaults
    pub fn provider(&self, name: &str) -> ProviderSettings {
        self.providers.get(name).cloned().unwrap_or_default()
    }

    /// Effective `(limit, window)` for a named provider
    pub fn window_for(&self, name: &str) -> (u32, Duration) {
        let settings = self.providers.get(name);
        let limit = settings
            .and_then(|s| s.window_limit)
            .unwrap_or(self.window_limit);
        let seconds = settings
            .and_then(|s| s.window_seconds)
            .unwrap_or(self.window_seconds);
        (limit, Duration::from_secs(seconds))
    }
}

/// Per-provider overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Disabled providers are never registered
    pub enabled: bool,
    /// Replaces the provider's built-in rank
    pub rank: Option<u32>,
    /// Replaces the default window limit
    pub window_limit: Option<u32>,
    /// Replaces the default window length
    pub window_seconds: Option<u64>,
    /// Replaces the provider's built-in attempt timeout
    pub timeout_seconds: Option<u64>,
    /// Replaces the provider's requested gap between calls
    pub min_interval_ms: Option<u64>,
    /// Replaces the provider's requested jitter bound
    pub max_jitter_ms: Option<u64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rank: None,
            window_limit: None,
            window_seconds: None,
            timeout_seconds: None,
            min_interval_ms: None,
            max_jitter_ms: None,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity bound; the least recently used entry is evicted beyond it
    pub max_entries: usize,
    /// How often the background sweeper drops expired entries
    pub sweep_interval_seconds: u64,
    /// Per-kind time to live
    pub ttl: KindTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            ttl: KindTtls::default(),
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> EngineResult<()> {
        if self.max_entries == 0 {
            return Err(EngineError::configuration(
                "cache.max_entries must be greater than 0",
            ));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(EngineError::configuration(
                "cache.sweep_interval_seconds must be greater than 0",
            ));
        }
        for kind in EntityKind::all() {
            if self.ttl.for_kind(*kind).is_zero() {
                return Err(EngineError::configuration(format!(
                    "cache.ttl.{kind}_seconds must be greater than 0"
                )));
            }
        }
        Ok(())
    }

    /// Sweep interval as a duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Default cache lifetimes per entity kind
///
/// Profiles and companies change rarely; posts and searches go stale fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindTtls {
    /// Profile lifetime
    pub profile_seconds: u64,
    /// Company lifetime
    pub company_seconds: u64,
    /// Post lifetime
    pub post_seconds: u64,
    /// Search lifetime
    pub search_seconds: u64,
}

impl Default for KindTtls {
    fn default() -> Self {
        Self {
            profile_seconds: SEVEN_DAYS_SECONDS,
            company_seconds: SEVEN_DAYS_SECONDS,
            post_seconds: DEFAULT_POST_TTL_SECONDS,
            search_seconds: DEFAULT_SEARCH_TTL_SECONDS,
        }
    }
}

impl KindTtls {
    /// The same lifetime for every kind
    pub const fn uniform(seconds: u64) -> Self {
        Self {
            profile_seconds: seconds,
            company_seconds: seconds,
            post_seconds: seconds,
            search_seconds: seconds,
        }
    }

    /// Lifetime for `kind`
    pub const fn for_kind(&self, kind: EntityKind) -> Duration {
        let seconds = match kind {
            EntityKind::Profile => self.profile_seconds,
            EntityKind::Company => self.company_seconds,
            EntityKind::Post => self.post_seconds,
            EntityKind::Search => self.search_seconds,
        };
        Duration::from_secs(seconds)
    }
}
