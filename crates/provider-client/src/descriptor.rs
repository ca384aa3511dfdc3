// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Static provider descriptions

use std::{collections::BTreeSet, time::Duration};

use shared_types::{CredentialKind, EntityKind};

const DEFAULT_ATTEMPT_TIMEOUT_SECONDS: u64 = 10;

/// Static configuration for one provider
///
/// Lower ranks are tried first. Descriptors are built once at startup and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    name: String,
    rank: u32,
    requires: BTreeSet<CredentialKind>,
    capability: BTreeSet<EntityKind>,
    timeout: Duration,
    min_interval: Duration,
    max_jitter: Duration,
}

impl ProviderDescriptor {
    /// Create a descriptor with no requirements and no capabilities
    pub fn new(name: impl Into<String>, rank: u32) -> Self {
        Self {
            name: name.into(),
            rank,
            requires: BTreeSet::new(),
            capability: BTreeSet::new(),
            timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECONDS),
            min_interval: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Add a required credential kind
    #[must_use]
    pub fn requires(mut self, kind: CredentialKind) -> Self {
        self.requires.insert(kind);
        self
    }

    /// Add a resolvable entity kind
    #[must_use]
    pub fn capable_of(mut self, kind: EntityKind) -> Self {
        self.capability.insert(kind);
        self
    }

    /// Add several resolvable entity kinds
    #[must_use]
    pub fn capable_of_all(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.capability.extend(kinds);
        self
    }

    /// Set the per-attempt timeout the caller should enforce
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the caller to space consecutive calls apart
    ///
    /// Each call should start at least `min_interval` after the previous one,
    /// plus a random delay below `max_jitter`. The wait is the caller's
    /// concern and is not part of the attempt timeout.
    #[must_use]
    pub fn with_spacing(mut self, min_interval: Duration, max_jitter: Duration) -> Self {
        self.min_interval = min_interval;
        self.max_jitter = max_jitter;
        self
    }

    /// Override the rank
    #[must_use]
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    /// Provider name, unique within one engine
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority; ascending order is attempt order
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Credential kinds that must all be present before an attempt
    pub fn required(&self) -> &BTreeSet<CredentialKind> {
        &self.requires
    }

    /// Entity kinds this provider can resolve
    pub fn capabilities(&self) -> &BTreeSet<EntityKind> {
        &self.capability
    }

    /// Whether this provider can resolve `kind`
    pub fn supports(&self, kind: EntityKind) -> bool {
        self.capability.contains(&kind)
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Minimum gap between two calls
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Upper bound of the random delay added before a call
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_sets() {
        let descriptor = ProviderDescriptor::new("pnd", 1)
            .requires(CredentialKind::ApiKey)
            .capable_of_all([EntityKind::Profile, EntityKind::Company])
            .capable_of(EntityKind::Profile);

        assert_eq!(descriptor.name(), "pnd");
        assert_eq!(descriptor.rank(), 1);
        assert_eq!(descriptor.capabilities().len(), 2);
        assert!(descriptor.supports(EntityKind::Company));
        assert!(!descriptor.supports(EntityKind::Search));
        assert!(descriptor.required().contains(&CredentialKind::ApiKey));
        assert_eq!(
            descriptor.timeout(),
            Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECONDS)
        );
        assert_eq!(descriptor.min_interval(), Duration::ZERO);
    }

    #[test]
    fn spacing_is_separate_from_timeout() {
        let descriptor = ProviderDescriptor::new("enhanced", 4)
            .with_timeout(Duration::from_secs(15))
            .with_spacing(Duration::from_secs(1), Duration::from_millis(1500));

        assert_eq!(descriptor.timeout(), Duration::from_secs(15));
        assert_eq!(descriptor.min_interval(), Duration::from_secs(1));
        assert_eq!(descriptor.max_jitter(), Duration::from_millis(1500));
    }

    #[test]
    fn rank_override() {
        let descriptor = ProviderDescriptor::new("voyager", 6).with_rank(2);
        assert_eq!(descriptor.rank(), 2);
    }
}
