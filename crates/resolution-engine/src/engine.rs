// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! The resolution engine
//!
//! A resolution runs in three stages: a cache probe, in-flight
//! deduplication, and a walk over the capable providers in rank order. Each
//! candidate is gated on credentials, then health, then rate budget, and is
//! given one bounded attempt. A timed-out attempt is retried once against the
//! same provider before it counts as a failure; any other failure moves the
//! walk to the next candidate.
//!
//! Providers that ask for spacing between calls get it here, before the
//! attempt deadline starts, so waiting for a slot never reads as a timeout.
//!
//! The walk for a key runs on its own task, so a caller that stops waiting
//! does not abandon the waiters that joined it.

use std::{collections::BTreeSet, fmt, sync::Arc, time::Duration};

use provider_client::{
    CredentialBundle, CredentialStore, FailureKind, Payload, Provider, StaticCredentials,
};
use shared_types::{EntityKey, EntityKind};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, sleep},
};
use tokio_retry::{RetryIf, strategy::FixedInterval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::{
    cache::{CachedResponse, ResponseCache},
    config::EngineConfig,
    diagnostics::{EngineCounters, EngineDiagnostics, ProviderDiagnostics},
    error::{EngineError, EngineResult},
    health::{BackoffPolicy, HealthTracker},
    inflight::{InFlight, Registration, wait_for_outcome},
    observer::{NoopObserver, ResolutionObserver},
    outcome::{AttemptTrail, CACHE_PROVIDER, PolicyRejection, ResolutionOutcome, SkipReason},
    rate_limit::{RateLimiter, WindowPolicy},
    spacing::{CallSpacer, SpacingPolicy},
};

/// Per-call resolution options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the cache probe and always walk the providers
    ///
    /// A resolution already in flight for the key is still joined.
    pub force_refresh: bool,
    /// Store the result under this TTL instead of the kind default
    pub ttl_override: Option<Duration>,
}

impl ResolveOptions {
    /// Options that bypass the cache probe
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ttl_override: None,
        }
    }
}

#[derive(Debug)]
struct RegisteredProvider {
    provider: Arc<dyn Provider>,
    rank: u32,
    timeout: Duration,
    spacing: SpacingPolicy,
}

impl RegisteredProvider {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn supports(&self, kind: EntityKind) -> bool {
        self.provider.descriptor().supports(kind)
    }
}

struct Attempt {
    result: Result<Payload, FailureKind>,
    elapsed: Duration,
    retried: bool,
}

enum AttemptError {
    Failed(FailureKind),
    RetryDenied,
}

struct EngineInner {
    providers: Vec<RegisteredProvider>,
    credentials: Arc<dyn CredentialStore>,
    observer: Arc<dyn ResolutionObserver>,
    health: HealthTracker,
    limiter: RateLimiter,
    spacer: CallSpacer,
    cache: ResponseCache,
    inflight: InFlight,
    counters: EngineCounters,
    config: EngineConfig,
}

impl fmt::Debug for EngineInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineInner")
            .field("providers", &self.providers)
            .field("health", &self.health)
            .field("limiter", &self.limiter)
            .field("spacer", &self.spacer)
            .field("cache", &self.cache)
            .field("inflight", &self.inflight)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// Multi-provider resolver with caching, health gating and deduplication
///
/// Cheap to clone; clones share all state.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    inner: Arc<EngineInner>,
}

/// Builder for [`ResolutionEngine`]
pub struct ResolutionEngineBuilder {
    config: EngineConfig,
    providers: Vec<Arc<dyn Provider>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    observer: Option<Arc<dyn ResolutionObserver>>,
}

impl fmt::Debug for ResolutionEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngineBuilder")
            .field("config", &self.config)
            .field("providers", &self.providers)
            .field("credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl ResolutionEngineBuilder {
    /// Register a provider
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register several providers
    #[must_use]
    pub fn providers(mut self, providers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Use `store` for credential lookups; defaults to an empty store
    #[must_use]
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Report attempts and skips to `observer`
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate configuration and assemble the engine
    ///
    /// Providers disabled in configuration are dropped here. Rank, timeout
    /// and spacing overrides from configuration replace the provider's own
    /// values.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or two
    /// providers share a name.
    pub fn build(self) -> EngineResult<ResolutionEngine> {
        let config = self.config;
        config.validate()?;

        let mut seen = BTreeSet::new();
        let mut providers = Vec::with_capacity(self.providers.len());
        for provider in self.providers {
            let name = provider.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(EngineError::DuplicateProvider { name });
            }

            let settings = config.provider(&name);
            if !settings.enabled {
                info!(provider = %name, "provider disabled by configuration");
                continue;
            }

            let descriptor = provider.descriptor();
            let rank = settings.rank.unwrap_or_else(|| descriptor.rank());
            let timeout = settings
                .timeout_seconds
                .map_or_else(|| descriptor.timeout(), Duration::from_secs);
            let spacing = SpacingPolicy::new(
                settings
                    .min_interval_ms
                    .map_or_else(|| descriptor.min_interval(), Duration::from_millis),
                settings
                    .max_jitter_ms
                    .map_or_else(|| descriptor.max_jitter(), Duration::from_millis),
            );
            providers.push(RegisteredProvider {
                provider,
                rank,
                timeout,
                spacing,
            });
        }
        providers.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name().cmp(b.name())));

        let limiter = RateLimiter::new(WindowPolicy::new(
            config.window_limit,
            Duration::from_secs(config.window_seconds),
        ));
        for registered in &providers {
            let (limit, window) = config.window_for(registered.name());
            limiter.register(registered.name(), WindowPolicy::new(limit, window));
        }

        let health = HealthTracker::new(BackoffPolicy::new(
            config.failure_threshold,
            config.backoff_base(),
            config.backoff_cap(),
        ));
        let cache = ResponseCache::new(config.cache.ttl, config.cache.max_entries);

        info!(
            providers = ?providers.iter().map(RegisteredProvider::name).collect::<Vec<_>>(),
            "resolution engine ready"
        );

        Ok(ResolutionEngine {
            inner: Arc::new(EngineInner {
                providers,
                credentials: self
                    .credentials
                    .unwrap_or_else(|| Arc::new(StaticCredentials::default())),
                observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
                health,
                limiter,
                spacer: CallSpacer::default(),
                cache,
                inflight: InFlight::default(),
                counters: EngineCounters::default(),
                config,
            }),
        })
    }
}

impl ResolutionEngine {
    /// Start building an engine from `config`
    pub fn builder(config: EngineConfig) -> ResolutionEngineBuilder {
        ResolutionEngineBuilder {
            config,
            providers: Vec::new(),
            credentials: None,
            observer: None,
        }
    }

    /// Resolve `key` through the cache and the ranked providers
    ///
    /// Ordinary provider failures are reported in the returned outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResolutionAborted`] only if the task walking
    /// the providers for this key died without publishing an outcome.
    #[instrument(skip(self, options), fields(key = %key, refresh = options.force_refresh))]
    pub async fn resolve(
        &self,
        key: &EntityKey,
        options: ResolveOptions,
    ) -> EngineResult<ResolutionOutcome> {
        let inner = &self.inner;
        inner.counters.resolution_started();

        if let Err(reason) = validate_key(key) {
            debug!(%reason, "rejecting malformed key");
            return Ok(inner.finish(ResolutionOutcome::RejectedByPolicy { reason }));
        }

        if !options.force_refresh
            && let Some(hit) = inner.cache.get(key)
        {
            inner.counters.cache_hit();
            return Ok(inner.finish(from_cache(hit)));
        }

        let registration = inner.inflight.register(key, || {
            if options.force_refresh {
                None
            } else {
                inner.cache.peek(key)
            }
        });

        let outcome = match registration {
            Registration::Cached(hit) => {
                inner.counters.cache_hit();
                from_cache(hit)
            }
            Registration::Follower(receiver) => {
                inner.counters.joined();
                debug!("joining in-flight resolution");
                wait_for_outcome(receiver, key).await?
            }
            Registration::Leader(slot) => {
                let receiver = slot.subscribe();
                let walker = Arc::clone(inner);
                let owned_key = key.clone();
                tokio::spawn(
                    async move {
                        let outcome = walker.run_chain(&owned_key, options).await;
                        slot.publish(outcome);
                    }
                    .instrument(Span::current()),
                );
                wait_for_outcome(receiver, key).await?
            }
        };

        Ok(inner.finish(outcome))
    }

    /// Drop the cached response for `key`
    pub fn invalidate(&self, key: &EntityKey) -> bool {
        self.inner.cache.invalidate(key)
    }

    /// Drop every cached response of one kind
    pub fn invalidate_kind(&self, kind: EntityKind) -> usize {
        self.inner.cache.invalidate_kind(kind)
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Remove expired cache entries now
    pub fn cleanup_expired(&self) -> usize {
        self.inner.cache.cleanup_expired()
    }

    /// Put one provider back into service after its cause of failure is fixed
    ///
    /// Clears the failure streak and any cooldown. Returns whether the
    /// provider was failing or cooling down.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownProvider`] if no registered provider has
    /// this name.
    pub fn reset_provider(&self, name: &str) -> EngineResult<bool> {
        if !self
            .inner
            .providers
            .iter()
            .any(|registered| registered.name() == name)
        {
            return Err(EngineError::UnknownProvider {
                name: name.to_string(),
            });
        }
        Ok(self.inner.health.reset(name))
    }

    /// Put every provider back into service; returns how many were failing
    pub fn reset_all_providers(&self) -> usize {
        self.inner.health.reset_all()
    }

    /// Registered provider names in attempt order
    pub fn provider_names(&self) -> Vec<&str> {
        self.inner
            .providers
            .iter()
            .map(RegisteredProvider::name)
            .collect()
    }

    /// Configuration the engine was built from
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Snapshot of provider health, budgets, cache and counters
    pub fn diagnostics(&self) -> EngineDiagnostics {
        let inner = &self.inner;
        let providers = inner
            .providers
            .iter()
            .map(|registered| {
                let name = registered.name();
                let descriptor = registered.provider.descriptor();
                ProviderDiagnostics {
                    name: name.to_string(),
                    rank: registered.rank,
                    timeout_ms: millis(registered.timeout),
                    min_interval_ms: millis(registered.spacing.min_interval),
                    capabilities: descriptor.capabilities().iter().copied().collect(),
                    requires: descriptor.required().iter().copied().collect(),
                    credentials_present: descriptor
                        .required()
                        .iter()
                        .all(|kind| inner.credentials.has(*kind)),
                    health: inner.health.snapshot(name),
                    budget: inner.limiter.snapshot(name),
                }
            })
            .collect();

        EngineDiagnostics {
            providers,
            cache: inner.cache.stats(),
            counters: inner.counters.snapshot(),
            in_flight: inner.inflight.len(),
        }
    }

    /// Periodically purge expired cache entries until `cancellation_token` fires
    pub fn spawn_cache_sweeper(&self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let period = inner.config.cache.sweep_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = cancellation_token.cancelled() => {
                        debug!("cache sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = inner.cache.cleanup_expired();
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                }
            }
        })
    }
}

impl EngineInner {
    fn finish(&self, outcome: ResolutionOutcome) -> ResolutionOutcome {
        self.counters.finished(&outcome);
        outcome
    }

    /// Wait for the provider's next call slot, if it asks for spacing
    async fn wait_for_slot(&self, candidate: &RegisteredProvider) {
        let wait = self.spacer.reserve(candidate.name(), candidate.spacing);
        if !wait.is_zero() {
            debug!(provider = candidate.name(), wait_ms = millis(wait), "waiting for call slot");
            sleep(wait).await;
        }
    }

    fn skip(&self, trail: &mut AttemptTrail, provider: &str, reason: SkipReason) {
        debug!(provider, reason = reason.label(), "skipping provider");
        self.observer.provider_skipped(provider, &reason);
        trail.record_skip(provider, reason);
    }

    async fn run_chain(&self, key: &EntityKey, options: ResolveOptions) -> ResolutionOutcome {
        let candidates: Vec<&RegisteredProvider> = self
            .providers
            .iter()
            .filter(|registered| registered.supports(key.kind()))
            .collect();
        if candidates.is_empty() {
            warn!(kind = %key.kind(), "no provider can resolve this kind");
            return ResolutionOutcome::RejectedByPolicy {
                reason: PolicyRejection::NoCapableProvider { kind: key.kind() },
            };
        }

        let mut trail = AttemptTrail::default();
        let mut missing_everywhere = BTreeSet::new();
        let mut credentialed = 0_usize;

        for candidate in candidates {
            let name = candidate.name();

            let bundle = match CredentialBundle::collect(
                self.credentials.as_ref(),
                candidate.provider.descriptor().required(),
            ) {
                Ok(bundle) => bundle,
                Err(missing) => {
                    missing_everywhere.extend(missing.iter().copied());
                    self.skip(&mut trail, name, SkipReason::MissingCredentials { missing });
                    continue;
                }
            };
            credentialed += 1;

            if let Some(remaining) = self.health.cooldown_remaining(name) {
                self.skip(
                    &mut trail,
                    name,
                    SkipReason::CoolingDown {
                        remaining_ms: millis(remaining),
                    },
                );
                continue;
            }

            if !self.limiter.try_acquire(name) {
                let resets_in_ms = self.limiter.snapshot(name).resets_in_ms;
                self.skip(&mut trail, name, SkipReason::BudgetExhausted { resets_in_ms });
                continue;
            }

            self.wait_for_slot(candidate).await;
            let attempt = self.attempt(candidate, key, &bundle).await;
            match attempt.result {
                Ok(payload) => {
                    self.health.record_success(name);
                    self.observer.attempt_finished(name, None, attempt.elapsed);
                    self.cache
                        .put(key, payload.clone(), name, options.ttl_override);
                    info!(
                        provider = name,
                        elapsed_ms = millis(attempt.elapsed),
                        failed_before = trail.attempts().len(),
                        "resolved"
                    );
                    return ResolutionOutcome::Success {
                        payload,
                        provider: name.to_string(),
                        trail,
                    };
                }
                Err(kind) => {
                    self.health.record_failure(name, kind);
                    self.observer
                        .attempt_finished(name, Some(kind), attempt.elapsed);
                    warn!(
                        provider = name,
                        failure = kind.label(),
                        retried = attempt.retried,
                        "provider attempt failed"
                    );
                    trail.record_failure(name, kind, millis(attempt.elapsed), attempt.retried);
                }
            }
        }

        if credentialed == 0 {
            warn!(missing = ?missing_everywhere, "no capable provider has credentials");
            return ResolutionOutcome::RejectedByPolicy {
                reason: PolicyRejection::MissingCredentials {
                    missing: missing_everywhere.into_iter().collect(),
                },
            };
        }

        warn!(
            attempts = trail.attempts().len(),
            skipped = trail.skips().len(),
            "all providers exhausted"
        );
        ResolutionOutcome::Exhausted { trail }
    }

    /// One bounded call, plus a single retry if it timed out
    ///
    /// The retry draws from the same rate budget; without budget the timeout
    /// stands. The retry also waits for its own call slot, outside its
    /// deadline.
    async fn attempt(
        &self,
        candidate: &RegisteredProvider,
        key: &EntityKey,
        bundle: &CredentialBundle,
    ) -> Attempt {
        let started = Instant::now();
        let name = candidate.name();
        let limiter = &self.limiter;
        let mut calls = 0_u32;

        let result = RetryIf::spawn(
            FixedInterval::new(Duration::ZERO).take(1),
            || {
                calls += 1;
                let is_retry = calls > 1;
                async move {
                    if is_retry {
                        if !limiter.try_acquire(name) {
                            debug!(provider = name, "no budget left for timeout retry");
                            return Err(AttemptError::RetryDenied);
                        }
                        debug!(provider = name, "retrying after timeout");
                        self.wait_for_slot(candidate).await;
                    }
                    match tokio::time::timeout(candidate.timeout, candidate.provider.fetch(key, bundle))
                        .await
                    {
                        Ok(result) => result.map_err(AttemptError::Failed),
                        Err(_) => Err(AttemptError::Failed(FailureKind::Timeout)),
                    }
                }
            },
            |error: &AttemptError| {
                matches!(error, AttemptError::Failed(kind) if kind.is_locally_retryable())
            },
        )
        .await;

        let denied = matches!(result, Err(AttemptError::RetryDenied));
        Attempt {
            result: result.map_err(|error| match error {
                AttemptError::Failed(kind) => kind,
                AttemptError::RetryDenied => FailureKind::Timeout,
            }),
            elapsed: started.elapsed(),
            retried: calls > 1 && !denied,
        }
    }
}

fn from_cache(hit: CachedResponse) -> ResolutionOutcome {
    debug!(origin = %hit.provider, age_ms = millis(hit.age), "served from cache");
    ResolutionOutcome::Success {
        payload: hit.payload,
        provider: CACHE_PROVIDER.to_string(),
        trail: AttemptTrail::default(),
    }
}

fn validate_key(key: &EntityKey) -> Result<(), PolicyRejection> {
    if key.identifier().trim().is_empty() {
        return Err(PolicyRejection::InvalidKey {
            detail: "identifier must not be empty".to_string(),
        });
    }
    if let Some(sub_resource) = key.sub_resource()
        && sub_resource.trim().is_empty()
    {
        return Err(PolicyRejection::InvalidKey {
            detail: "sub-resource must not be blank when present".to_string(),
        });
    }
    Ok(())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use provider_client::ProviderDescriptor;
    use serde_json::json;

    use super::*;
    use crate::config::ProviderSettings;

    #[derive(Debug)]
    struct Fixed {
        descriptor: ProviderDescriptor,
    }

    impl Fixed {
        fn new(name: &str, rank: u32) -> Arc<dyn Provider> {
            Arc::new(Self {
                descriptor: ProviderDescriptor::new(name, rank).capable_of(EntityKind::Profile),
            })
        }
    }

    #[async_trait]
    impl Provider for Fixed {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn fetch(
            &self,
            _key: &EntityKey,
            _credentials: &CredentialBundle,
        ) -> Result<Payload, FailureKind> {
            Ok(json!({"from": self.descriptor.name()}))
        }
    }

    #[test]
    fn blank_identifiers_are_invalid() {
        let blank = EntityKey::new(EntityKind::Profile, "   ");
        assert!(matches!(
            validate_key(&blank),
            Err(PolicyRejection::InvalidKey { .. })
        ));

        let blank_sub = EntityKey::new(EntityKind::Post, "123").with_sub_resource(" ");
        assert!(validate_key(&blank_sub).is_err());

        let fine = EntityKey::new(EntityKind::Company, "acme").with_sub_resource("employees");
        assert!(validate_key(&fine).is_ok());
    }

    #[test]
    fn providers_are_ordered_by_rank_then_name() {
        let engine = ResolutionEngine::builder(EngineConfig::default())
            .provider(Fixed::new("zeta", 1))
            .provider(Fixed::new("alpha", 2))
            .provider(Fixed::new("beta", 1))
            .build()
            .unwrap();

        assert_eq!(engine.provider_names(), vec!["beta", "zeta", "alpha"]);
    }

    #[test]
    fn duplicate_names_are_refused() {
        let error = ResolutionEngine::builder(EngineConfig::default())
            .provider(Fixed::new("pnd", 1))
            .provider(Fixed::new("pnd", 2))
            .build()
            .unwrap_err();

        assert!(matches!(error, EngineError::DuplicateProvider { ref name } if name == "pnd"));
        assert!(error.is_configuration());
    }

    #[test]
    fn configuration_overrides_rank_and_disables_providers() {
        let mut config = EngineConfig::default();
        config.providers.insert(
            "late".to_string(),
            ProviderSettings {
                rank: Some(0),
                timeout_seconds: Some(2),
                ..ProviderSettings::default()
            },
        );
        config.providers.insert(
            "off".to_string(),
            ProviderSettings {
                enabled: false,
                ..ProviderSettings::default()
            },
        );

        let engine = ResolutionEngine::builder(config)
            .provider(Fixed::new("early", 1))
            .provider(Fixed::new("late", 9))
            .provider(Fixed::new("off", 0))
            .build()
            .unwrap();

        assert_eq!(engine.provider_names(), vec!["late", "early"]);
        let diagnostics = engine.diagnostics();
        assert_eq!(diagnostics.providers[0].rank, 0);
        assert_eq!(diagnostics.providers[0].timeout_ms, 2000);
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancellation() {
        let engine = ResolutionEngine::builder(EngineConfig::default())
            .build()
            .unwrap();
        let token = CancellationToken::new();

        let handle = engine.spawn_cache_sweeper(token.clone());
        token.cancel();

        handle.await.unwrap();
    }
}
