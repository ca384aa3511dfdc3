// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! TTL response cache keyed by [`EntityKey`]
//!
//! Entries are written only from successful resolutions and replaced whole on
//! every write. Expiry is checked lazily on read; [`ResponseCache::cleanup_expired`]
//! exists to bound memory and is driven by the engine's background sweeper.
//! When the cache is full the least recently used entry is evicted.

use std::{collections::BTreeMap, time::Duration};

use dashmap::DashMap;
use provider_client::Payload;
use serde::Serialize;
use shared_types::{EntityKey, EntityKind};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::KindTtls;

const HITS: &str = "hits";
const MISSES: &str = "misses";
const STORES: &str = "stores";
const EVICTIONS: &str = "evictions";
const EXPIRED: &str = "expired";
const INVALIDATIONS: &str = "invalidations";
const PROVIDER_HIT_PREFIX: &str = "hits:";

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Payload,
    provider: String,
    stored_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
    access_count: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// A fresh cached response
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// The stored payload
    pub payload: Payload,
    /// Provider that originally produced the payload
    pub provider: String,
    /// Time since the payload was stored
    pub age: Duration,
}

/// In-memory response cache
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<EntityKey, CacheEntry>,
    ttls: KindTtls,
    max_entries: usize,
    stats: DashMap<String, u64>,
}

impl ResponseCache {
    /// Create a cache with per-kind default lifetimes and a capacity bound
    pub fn new(ttls: KindTtls, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttls,
            max_entries: max_entries.max(1),
            stats: DashMap::new(),
        }
    }

    /// Default lifetime for entries of `kind`
    pub fn default_ttl(&self, kind: EntityKind) -> Duration {
        self.ttls.for_kind(kind)
    }

    /// Look up a fresh entry, counting a hit or a miss
    pub fn get(&self, key: &EntityKey) -> Option<CachedResponse> {
        let found = self.lookup(key);
        match &found {
            Some(hit) => {
                self.increment_stat(HITS);
                self.increment_stat(&format!("{PROVIDER_HIT_PREFIX}{}", hit.provider));
                trace!(%key, provider = %hit.provider, "cache hit");
            }
            None => self.increment_stat(MISSES),
        }
        found
    }

    /// Look up a fresh entry without touching hit/miss statistics
    pub fn peek(&self, key: &EntityKey) -> Option<CachedResponse> {
        self.lookup(key)
    }

    fn lookup(&self, key: &EntityKey) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;

        if entry.is_fresh(now) {
            entry.access_count += 1;
            entry.last_accessed = now;
            return Some(CachedResponse {
                payload: entry.payload.clone(),
                provider: entry.provider.clone(),
                age: now.saturating_duration_since(entry.stored_at),
            });
        }

        drop(entry);
        // an expired entry may have been replaced between the two locks
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_fresh(now))
            .is_some()
        {
            self.increment_stat(EXPIRED);
            debug!(%key, "expired cache entry removed");
        }
        None
    }

    /// Store a payload, replacing any previous entry for `key`
    ///
    /// `ttl` overrides the per-kind default when given.
    pub fn put(&self, key: &EntityKey, payload: Payload, provider: &str, ttl: Option<Duration>) {
        let current_size = self.entries.len();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let capacity_threshold = (self.max_entries as f64 * 0.9) as usize;

        if !self.entries.contains_key(key) {
            if current_size >= self.max_entries {
                self.cleanup_expired();
                if self.entries.len() >= self.max_entries {
                    self.evict_least_recently_used();
                }
            } else if current_size >= capacity_threshold {
                self.cleanup_expired();
            }
        }

        let now = Instant::now();
        let ttl = ttl.unwrap_or_else(|| self.default_ttl(key.kind()));
        self.entries.insert(
            key.clone(),
            CacheEntry {
                payload,
                provider: provider.to_string(),
                stored_at: now,
                ttl,
                last_accessed: now,
                access_count: 0,
            },
        );
        self.increment_stat(STORES);

        trace!(
            %key,
            provider,
            ttl_secs = ttl.as_secs(),
            size = self.entries.len(),
            max = self.max_entries,
            "stored response in cache"
        );
    }

    /// Drop the entry for `key`; returns whether one existed
    pub fn invalidate(&self, key: &EntityKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.increment_stat(INVALIDATIONS);
            debug!(%key, "cache entry invalidated");
        }
        removed
    }

    /// Drop every entry of one kind; returns how many were removed
    pub fn invalidate_kind(&self, kind: EntityKind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.kind() != kind);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.add_stat(INVALIDATIONS, removed as u64);
            debug!(%kind, removed, "cache entries invalidated by kind");
        }
        removed
    }

    /// Drop every entry, keeping statistics
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cleared all cached responses");
    }

    /// Number of stored entries, including not-yet-collected expired ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_least_recently_used(&self) {
        let victim = self
            .entries
            .iter()
            .min_by(|a, b| {
                a.last_accessed
                    .cmp(&b.last_accessed)
                    .then(a.access_count.cmp(&b.access_count))
            })
            .map(|item| item.key().clone());

        if let Some(key) = victim
            && let Some((_, entry)) = self.entries.remove(&key)
        {
            self.increment_stat(EVICTIONS);
            info!(
                %key,
                provider = %entry.provider,
                access_count = entry.access_count,
                remaining_entries = self.entries.len(),
                "evicted lru cache entry due to capacity limit"
            );
        }
    }

    /// Remove every expired entry; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            self.add_stat(EXPIRED, removed as u64);
            debug!(removed, remaining = self.entries.len(), "cleaned up expired cache entries");
        }
        removed
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.get_stat(HITS);
        let misses = self.get_stat(MISSES);
        let lookups = hits + misses;
        let size = self.entries.len();

        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups > 0 {
            hits as f64 / lookups as f64
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let utilization_rate = size as f64 / self.max_entries as f64;

        let hits_by_provider = self
            .stats
            .iter()
            .filter_map(|item| {
                item.key()
                    .strip_prefix(PROVIDER_HIT_PREFIX)
                    .map(|provider| (provider.to_string(), *item.value()))
            })
            .collect();

        CacheStats {
            entry_count: size,
            max_capacity: self.max_entries,
            hits,
            misses,
            stores: self.get_stat(STORES),
            evictions: self.get_stat(EVICTIONS),
            expired: self.get_stat(EXPIRED),
            invalidations: self.get_stat(INVALIDATIONS),
            hit_rate,
            utilization_rate,
            hits_by_provider,
        }
    }

    fn increment_stat(&self, key: &str) {
        self.add_stat(key, 1);
    }

    fn add_stat(&self, key: &str, amount: u64) {
        *self.stats.entry(key.to_string()).or_insert(0) += amount;
    }

    fn get_stat(&self, key: &str) -> u64 {
        self.stats.get(key).map_or(0, |v| *v)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Stored entries
    pub entry_count: usize,
    /// Capacity bound
    pub max_capacity: usize,
    /// Fresh lookups
    pub hits: u64,
    /// Absent or expired lookups
    pub misses: u64,
    /// Writes
    pub stores: u64,
    /// Capacity evictions
    pub evictions: u64,
    /// Entries dropped after expiry
    pub expired: u64,
    /// Entries dropped by explicit invalidation
    pub invalidations: u64,
    /// `hits / (hits + misses)`
    pub hit_rate: f64,
    /// `entry_count / max_capacity`
    pub utilization_rate: f64,
    /// Hits broken down by the provider that produced the entry
    pub hits_by_provider: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile(id: &str) -> EntityKey {
        EntityKey::new(EntityKind::Profile, id)
    }

    fn cache(ttl_secs: u64, max_entries: usize) -> ResponseCache {
        ResponseCache::new(KindTtls::uniform(ttl_secs), max_entries)
    }

    #[tokio::test(start_paused = true)]
    async fn stores_and_expires_lazily() {
        let cache = cache(1, 10);
        let key = profile("jane");
        assert!(cache.get(&key).is_none());

        cache.put(&key, json!({"name": "Jane"}), "pnd", None);
        tokio::time::advance(Duration::from_millis(500)).await;
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.payload["name"], "Jane");
        assert_eq!(hit.provider, "pnd");
        assert_eq!(hit.age, Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.hits_by_provider.get("pnd"), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_override_and_kind_defaults() {
        let ttls = KindTtls {
            profile_seconds: 100,
            company_seconds: 100,
            post_seconds: 10,
            search_seconds: 5,
        };
        let cache = ResponseCache::new(ttls, 10);
        let search = EntityKey::new(EntityKind::Search, "rust");
        let company = EntityKey::new(EntityKind::Company, "acme");

        cache.put(&search, json!([]), "pnd", None);
        cache.put(&company, json!({}), "pnd", Some(Duration::from_secs(2)));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(cache.peek(&search).is_some());
        assert!(cache.peek(&company).is_none());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(cache.peek(&search).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn peek_does_not_count() {
        let cache = cache(60, 10);
        let key = profile("jane");
        assert!(cache.peek(&key).is_none());
        cache.put(&key, json!(1), "pnd", None);
        assert!(cache.peek(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn put_replaces_whole_entry() {
        let cache = cache(10, 10);
        let key = profile("jane");
        cache.put(&key, json!({"v": 1}), "pnd", None);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(&key, json!({"v": 2}), "voyager", None);
        tokio::time::advance(Duration::from_secs(8)).await;

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.payload["v"], 2);
        assert_eq!(hit.provider, "voyager");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_least_recently_used_at_capacity() {
        let cache = cache(3600, 2);
        let (k1, k2, k3) = (profile("a"), profile("b"), profile("c"));

        cache.put(&k1, json!(1), "pnd", None);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(&k2, json!(2), "pnd", None);
        tokio::time::advance(Duration::from_secs(1)).await;
        // touching k1 makes k2 the least recently used
        assert!(cache.get(&k1).is_some());
        tokio::time::advance(Duration::from_secs(1)).await;

        cache.put(&k3, json!(3), "pnd", None);
        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&k1).is_some());
        assert!(cache.peek(&k2).is_none());
        assert!(cache.peek(&k3).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_prefers_dropping_expired_entries() {
        let cache = ResponseCache::new(
            KindTtls {
                profile_seconds: 3600,
                company_seconds: 3600,
                post_seconds: 1,
                search_seconds: 1,
            },
            2,
        );
        let post = EntityKey::new(EntityKind::Post, "123");
        cache.put(&post, json!(1), "pnd", None);
        cache.put(&profile("a"), json!(2), "pnd", None);
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.put(&profile("b"), json!(3), "pnd", None);
        assert!(cache.peek(&profile("a")).is_some());
        assert!(cache.peek(&profile("b")).is_some());
        let stats = cache.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation() {
        let cache = cache(60, 10);
        let company = EntityKey::new(EntityKind::Company, "acme");
        cache.put(&profile("a"), json!(1), "pnd", None);
        cache.put(&profile("b"), json!(2), "pnd", None);
        cache.put(&company, json!(3), "pnd", None);

        assert!(cache.invalidate(&company));
        assert!(!cache.invalidate(&company));
        assert_eq!(cache.invalidate_kind(EntityKind::Profile), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 3);

        cache.put(&company, json!(3), "pnd", None);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().stores, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_only_expired() {
        let cache = ResponseCache::new(
            KindTtls {
                profile_seconds: 10,
                company_seconds: 100,
                post_seconds: 10,
                search_seconds: 10,
            },
            10,
        );
        cache.put(&profile("a"), json!(1), "pnd", None);
        cache.put(&EntityKey::new(EntityKind::Company, "acme"), json!(2), "pnd", None);
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup_expired(), 0);

        let stats = cache.stats();
        assert!((stats.utilization_rate - 0.1).abs() < f64::EPSILON);
        assert!((stats.hit_rate - 0.0).abs() < f64::EPSILON);
    }
}
