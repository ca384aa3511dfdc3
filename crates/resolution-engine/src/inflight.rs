// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Collapse concurrent resolutions of one key into a single upstream walk
//!
//! The first caller for a key becomes the leader and receives a
//! [`LeaderSlot`]; later callers receive a watch receiver and wait for the
//! leader's published outcome. Registration takes the per-key map entry lock
//! and re-checks the cache under it, so a caller that lost the race against a
//! leader which just finished cannot start a second upstream walk.
//!
//! The slot owns a guard that removes the map entry when dropped. The leader
//! publishes before the guard drops, and the engine writes the cache before
//! publishing, so a key is never briefly absent from both the cache and the
//! in-flight map.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use shared_types::EntityKey;
use tokio::sync::watch;

use crate::{
    cache::CachedResponse,
    error::{EngineError, EngineResult},
    outcome::ResolutionOutcome,
};

type Shared = watch::Receiver<Option<ResolutionOutcome>>;

/// Result of trying to enter in-flight state for a key
#[derive(Debug)]
pub(crate) enum Registration {
    /// No resolution was running; the caller must run one and publish it
    Leader(LeaderSlot),
    /// A resolution is running; wait on the receiver
    Follower(Shared),
    /// The cache became fresh while the caller was registering
    Cached(CachedResponse),
}

/// Exclusive right to resolve one key
#[derive(Debug)]
pub(crate) struct LeaderSlot {
    sender: watch::Sender<Option<ResolutionOutcome>>,
    _guard: InFlightGuard,
}

impl LeaderSlot {
    /// A receiver the leader's own caller can wait on
    pub(crate) fn subscribe(&self) -> Shared {
        self.sender.subscribe()
    }

    /// Hand the outcome to every waiter, then leave in-flight state
    pub(crate) fn publish(self, outcome: ResolutionOutcome) {
        self.sender.send_replace(Some(outcome));
    }
}

#[derive(Debug)]
struct InFlightGuard {
    entries: Arc<DashMap<EntityKey, Shared>>,
    key: EntityKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.entries.remove(&self.key);
    }
}

/// Map of keys currently being resolved
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    entries: Arc<DashMap<EntityKey, Shared>>,
}

impl InFlight {
    /// Enter in-flight state for `key`, or join the resolution already running
    ///
    /// `recheck` runs under the key's entry lock only when no resolution is
    /// running; returning a hit short-circuits registration.
    pub(crate) fn register<F>(&self, key: &EntityKey, recheck: F) -> Registration
    where
        F: FnOnce() -> Option<CachedResponse>,
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(running) => Registration::Follower(running.get().clone()),
            Entry::Vacant(vacant) => {
                if let Some(hit) = recheck() {
                    return Registration::Cached(hit);
                }
                let (sender, receiver) = watch::channel(None);
                vacant.insert(receiver);
                Registration::Leader(LeaderSlot {
                    sender,
                    _guard: InFlightGuard {
                        entries: Arc::clone(&self.entries),
                        key: key.clone(),
                    },
                })
            }
        }
    }

    /// Number of keys currently being resolved
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Wait for the outcome published on `receiver`
///
/// # Errors
///
/// Returns [`EngineError::ResolutionAborted`] if the leader went away without
/// publishing.
pub(crate) async fn wait_for_outcome(
    mut receiver: Shared,
    key: &EntityKey,
) -> EngineResult<ResolutionOutcome> {
    let published = receiver
        .wait_for(Option::is_some)
        .await
        .map_err(|_| EngineError::ResolutionAborted {
            key: key.to_string(),
        })?;

    published
        .as_ref()
        .cloned()
        .ok_or_else(|| EngineError::ResolutionAborted {
            key: key.to_string(),
        })
}
