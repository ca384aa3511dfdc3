// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Minimum gaps between calls to one provider
//!
//! Some backends flag traffic that arrives at machine speed. For those the
//! engine hands out call slots at least `min_interval` apart, each pushed back
//! by a random delay below `max_jitter`. Reserving a slot never blocks: the
//! caller gets back how long to wait and sleeps outside any attempt deadline.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_retry::strategy::jitter;

/// Spacing parameters for one provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpacingPolicy {
    /// Minimum gap between the starts of two calls
    pub min_interval: Duration,
    /// Upper bound of the random delay added to each slot
    pub max_jitter: Duration,
}

impl SpacingPolicy {
    /// Create a spacing policy
    pub const fn new(min_interval: Duration, max_jitter: Duration) -> Self {
        Self {
            min_interval,
            max_jitter,
        }
    }

    /// Whether calls may go out back to back
    pub fn is_unspaced(&self) -> bool {
        self.min_interval.is_zero() && self.max_jitter.is_zero()
    }
}

/// Next free call slot per provider
#[derive(Debug, Default)]
pub struct CallSpacer {
    next_slot: DashMap<String, Instant>,
}

impl CallSpacer {
    /// Reserve the next call slot for `provider` and return the wait until it
    ///
    /// Concurrent callers get distinct slots in reservation order.
    pub fn reserve(&self, provider: &str, policy: SpacingPolicy) -> Duration {
        if policy.is_unspaced() {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let delay = if policy.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            jitter(policy.max_jitter)
        };

        let mut next = self.next_slot.entry(provider.to_string()).or_insert(now);
        let slot = (*next).max(now) + delay;
        *next = slot + policy.min_interval;
        slot - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_reservations_get_successive_slots() {
        let spacer = CallSpacer::default();
        let policy = SpacingPolicy::new(Duration::from_secs(1), Duration::ZERO);

        let waits: Vec<Duration> = (0..4).map(|_| spacer.reserve("enhanced", policy)).collect();
        assert_eq!(waits, [0, 1, 2, 3].map(Duration::from_secs).to_vec());

        // providers are spaced independently
        assert_eq!(spacer.reserve("voyager", policy), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_gaps_are_not_carried_forward() {
        let spacer = CallSpacer::default();
        let policy = SpacingPolicy::new(Duration::from_secs(2), Duration::ZERO);

        assert_eq!(spacer.reserve("enhanced", policy), Duration::ZERO);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(spacer.reserve("enhanced", policy), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(spacer.reserve("enhanced", policy), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_stays_below_its_bound() {
        let policy = SpacingPolicy::new(Duration::ZERO, Duration::from_millis(500));
        for _ in 0..20 {
            let spacer = CallSpacer::default();
            assert!(spacer.reserve("enhanced", policy) <= Duration::from_millis(500));
        }
    }

    #[test]
    fn unspaced_providers_never_wait() {
        let spacer = CallSpacer::default();
        for _ in 0..3 {
            assert_eq!(spacer.reserve("pnd", SpacingPolicy::default()), Duration::ZERO);
        }
    }
}
