// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Hooks for exporting per-attempt telemetry

use std::time::Duration;

use provider_client::FailureKind;

use crate::outcome::SkipReason;

/// Receives one callback per provider attempt or skip
///
/// Callbacks run inline on the resolving task and must not block.
pub trait ResolutionObserver: Send + Sync {
    /// A provider was contacted; `failure` is `None` on success
    fn attempt_finished(&self, provider: &str, failure: Option<FailureKind>, elapsed: Duration) {
        let _ = (provider, failure, elapsed);
    }

    /// A provider was passed over without being contacted
    fn provider_skipped(&self, provider: &str, reason: &SkipReason) {
        let _ = (provider, reason);
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}
