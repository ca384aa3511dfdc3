// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Resolution outcomes and the attempt trail
//!
//! An outcome is produced once per resolution and shared, unchanged, with
//! every caller that joined it. The trail records each provider that was
//! contacted or skipped, in order, so that callers can explain an exhausted
//! chain instead of reporting a bare failure.

use std::{collections::BTreeMap, fmt::Write as _};

use provider_client::{FailureKind, Payload};
use serde::Serialize;
use shared_types::{CredentialKind, EntityKind};
use thiserror::Error;

/// Provider name reported for answers served from the cache
pub const CACHE_PROVIDER: &str = "cache";

/// Final result of one resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// A provider (or the cache) produced a payload
    Success {
        /// The resolved data
        payload: Payload,
        /// Producing provider, or [`CACHE_PROVIDER`]
        provider: String,
        /// Providers skipped or failed before the successful one
        trail: AttemptTrail,
    },
    /// Every candidate was tried or skipped without success
    Exhausted {
        /// Why each candidate did not produce a payload
        trail: AttemptTrail,
    },
    /// The request was refused before any provider was contacted
    RejectedByPolicy {
        /// Why the request was refused
        reason: PolicyRejection,
    },
}

impl ResolutionOutcome {
    /// Whether a payload was produced
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The payload, on success
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The producing provider, on success
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Success { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Whether the payload came from the cache
    pub fn is_cached(&self) -> bool {
        self.provider() == Some(CACHE_PROVIDER)
    }

    /// The attempt trail; rejections have none
    pub fn trail(&self) -> Option<&AttemptTrail> {
        match self {
            Self::Success { trail, .. } | Self::Exhausted { trail } => Some(trail),
            Self::RejectedByPolicy { .. } => None,
        }
    }

    /// Short label for logs and metrics
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Exhausted { .. } => "exhausted",
            Self::RejectedByPolicy { .. } => "rejected",
        }
    }
}

/// Reason a request was refused without contacting any provider
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PolicyRejection {
    /// The key is malformed
    #[error("invalid key: {detail}")]
    InvalidKey {
        /// What is wrong with the key
        detail: String,
    },
    /// No registered provider can resolve this kind
    #[error("no provider can resolve {kind} entities")]
    NoCapableProvider {
        /// The requested kind
        kind: EntityKind,
    },
    /// Every capable provider lacks a required credential
    #[error("all capable providers lack credentials: missing {}", join_kinds(.missing))]
    MissingCredentials {
        /// Credential kinds that would unlock at least one provider
        missing: Vec<CredentialKind>,
    },
}

fn join_kinds(kinds: &[CredentialKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a candidate provider was not contacted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The provider is cooling down after repeated failures
    CoolingDown {
        /// Time left in the cooldown
        remaining_ms: u64,
    },
    /// The provider's call budget for the current window is spent
    BudgetExhausted {
        /// Time until the budget resets
        resets_in_ms: u64,
    },
    /// A required credential is not configured
    MissingCredentials {
        /// The absent kinds
        missing: Vec<CredentialKind>,
    },
}

impl SkipReason {
    /// Short label for logs and metrics
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CoolingDown { .. } => "cooling_down",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::MissingCredentials { .. } => "missing_credentials",
        }
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TrailStep {
    /// The provider was contacted and failed
    Failed {
        /// Classified failure
        kind: FailureKind,
        /// Wall time spent on the attempt, retries included
        elapsed_ms: u64,
        /// Whether a local retry was made
        retried: bool,
    },
    /// The provider was not contacted
    Skipped {
        /// Why it was passed over
        #[serde(flatten)]
        reason: SkipReason,
    },
}

/// One candidate in the trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailEntry {
    /// Provider name
    pub provider: String,
    /// What happened
    #[serde(flatten)]
    pub step: TrailStep,
}

/// Ordered record of every candidate contacted or skipped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttemptTrail {
    entries: Vec<TrailEntry>,
}

impl AttemptTrail {
    pub(crate) fn record_failure(
        &mut self,
        provider: &str,
        kind: FailureKind,
        elapsed_ms: u64,
        retried: bool,
    ) {
        self.entries.push(TrailEntry {
            provider: provider.to_string(),
            step: TrailStep::Failed {
                kind,
                elapsed_ms,
                retried,
            },
        });
    }

    pub(crate) fn record_skip(&mut self, provider: &str, reason: SkipReason) {
        self.entries.push(TrailEntry {
            provider: provider.to_string(),
            step: TrailStep::Skipped { reason },
        });
    }

    /// Every entry in order
    pub fn entries(&self) -> &[TrailEntry] {
        &self.entries
    }

    /// Contacted providers with their failure, in order
    ///
    /// Skipped candidates are not attempts and are excluded.
    pub fn attempts(&self) -> Vec<(&str, FailureKind)> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.step {
                TrailStep::Failed { kind, .. } => Some((entry.provider.as_str(), kind)),
                TrailStep::Skipped { .. } => None,
            })
            .collect()
    }

    /// Skipped candidates with their reason, in order
    pub fn skips(&self) -> Vec<(&str, &SkipReason)> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.step {
                TrailStep::Skipped { reason } => Some((entry.provider.as_str(), reason)),
                TrailStep::Failed { .. } => None,
            })
            .collect()
    }

    /// Whether nothing was contacted or skipped
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable remediation naming the last-seen problem per provider
    pub fn remediation_summary(&self) -> String {
        let mut last_seen: BTreeMap<&str, (usize, String)> = BTreeMap::new();
        for (position, entry) in self.entries.iter().enumerate() {
            let hint = match &entry.step {
                TrailStep::Failed { kind, .. } => kind.remediation().to_string(),
                TrailStep::Skipped { reason } => skip_remediation(reason),
            };
            last_seen.insert(entry.provider.as_str(), (position, hint));
        }

        let mut ordered: Vec<_> = last_seen.into_iter().collect();
        ordered.sort_by_key(|(_, (position, _))| *position);

        let mut summary = String::new();
        for (provider, (_, hint)) in ordered {
            if !summary.is_empty() {
                summary.push_str("; ");
            }
            let _ = write!(summary, "{provider}: {hint}");
        }
        if summary.is_empty() {
            summary.push_str("no provider was available for this request");
        }
        summary
    }
}

fn skip_remediation(reason: &SkipReason) -> String {
    match reason {
        SkipReason::CoolingDown { remaining_ms } => format!(
            "temporarily disabled after repeated failures, retrying in {}s",
            remaining_ms.div_ceil(1000)
        ),
        SkipReason::BudgetExhausted { resets_in_ms } => format!(
            "call budget spent for this window, resets in {}s",
            resets_in_ms.div_ceil(1000)
        ),
        SkipReason::MissingCredentials { missing } => {
            format!("configure {} credentials to enable", join_kinds(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_trail() -> AttemptTrail {
        let mut trail = AttemptTrail::default();
        trail.record_skip(
            "pnd",
            SkipReason::MissingCredentials {
                missing: vec![CredentialKind::ApiKey],
            },
        );
        trail.record_failure("enhanced", FailureKind::BotDetected, 120, false);
        trail.record_skip("headless", SkipReason::CoolingDown { remaining_ms: 1500 });
        trail.record_failure("voyager", FailureKind::Timeout, 20_000, true);
        trail
    }

    #[test]
    fn attempts_exclude_skips() {
        let trail = sample_trail();
        assert_eq!(
            trail.attempts(),
            vec![
                ("enhanced", FailureKind::BotDetected),
                ("voyager", FailureKind::Timeout)
            ]
        );
        assert_eq!(trail.skips().len(), 2);
        assert_eq!(trail.entries().len(), 4);
    }

    #[test]
    fn remediation_names_each_provider_once() {
        let summary = sample_trail().remediation_summary();
        assert!(summary.starts_with("pnd: configure api_key credentials"));
        assert!(summary.contains("enhanced: blocked by anti-bot detection"));
        assert!(summary.contains("headless: temporarily disabled"));
        assert!(summary.contains("retrying in 2s"));
        assert!(summary.contains("voyager: provider did not answer in time"));

        let mut trail = AttemptTrail::default();
        trail.record_failure("p1", FailureKind::Timeout, 1, false);
        trail.record_failure("p1", FailureKind::AuthExpired, 1, false);
        let summary = trail.remediation_summary();
        assert!(summary.contains("refresh"));
        assert!(!summary.contains("did not answer"));

        assert!(
            AttemptTrail::default()
                .remediation_summary()
                .contains("no provider")
        );
    }

    #[test]
    fn serialized_shape() {
        let outcome = ResolutionOutcome::Exhausted {
            trail: sample_trail(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "exhausted");
        assert_eq!(value["trail"][0]["provider"], "pnd");
        assert_eq!(value["trail"][0]["step"], "skipped");
        assert_eq!(value["trail"][0]["reason"], "missing_credentials");
        assert_eq!(value["trail"][1]["step"], "failed");
        assert_eq!(value["trail"][1]["kind"], "bot_detected");

        let rejected = ResolutionOutcome::RejectedByPolicy {
            reason: PolicyRejection::NoCapableProvider {
                kind: EntityKind::Post,
            },
        };
        let value = serde_json::to_value(&rejected).unwrap();
        assert_eq!(value["outcome"], "rejected_by_policy");
        assert_eq!(value["reason"]["reason"], "no_capable_provider");
        assert_eq!(value["reason"]["kind"], "post");
    }

    #[test]
    fn accessors() {
        let success = ResolutionOutcome::Success {
            payload: json!({"id": 1}),
            provider: CACHE_PROVIDER.to_string(),
            trail: AttemptTrail::default(),
        };
        assert!(success.is_success());
        assert!(success.is_cached());
        assert_eq!(success.label(), "success");
        assert_eq!(success.payload(), Some(&json!({"id": 1})));

        let rejected = ResolutionOutcome::RejectedByPolicy {
            reason: PolicyRejection::MissingCredentials {
                missing: vec![CredentialKind::OAuth, CredentialKind::Cookies],
            },
        };
        assert!(rejected.trail().is_none());
        assert!(rejected.payload().is_none());
        if let ResolutionOutcome::RejectedByPolicy { reason } = rejected {
            assert_eq!(
                reason.to_string(),
                "all capable providers lack credentials: missing oauth, cookies"
            );
        }
    }
}
