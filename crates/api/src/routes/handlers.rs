// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Handlers translate paths into [`EntityKey`]s and engine outcomes into
//! status codes. A resolution that exhausts every provider is reported as
//! `502 Bad Gateway` with the attempt trail and a remediation summary; a
//! request refused by policy is `400 Bad Request`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use resolution_engine::{EngineDiagnostics, ResolutionOutcome, ResolveOptions};
use serde::{Deserialize, Serialize};
use shared_types::{EntityKey, EntityKind};
use tracing::{info, warn};

use crate::{
    error::{ServerError, ServerResult},
    metrics,
    state::{HealthCheck, ServerState},
};

/// Health check endpoint handler
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthCheck> {
    Json(state.health_check())
}

/// Optional refinements of a resolve or invalidate request
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    /// Narrow the entity, e.g. `posts`
    sub_resource: Option<String>,
    /// Skip the cache probe
    #[serde(default)]
    refresh: bool,
}

impl KeyQuery {
    fn key(&self, kind: EntityKind, identifier: String) -> EntityKey {
        let key = EntityKey::new(kind, identifier);
        match &self.sub_resource {
            Some(sub_resource) => key.with_sub_resource(sub_resource.clone()),
            None => key,
        }
    }
}

/// Body of a resolve response
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// Display form of the resolved key
    pub key: String,
    /// Whether the payload came from the cache
    pub cached: bool,
    /// What to do about a failed resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// The engine outcome
    #[serde(flatten)]
    pub outcome: ResolutionOutcome,
}

impl ResolveResponse {
    fn new(key: &EntityKey, outcome: ResolutionOutcome) -> (StatusCode, Self) {
        let (status, remediation) = match &outcome {
            ResolutionOutcome::Success { .. } => (StatusCode::OK, None),
            ResolutionOutcome::Exhausted { trail } => {
                (StatusCode::BAD_GATEWAY, Some(trail.remediation_summary()))
            }
            ResolutionOutcome::RejectedByPolicy { reason } => {
                (StatusCode::BAD_REQUEST, Some(reason.to_string()))
            }
        };
        let response = Self {
            key: key.to_string(),
            cached: outcome.is_cached(),
            remediation,
            outcome,
        };
        (status, response)
    }
}

/// Resolve one entity through the cache and the ranked providers
///
/// `GET /v1/resolve/{kind}/{identifier}?sub_resource=&refresh=`
///
/// # Errors
///
/// Returns `ServerError::InvalidKind` for an unknown kind, or an engine
/// fault if the resolution was lost.
pub async fn resolve_handler(
    State(state): State<ServerState>,
    Path((kind, identifier)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> ServerResult<impl IntoResponse> {
    let kind: EntityKind = kind.parse()?;
    let key = query.key(kind, identifier);
    let options = if query.refresh {
        ResolveOptions::refresh()
    } else {
        ResolveOptions::default()
    };

    let outcome = state.engine().resolve(&key, options).await?;
    metrics::inc_resolutions(kind, outcome.label());

    match &outcome {
        ResolutionOutcome::Success { provider, .. } => {
            info!(%key, %provider, "resolved");
        }
        ResolutionOutcome::Exhausted { trail } => {
            warn!(%key, attempts = trail.attempts().len(), "all providers exhausted");
        }
        ResolutionOutcome::RejectedByPolicy { reason } => {
            info!(%key, %reason, "rejected by policy");
        }
    }

    let (status, body) = ResolveResponse::new(&key, outcome);
    Ok((status, Json(body)))
}

/// Result of a cache invalidation
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidateResponse {
    /// What was invalidated
    pub scope: String,
    /// Entries removed
    pub removed: usize,
}

/// Drop the cached response for one key
///
/// `DELETE /v1/cache/{kind}/{identifier}?sub_resource=`
///
/// # Errors
///
/// Returns `ServerError::InvalidKind` for an unknown kind or
/// `ServerError::ValidationError` for a blank identifier.
pub async fn invalidate_handler(
    State(state): State<ServerState>,
    Path((kind, identifier)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> ServerResult<Json<InvalidateResponse>> {
    let kind: EntityKind = kind.parse()?;
    if identifier.trim().is_empty() {
        return Err(ServerError::ValidationError(
            "identifier cannot be empty".to_string(),
        ));
    }
    let key = query.key(kind, identifier);
    let removed = usize::from(state.engine().invalidate(&key));
    info!(%key, removed, "cache entry invalidated");

    Ok(Json(InvalidateResponse {
        scope: key.to_string(),
        removed,
    }))
}

/// Drop every cached response of one kind
///
/// `DELETE /v1/cache/{kind}`
///
/// # Errors
///
/// Returns `ServerError::InvalidKind` for an unknown kind.
pub async fn invalidate_kind_handler(
    State(state): State<ServerState>,
    Path(kind): Path<String>,
) -> ServerResult<Json<InvalidateResponse>> {
    let kind: EntityKind = kind.parse()?;
    let removed = state.engine().invalidate_kind(kind);
    info!(%kind, removed, "cache entries invalidated");

    Ok(Json(InvalidateResponse {
        scope: kind.to_string(),
        removed,
    }))
}

/// Drop every cached response
///
/// `DELETE /v1/cache`
pub async fn clear_cache_handler(State(state): State<ServerState>) -> Json<InvalidateResponse> {
    let removed = state.engine().diagnostics().cache.entry_count;
    state.engine().clear_cache();
    info!(removed, "cache cleared");

    Json(InvalidateResponse {
        scope: "all".to_string(),
        removed,
    })
}

/// Result of a provider health reset
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetResponse {
    /// Provider name, or `all`
    pub scope: String,
    /// Providers that were failing or cooling down
    pub reset: usize,
}

/// Put one provider back into service
///
/// `POST /v1/providers/{name}/reset`
///
/// # Errors
///
/// Returns a `404` engine error if no provider has this name.
pub async fn reset_provider_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> ServerResult<Json<ResetResponse>> {
    let was_failing = state.engine().reset_provider(&name)?;
    info!(provider = %name, was_failing, "provider reset requested");

    Ok(Json(ResetResponse {
        scope: name,
        reset: usize::from(was_failing),
    }))
}

/// Put every provider back into service
///
/// `POST /v1/providers/reset`
pub async fn reset_all_providers_handler(State(state): State<ServerState>) -> Json<ResetResponse> {
    let reset = state.engine().reset_all_providers();
    info!(reset, "reset of all providers requested");

    Json(ResetResponse {
        scope: "all".to_string(),
        reset,
    })
}

/// Read-only engine snapshot
///
/// `GET /v1/diagnostics`
pub async fn diagnostics_handler(State(state): State<ServerState>) -> Json<EngineDiagnostics> {
    Json(state.engine().diagnostics())
}

#[cfg(test)]
mod tests {
    use resolution_engine::{AttemptTrail, PolicyRejection};
    use serde_json::json;

    use super::*;

    fn profile() -> EntityKey {
        EntityKey::new(EntityKind::Profile, "jane-doe")
    }

    #[test]
    fn query_builds_sub_resource_keys() {
        let query = KeyQuery {
            sub_resource: Some("posts".to_string()),
            refresh: false,
        };
        let key = query.key(EntityKind::Company, "acme".to_string());
        assert_eq!(key.sub_resource(), Some("posts"));
        assert_eq!(KeyQuery::default().key(EntityKind::Post, "1".to_string()).sub_resource(), None);
    }

    #[test]
    fn success_is_ok_without_remediation() {
        let outcome = ResolutionOutcome::Success {
            payload: json!({"name": "Jane"}),
            provider: "pnd".to_string(),
            trail: AttemptTrail::default(),
        };
        let (status, body) = ResolveResponse::new(&profile(), outcome);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["outcome"], "success");
        assert_eq!(value["provider"], "pnd");
        assert_eq!(value["payload"]["name"], "Jane");
        assert_eq!(value["cached"], false);
        assert!(value.get("remediation").is_none());
    }

    #[test]
    fn exhausted_is_bad_gateway_with_remediation() {
        let outcome = ResolutionOutcome::Exhausted {
            trail: AttemptTrail::default(),
        };
        let (status, body) = ResolveResponse::new(&profile(), outcome);

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.remediation.unwrap().contains("no provider"));
    }

    #[test]
    fn rejection_is_bad_request() {
        let outcome = ResolutionOutcome::RejectedByPolicy {
            reason: PolicyRejection::NoCapableProvider {
                kind: EntityKind::Post,
            },
        };
        let (status, body) = ResolveResponse::new(&profile(), outcome);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["outcome"], "rejected_by_policy");
        assert_eq!(value["reason"]["reason"], "no_capable_provider");
        assert_eq!(
            value["remediation"],
            "no provider can resolve post entities"
        );
    }
}
