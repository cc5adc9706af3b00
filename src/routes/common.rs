//! Probes: liveness, readiness against the metadata store, build info.

use super::API_PREFIX;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct ProbeBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata_store: Option<&'static str>,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
    api_prefix: &'static str,
}

async fn health() -> Json<ProbeBody> {
    Json(ProbeBody {
        status: "ok",
        metadata_store: None,
    })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ProbeBody>) {
    match state.codegen.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ProbeBody {
                status: "ok",
                metadata_store: Some("ok"),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeBody {
                    status: "degraded",
                    metadata_store: Some("unavailable"),
                }),
            )
        }
    }
}

async fn version() -> Json<VersionBody> {
    Json(VersionBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        api_prefix: API_PREFIX,
    })
}

/// GET /health, GET /ready, GET /version.
pub fn probe_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
