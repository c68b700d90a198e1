//! Liveness, readiness and build information.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
}

#[derive(Serialize)]
struct Readiness {
    status: &'static str,
    backend: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tables: Option<usize>,
}

impl BuildInfo {
    fn crate_only() -> Self {
        BuildInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            descriptor: None,
            tables: None,
        }
    }
}

async fn health() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let backend = state.db.backend().as_str();
    if let Err(e) = state.db.ping().await {
        tracing::warn!(error = %e, backend, "readiness check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Readiness {
                status: "degraded",
                backend,
                database: "unavailable",
            }),
        );
    }
    (
        StatusCode::OK,
        Json(Readiness {
            status: "ok",
            backend,
            database: "ok",
        }),
    )
}

async fn version() -> Json<BuildInfo> {
    Json(BuildInfo::crate_only())
}

async fn version_with_descriptor(State(state): State<AppState>) -> Json<BuildInfo> {
    Json(BuildInfo {
        descriptor: Some(state.descriptor.key.clone()),
        tables: Some(state.schemas.len()),
        ..BuildInfo::crate_only()
    })
}

/// GET /health and GET /version; needs no state.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Adds GET /ready (one database round trip) and descriptor details on /version.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version_with_descriptor))
        .with_state(state)
}
