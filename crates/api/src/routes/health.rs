use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Storage reachability: `connected` or `unreachable`.
    pub database: &'static str,
}

/// GET /health -- returns service and storage health.
///
/// Responds 503 when the storage backend cannot be reached so load
/// balancers take the instance out of rotation.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status_code, status, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach storage");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
