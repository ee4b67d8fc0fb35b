use axum::extract::State;
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
    /// `"postgres"` or `"memory"`.
    pub storage: &'static str,
    /// Whether the database is reachable. Always true on the in-memory store.
    pub db_healthy: bool,
    /// Whether the notification bus still accepts subscribers.
    pub bus_open: bool,
}

/// GET /health -- returns service, storage and bus health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (storage, db_healthy) = match &state.pool {
        Some(pool) => ("postgres", tutor_db::health_check(pool).await.is_ok()),
        None => ("memory", true),
    };
    let bus_open = !state.bus.is_closed();

    let status = if db_healthy && bus_open { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage,
        db_healthy,
        bus_open,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
