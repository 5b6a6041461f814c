//! Readiness endpoint.
//!
//! Liveness (`GET /health`) comes from `hackops-web`; readiness probes the
//! record store and answers 503 while it is unreachable.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use hackops_web::{ComponentHealth, HealthReport};

/// `GET /ready`
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.baggage.ping().await {
        Ok(()) => ComponentHealth::healthy("database"),
        Err(error) => {
            tracing::warn!(%error, "Readiness probe failed");
            ComponentHealth::unhealthy("database", error.to_string())
        },
    };

    HealthReport::new(vec![database]).into_response_parts()
}
