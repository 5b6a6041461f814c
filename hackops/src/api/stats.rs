//! Organizer statistics endpoints.
//!
//! - GET /api/stats/apps
//! - GET /api/stats/reimb (only mounted when reimbursements are enabled)
//! - GET /api/stats/workshops
//! - GET /api/stats/baggage
//!
//! Responses are cached per endpoint for `STATS_CACHE_TTL` seconds.

use crate::metrics;
use crate::server::state::AppState;
use crate::stats::StatsError;
use axum::{extract::State, Json};
use hackops_web::{AppError, WebResult};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

async fn cached<T, F, Fut>(state: &AppState, endpoint: &'static str, compute: F) -> WebResult<Json<Value>>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StatsError>>,
{
    let value = state
        .stats_cache
        .get_or_try_insert(endpoint, || async move {
            metrics::record_stats_computed(endpoint);
            let stats = compute().await?;
            serde_json::to_value(stats).map_err(|e| {
                AppError::internal("Failed to encode statistics").with_source(e.into())
            })
        })
        .await?;
    Ok(Json(value))
}

/// Application statistics.
///
/// # Errors
///
/// 500 when the records cannot be loaded.
pub async fn application_stats(State(state): State<AppState>) -> WebResult<Json<Value>> {
    cached(&state, "apps", || state.stats.application_stats()).await
}

/// Reimbursement statistics.
///
/// # Errors
///
/// 500 when the records cannot be loaded.
pub async fn reimbursement_stats(State(state): State<AppState>) -> WebResult<Json<Value>> {
    cached(&state, "reimb", || state.stats.reimbursement_stats()).await
}

/// Workshop attendance.
///
/// # Errors
///
/// 500 when the records cannot be loaded.
pub async fn workshop_stats(State(state): State<AppState>) -> WebResult<Json<Value>> {
    cached(&state, "workshops", || state.stats.workshop_stats()).await
}

/// Baggage statistics.
///
/// # Errors
///
/// 500 when the bags cannot be loaded.
pub async fn baggage_stats(State(state): State<AppState>) -> WebResult<Json<Value>> {
    cached(&state, "baggage", || state.stats.baggage_stats()).await
}
