//! Router configuration.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{bags, rooms, stats};
use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use hackops_web::{correlation_id, health_check};
use tower_http::trace::TraceLayer;

/// Which optional route groups are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Baggage and room routes
    pub baggage: bool,
    /// `GET /api/stats/reimb`
    pub reimbursement_stats: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            baggage: true,
            reimbursement_stats: true,
        }
    }
}

/// Build the complete Axum router.
///
/// Every request gets a correlation id and an `http_request` span.
pub fn build_router(state: AppState, features: Features) -> Router {
    let mut api_routes = Router::new()
        .route("/stats/apps", get(stats::application_stats))
        .route("/stats/workshops", get(stats::workshop_stats))
        .route("/stats/baggage", get(stats::baggage_stats));

    if features.reimbursement_stats {
        api_routes = api_routes.route("/stats/reimb", get(stats::reimbursement_stats));
    }

    if features.baggage {
        api_routes = api_routes
            .route("/rooms", get(rooms::list_rooms))
            .route("/rooms/:room", put(rooms::upsert_room))
            .route("/bags", post(bags::check_in).get(bags::list_active))
            .route("/bags/history", get(bags::history))
            .route("/bags/map", get(bags::map))
            .route("/bags/:id", get(bags::get_bag))
            .route("/bags/:id/checkout", post(bags::check_out));
    }

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id))
        .with_state(state)
}
