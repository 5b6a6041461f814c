//! Application state shared by the HTTP handlers.

use crate::app::BaggageService;
use crate::stats::{StatsReporter, TtlCache};
use serde_json::Value;
use std::sync::Arc;

/// Shared state, cloned (cheaply, via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Baggage commands and queries
    pub baggage: Arc<BaggageService>,
    /// Statistics computation
    pub stats: Arc<StatsReporter>,
    /// Rendered statistics responses by endpoint
    pub stats_cache: Arc<TtlCache<Value>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        baggage: Arc<BaggageService>,
        stats: Arc<StatsReporter>,
        stats_cache: Arc<TtlCache<Value>>,
    ) -> Self {
        Self {
            baggage,
            stats,
            stats_cache,
        }
    }
}
