//! HTTP API handlers, organized by resource:
//! - Bags: check-in, check-out and the volunteer/owner views
//! - Rooms: the storage room registry
//! - Stats: organizer dashboards

pub mod bags;
pub mod rooms;
pub mod stats;

use crate::aggregates::BaggageError;
use crate::stats::StatsError;
use hackops_web::AppError;

impl From<BaggageError> for AppError {
    fn from(error: BaggageError) -> Self {
        match error {
            BaggageError::InvalidInput(message) => Self::validation(message),
            BaggageError::NotFound { resource, id } => Self::not_found(resource, id),
            error @ BaggageError::PositionTaken { .. } => {
                Self::conflict("POSITION_TAKEN", error.to_string())
            },
            error @ BaggageError::AlreadyRemoved { .. } => {
                Self::conflict("ALREADY_REMOVED", error.to_string())
            },
            error @ BaggageError::NoSpaceAvailable => {
                Self::unavailable("NO_SPACE_AVAILABLE", error.to_string())
            },
            error @ BaggageError::Storage(_) => {
                Self::internal("Baggage storage is unavailable").with_source(error.into())
            },
        }
    }
}

impl From<StatsError> for AppError {
    fn from(error: StatsError) -> Self {
        Self::internal("Statistics are unavailable").with_source(error.into())
    }
}
