//! HTTP server: shared state, readiness and routing.

pub mod health;
pub mod routes;
pub mod state;

pub use health::readiness_check;
pub use routes::{build_router, Features};
pub use state::AppState;
