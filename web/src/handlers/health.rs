//! Health check endpoints.
//!
//! `GET /health` is liveness only and never touches a dependency. Readiness is
//! assembled by the application from [`ComponentHealth`] entries (database,
//! notifier, ...) and rendered with [`HealthReport::into_response_parts`].

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Simple health check endpoint (for basic liveness).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Health of one dependency.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComponentHealth {
    /// Component name (e.g. `database`)
    pub component: String,
    /// Whether the component answered
    pub healthy: bool,
    /// Failure detail when unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    /// A component that answered.
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: true,
            message: None,
        }
    }

    /// A component that failed its probe.
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: false,
            message: Some(message.into()),
        }
    }
}

/// Readiness report over all probed components.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    /// `ok` when every component is healthy, `degraded` otherwise
    pub status: &'static str,
    /// Individual probe results
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    /// Build a report from probe results.
    #[must_use]
    pub fn new(components: Vec<ComponentHealth>) -> Self {
        let status = if components.iter().all(|c| c.healthy) {
            "ok"
        } else {
            "degraded"
        };
        Self { status, components }
    }

    /// Status code and body for a readiness endpoint (503 when degraded).
    #[must_use]
    pub fn into_response_parts(self) -> (StatusCode, Json<Self>) {
        let code = if self.status == "ok" {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (code, Json(self))
    }
}
