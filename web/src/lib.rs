//! Axum integration for HackOps.
//!
//! The HTTP shell around the baggage and statistics services:
//!
//! ```text
//! request ─► correlation_id ─► extractors ─► handler ─► service (hackops)
//!                                               │
//! response ◄──────── AppError / Json ◄──────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **Middleware** assigns a correlation id and opens an `http_request` span
//! 2. **Extractors** pull the acting staff identity and the payload
//! 3. **Service call** runs the command or query
//! 4. **Errors** convert into [`AppError`], which renders `{"code", "message"}`

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ActingUser, CorrelationId, ACTING_USER_HEADER};
pub use handlers::{health_check, ComponentHealth, HealthReport};
pub use middleware::{correlation_id, CORRELATION_ID_HEADER};

/// What every handler returns.
pub type WebResult<T> = Result<T, AppError>;
