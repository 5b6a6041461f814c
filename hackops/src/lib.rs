//! HackOps - hackathon operations backend.
//!
//! Two features share this crate:
//!
//! - **Baggage**: volunteers check hackers' bags into storage rooms and hand
//!   them back. Each room is a grid; bags are placed on the free cell closest
//!   to the door of the first room (in preference order) with space left.
//!   Oversized items go to a separate `@` namespace. Owners are notified on
//!   both transitions.
//! - **Statistics**: organizer dashboards computed from application,
//!   reimbursement, workshop and baggage records by a declarative grouping
//!   engine.
//!
//! # Architecture
//!
//! ```text
//!           HTTP (axum)
//!               │
//!     ┌─────────┴─────────┐
//!     ▼                   ▼
//! BaggageService     StatsReporter ◄── TtlCache
//!     │                   │
//!  BaggageReducer    Aggregation tables
//!  + allocator            │
//!     │                   │
//!     ▼                   ▼
//! BaggageStore        StatsSource       (in-memory or PostgreSQL)
//!     │
//!     └──► EffectRunner ──► Notifier    (fire-and-forget)
//! ```
//!
//! # Concurrency
//!
//! The allocator is a pure function over an occupancy snapshot. Two
//! concurrent check-ins can pick the same cell; the record store's
//! uniqueness rule on active positions lets exactly one of them commit and
//! the other fails with `PositionTaken`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod allocator;
pub mod api;
pub mod app;
pub mod config;
pub mod metrics;
pub mod notifications;
pub mod runtime;
pub mod server;
pub mod stats;
pub mod stores;
pub mod types;

pub use aggregates::{BaggageAction, BaggageError, BaggageReducer, BaggageState};
pub use app::BaggageService;
pub use config::Config;
pub use types::*;
