//! Aggregation reporter for the organizer dashboards.
//!
//! Read-only: nothing here writes to a store. Responses may be served from
//! the [`TtlCache`], but every computation starts from current records.

pub mod aggregation;
pub mod cache;
pub mod records;
pub mod reporter;

pub use aggregation::{aggregate, collect_free_text, Aggregation, FreeText, GroupRow, Groupable, Measure};
pub use cache::TtlCache;
pub use reporter::{
    ApplicationStats, BaggageStats, ReimbursementStats, StatsError, StatsReporter, WorkshopStats,
};
