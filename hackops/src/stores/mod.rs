//! Record stores.
//!
//! [`BaggageStore`] holds rooms and bags; [`StatsSource`] serves the
//! application, reimbursement and workshop records the statistics read. Both
//! have an in-memory implementation (tests, `HACKOPS_STORAGE=memory`) and a
//! `PostgreSQL` one.
//!
//! The store is the last line against double placement: inserting a second
//! active bag on a position must fail with [`StoreError::PositionConflict`].
//!
//! Traits return boxed futures so they can be used as `Arc<dyn ...>`.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryBaggageStore, InMemoryStatsSource};
pub use postgres::{PostgresBaggageStore, PostgresStatsSource};

use crate::stats::records::{
    ApplicationRecord, AttendanceRecord, ReimbursementRecord, WorkshopRecord,
};
use crate::types::{Bag, BagId, NewBag, Position, Room, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Record store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another active bag already holds the position
    #[error("Position is held by another active bag")]
    PositionConflict,

    /// The bag does not exist
    #[error("Bag {0} not found")]
    BagNotFound(BagId),

    /// The bag is not active any more
    #[error("Bag {0} is not active")]
    NotActive(BagId),

    /// The stored data could not be mapped to domain types
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database failure
    #[error("Database error: {0}")]
    Database(String),
}

/// Future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Rooms and bags.
pub trait BaggageStore: Send + Sync {
    /// All rooms, in no particular order.
    fn list_rooms(&self) -> StoreFuture<'_, Vec<Room>>;

    /// Create or replace a room.
    fn upsert_room(&self, room: Room) -> StoreFuture<'_, Room>;

    /// Positions of every active bag.
    fn active_positions(&self) -> StoreFuture<'_, Vec<Position>>;

    /// Store a new active bag and assign its id.
    ///
    /// Fails with [`StoreError::PositionConflict`] when an active bag already
    /// holds the position.
    fn insert_bag(&self, bag: NewBag) -> StoreFuture<'_, Bag>;

    /// A bag by id.
    fn get_bag(&self, id: BagId) -> StoreFuture<'_, Option<Bag>>;

    /// Flip an active bag to removed.
    ///
    /// Fails with [`StoreError::NotActive`] if it was already removed and
    /// [`StoreError::BagNotFound`] if it does not exist.
    fn mark_removed(
        &self,
        id: BagId,
        custodian_out: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Bag>;

    /// Active bags, optionally of one owner, oldest first.
    fn active_bags(&self, owner: Option<UserId>) -> StoreFuture<'_, Vec<Bag>>;

    /// Every bag ever stored, newest first.
    fn all_bags(&self) -> StoreFuture<'_, Vec<Bag>>;

    /// Cheap connectivity probe.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Read-only source of the records behind the organizer statistics.
pub trait StatsSource: Send + Sync {
    /// Submitted applications.
    fn applications(&self) -> StoreFuture<'_, Vec<ApplicationRecord>>;

    /// Applications saved as drafts and never submitted.
    fn draft_application_count(&self) -> StoreFuture<'_, u64>;

    /// Reimbursements, drafts included.
    fn reimbursements(&self) -> StoreFuture<'_, Vec<ReimbursementRecord>>;

    /// Scheduled workshops.
    fn workshops(&self) -> StoreFuture<'_, Vec<WorkshopRecord>>;

    /// Workshop attendance scans.
    fn workshop_attendance(&self) -> StoreFuture<'_, Vec<AttendanceRecord>>;
}
