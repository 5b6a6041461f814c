//! In-memory record stores.
//!
//! Behave like the `PostgreSQL` stores, including the active-position
//! uniqueness rule, so tests exercise the same conflict paths.

use super::{BaggageStore, StatsSource, StoreError, StoreFuture};
use crate::stats::records::{
    ApplicationRecord, AttendanceRecord, ReimbursementRecord, WorkshopRecord,
};
use crate::types::{Bag, BagId, BagStatus, NewBag, Position, Room, RoomId, UserId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct BaggageTables {
    rooms: BTreeMap<RoomId, Room>,
    bags: BTreeMap<BagId, Bag>,
    next_id: i64,
}

/// Rooms and bags kept in process memory.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBaggageStore {
    tables: Arc<RwLock<BaggageTables>>,
}

impl InMemoryBaggageStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with rooms.
    #[must_use]
    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let tables = BaggageTables {
            rooms: rooms.into_iter().map(|r| (r.id.clone(), r)).collect(),
            ..BaggageTables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }
}

impl BaggageStore for InMemoryBaggageStore {
    fn list_rooms(&self) -> StoreFuture<'_, Vec<Room>> {
        Box::pin(async move { Ok(self.tables.read().await.rooms.values().cloned().collect()) })
    }

    fn upsert_room(&self, room: Room) -> StoreFuture<'_, Room> {
        Box::pin(async move {
            self.tables
                .write()
                .await
                .rooms
                .insert(room.id.clone(), room.clone());
            Ok(room)
        })
    }

    fn active_positions(&self) -> StoreFuture<'_, Vec<Position>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .bags
                .values()
                .filter(|b| b.is_active())
                .map(|b| b.position.clone())
                .collect())
        })
    }

    fn insert_bag(&self, bag: NewBag) -> StoreFuture<'_, Bag> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;

            if let Some(room) = bag.position.room() {
                if !tables.rooms.contains_key(room) {
                    return Err(StoreError::Database(format!("Room {room} does not exist")));
                }
            }
            if tables
                .bags
                .values()
                .any(|b| b.is_active() && b.position == bag.position)
            {
                return Err(StoreError::PositionConflict);
            }

            tables.next_id += 1;
            let stored = bag.into_bag(BagId::new(tables.next_id));
            tables.bags.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    fn get_bag(&self, id: BagId) -> StoreFuture<'_, Option<Bag>> {
        Box::pin(async move { Ok(self.tables.read().await.bags.get(&id).cloned()) })
    }

    fn mark_removed(
        &self,
        id: BagId,
        custodian_out: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Bag> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let bag = tables.bags.get_mut(&id).ok_or(StoreError::BagNotFound(id))?;
            if bag.status != BagStatus::Active {
                return Err(StoreError::NotActive(id));
            }
            bag.status = BagStatus::Removed;
            bag.custodian_out = Some(custodian_out);
            bag.updated_at = at;
            Ok(bag.clone())
        })
    }

    fn active_bags(&self, owner: Option<UserId>) -> StoreFuture<'_, Vec<Bag>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .bags
                .values()
                .filter(|b| b.is_active() && owner.is_none_or(|o| b.owner == o))
                .cloned()
                .collect())
        })
    }

    fn all_bags(&self) -> StoreFuture<'_, Vec<Bag>> {
        Box::pin(async move {
            let mut bags: Vec<Bag> = self.tables.read().await.bags.values().cloned().collect();
            bags.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.updated_at.cmp(&a.updated_at))
                    .then_with(|| b.id.cmp(&a.id))
            });
            Ok(bags)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Default)]
struct StatsTables {
    applications: Vec<ApplicationRecord>,
    drafts: u64,
    reimbursements: Vec<ReimbursementRecord>,
    workshops: Vec<WorkshopRecord>,
    attendance: Vec<AttendanceRecord>,
}

/// Statistics records kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatsSource {
    tables: Arc<RwLock<StatsTables>>,
}

impl InMemoryStatsSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a submitted application.
    pub async fn add_application(&self, record: ApplicationRecord) {
        self.tables.write().await.applications.push(record);
    }

    /// Set the number of unsubmitted drafts.
    pub async fn set_draft_count(&self, drafts: u64) {
        self.tables.write().await.drafts = drafts;
    }

    /// Add a reimbursement.
    pub async fn add_reimbursement(&self, record: ReimbursementRecord) {
        self.tables.write().await.reimbursements.push(record);
    }

    /// Add a workshop.
    pub async fn add_workshop(&self, record: WorkshopRecord) {
        self.tables.write().await.workshops.push(record);
    }

    /// Record one attendee of a workshop.
    pub async fn add_attendance(&self, workshop_id: i64) {
        self.tables
            .write()
            .await
            .attendance
            .push(AttendanceRecord { workshop_id });
    }
}

impl StatsSource for InMemoryStatsSource {
    fn applications(&self) -> StoreFuture<'_, Vec<ApplicationRecord>> {
        Box::pin(async move { Ok(self.tables.read().await.applications.clone()) })
    }

    fn draft_application_count(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move { Ok(self.tables.read().await.drafts) })
    }

    fn reimbursements(&self) -> StoreFuture<'_, Vec<ReimbursementRecord>> {
        Box::pin(async move { Ok(self.tables.read().await.reimbursements.clone()) })
    }

    fn workshops(&self) -> StoreFuture<'_, Vec<WorkshopRecord>> {
        Box::pin(async move { Ok(self.tables.read().await.workshops.clone()) })
    }

    fn workshop_attendance(&self) -> StoreFuture<'_, Vec<AttendanceRecord>> {
        Box::pin(async move { Ok(self.tables.read().await.attendance.clone()) })
    }
}
