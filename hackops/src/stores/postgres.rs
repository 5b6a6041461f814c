//! `PostgreSQL` record stores.
//!
//! Schema lives in `hackops/migrations/`. Two partial unique indexes keep at
//! most one active bag per grid cell and per special slot; a unique violation
//! on insert is reported as [`StoreError::PositionConflict`]. Check-out is a
//! conditional update on `status = 'A'`, so concurrent check-outs of the same
//! bag cannot both succeed.

use super::{BaggageStore, StatsSource, StoreError, StoreFuture};
use crate::stats::records::{
    ApplicationKind, ApplicationRecord, AttendanceRecord, ReimbursementRecord, WorkshopRecord,
};
use crate::types::{Bag, BagId, BagStatus, NewBag, Position, Room, RoomId, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

const BAG_COLUMNS: &str = "bid, owner_id, in_by, out_by, status, room, row_index, col, \
                           btype, color, description, special, image, created_at, updated_at";

fn database(context: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Database(format!("{context}: {e}"))
}

fn to_db(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} {value} out of range")))
}

fn from_db(value: i32, what: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what}: {value}")))
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    room: String,
    row_count: i32,
    col_count: i32,
    door_row: i32,
    door_col: i32,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoomId::new(row.room),
            rows: from_db(row.row_count, "row count")?,
            cols: from_db(row.col_count, "column count")?,
            door_row: from_db(row.door_row, "door row")?,
            door_col: from_db(row.door_col, "door column")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BagRow {
    bid: i64,
    owner_id: Uuid,
    in_by: Uuid,
    out_by: Option<Uuid>,
    status: String,
    room: Option<String>,
    row_index: Option<i32>,
    col: i32,
    btype: String,
    color: String,
    description: Option<String>,
    special: bool,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BagRow> for Bag {
    type Error = StoreError;

    fn try_from(row: BagRow) -> Result<Self, Self::Error> {
        let status = BagStatus::from_code(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("bag {} has status {}", row.bid, row.status)))?;
        let col = from_db(row.col, "column")?;
        let position = match (row.special, row.room, row.row_index) {
            (true, _, _) => Position::Special { slot: col },
            (false, Some(room), Some(row_index)) => Position::Grid {
                room: RoomId::new(room),
                row: from_db(row_index, "row")?,
                col,
            },
            (false, _, _) => {
                return Err(StoreError::Corrupt(format!(
                    "bag {} is not special but has no grid cell",
                    row.bid
                )));
            },
        };

        Ok(Self {
            id: BagId::new(row.bid),
            owner: UserId::from_uuid(row.owner_id),
            custodian_in: UserId::from_uuid(row.in_by),
            custodian_out: row.out_by.map(UserId::from_uuid),
            status,
            position,
            category: row.btype,
            color: row.color,
            description: row.description,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn bags_from_rows(rows: Vec<BagRow>) -> Result<Vec<Bag>, StoreError> {
    rows.into_iter().map(Bag::try_from).collect()
}

/// Rooms and bags in `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresBaggageStore {
    pool: Arc<PgPool>,
}

impl PostgresBaggageStore {
    /// Creates a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Database(format!("Failed to run migrations: {e}")))
    }
}

impl BaggageStore for PostgresBaggageStore {
    fn list_rooms(&self) -> StoreFuture<'_, Vec<Room>> {
        Box::pin(async move {
            let rows: Vec<RoomRow> = sqlx::query_as(
                "SELECT room, row_count, col_count, door_row, door_col FROM rooms ORDER BY room",
            )
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(database("Failed to list rooms"))?;
            rows.into_iter().map(Room::try_from).collect()
        })
    }

    fn upsert_room(&self, room: Room) -> StoreFuture<'_, Room> {
        Box::pin(async move {
            let row: RoomRow = sqlx::query_as(
                "INSERT INTO rooms (room, row_count, col_count, door_row, door_col)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (room) DO UPDATE
                 SET row_count = EXCLUDED.row_count,
                     col_count = EXCLUDED.col_count,
                     door_row = EXCLUDED.door_row,
                     door_col = EXCLUDED.door_col
                 RETURNING room, row_count, col_count, door_row, door_col",
            )
            .bind(room.id.as_str())
            .bind(to_db(room.rows, "row count")?)
            .bind(to_db(room.cols, "column count")?)
            .bind(to_db(room.door_row, "door row")?)
            .bind(to_db(room.door_col, "door column")?)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(database("Failed to store room"))?;
            Room::try_from(row)
        })
    }

    fn active_positions(&self) -> StoreFuture<'_, Vec<Position>> {
        Box::pin(async move {
            let rows: Vec<(bool, Option<String>, Option<i32>, i32)> = sqlx::query_as(
                "SELECT special, room, row_index, col FROM bags WHERE status = 'A'",
            )
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(database("Failed to load occupancy"))?;

            rows.into_iter()
                .map(|(special, room, row_index, col)| {
                    let col = from_db(col, "column")?;
                    match (special, room, row_index) {
                        (true, _, _) => Ok(Position::Special { slot: col }),
                        (false, Some(room), Some(row)) => Ok(Position::Grid {
                            room: RoomId::new(room),
                            row: from_db(row, "row")?,
                            col,
                        }),
                        (false, _, _) => Err(StoreError::Corrupt(
                            "active bag without a grid cell".to_string(),
                        )),
                    }
                })
                .collect()
        })
    }

    fn insert_bag(&self, bag: NewBag) -> StoreFuture<'_, Bag> {
        Box::pin(async move {
            let (room, row_index, col, special) = match &bag.position {
                Position::Grid { room, row, col } => (
                    Some(room.as_str().to_string()),
                    Some(to_db(*row, "row")?),
                    to_db(*col, "column")?,
                    false,
                ),
                Position::Special { slot } => (None, None, to_db(*slot, "slot")?, true),
            };

            let row: BagRow = sqlx::query_as(&format!(
                "INSERT INTO bags (owner_id, in_by, status, room, row_index, col, btype, color,
                                   description, special, image, created_at, updated_at)
                 VALUES ($1, $2, 'A', $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                 RETURNING {BAG_COLUMNS}"
            ))
            .bind(bag.owner.as_uuid())
            .bind(bag.custodian_in.as_uuid())
            .bind(room)
            .bind(row_index)
            .bind(col)
            .bind(&bag.category)
            .bind(&bag.color)
            .bind(&bag.description)
            .bind(special)
            .bind(&bag.image)
            .bind(bag.created_at)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::PositionConflict
                },
                other => StoreError::Database(format!("Failed to insert bag: {other}")),
            })?;

            Bag::try_from(row)
        })
    }

    fn get_bag(&self, id: BagId) -> StoreFuture<'_, Option<Bag>> {
        Box::pin(async move {
            let row: Option<BagRow> =
                sqlx::query_as(&format!("SELECT {BAG_COLUMNS} FROM bags WHERE bid = $1"))
                    .bind(id.value())
                    .fetch_optional(self.pool.as_ref())
                    .await
                    .map_err(database("Failed to load bag"))?;
            row.map(Bag::try_from).transpose()
        })
    }

    fn mark_removed(
        &self,
        id: BagId,
        custodian_out: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Bag> {
        Box::pin(async move {
            let updated: Option<BagRow> = sqlx::query_as(&format!(
                "UPDATE bags SET status = 'R', out_by = $2, updated_at = $3
                 WHERE bid = $1 AND status = 'A'
                 RETURNING {BAG_COLUMNS}"
            ))
            .bind(id.value())
            .bind(custodian_out.as_uuid())
            .bind(at)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(database("Failed to check out bag"))?;

            if let Some(row) = updated {
                return Bag::try_from(row);
            }

            let exists: Option<(i64,)> = sqlx::query_as("SELECT bid FROM bags WHERE bid = $1")
                .bind(id.value())
                .fetch_optional(self.pool.as_ref())
                .await
                .map_err(database("Failed to load bag"))?;
            Err(match exists {
                Some(_) => StoreError::NotActive(id),
                None => StoreError::BagNotFound(id),
            })
        })
    }

    fn active_bags(&self, owner: Option<UserId>) -> StoreFuture<'_, Vec<Bag>> {
        Box::pin(async move {
            let rows: Vec<BagRow> = sqlx::query_as(&format!(
                "SELECT {BAG_COLUMNS} FROM bags
                 WHERE status = 'A' AND ($1::uuid IS NULL OR owner_id = $1)
                 ORDER BY created_at, bid"
            ))
            .bind(owner.map(|o| *o.as_uuid()))
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(database("Failed to list active bags"))?;
            bags_from_rows(rows)
        })
    }

    fn all_bags(&self) -> StoreFuture<'_, Vec<Bag>> {
        Box::pin(async move {
            let rows: Vec<BagRow> = sqlx::query_as(&format!(
                "SELECT {BAG_COLUMNS} FROM bags ORDER BY created_at DESC, updated_at DESC, bid DESC"
            ))
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(database("Failed to list bags"))?;
            bags_from_rows(rows)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(self.pool.as_ref())
                .await
                .map_err(database("Database ping failed"))?;
            Ok(())
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    kind: String,
    status: String,
    gender: Option<String>,
    class_status: Option<String>,
    degree: Option<String>,
    tshirt_size: Option<String>,
    diet: Option<String>,
    other_diet: Option<String>,
    hardware: Option<String>,
    hear_about: Option<String>,
    attendance_type: Option<String>,
    first_timer: bool,
    submitted_at: DateTime<Utc>,
}

impl From<ApplicationRow> for ApplicationRecord {
    fn from(row: ApplicationRow) -> Self {
        Self {
            status: row.status,
            kind: ApplicationKind::from_code(&row.kind),
            gender: row.gender,
            class_status: row.class_status,
            degree: row.degree,
            tshirt_size: row.tshirt_size,
            diet: row.diet,
            other_diet: row.other_diet,
            hardware: row.hardware,
            hear_about: row.hear_about,
            attendance_type: row.attendance_type,
            first_timer: row.first_timer,
            submitted_at: row.submitted_at,
        }
    }
}

/// Statistics records in `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresStatsSource {
    pool: Arc<PgPool>,
}

impl PostgresStatsSource {
    /// Creates a new source over a connection pool.
    #[must_use]
    pub const fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl StatsSource for PostgresStatsSource {
    fn applications(&self) -> StoreFuture<'_, Vec<ApplicationRecord>> {
        Box::pin(async move {
            let rows: Vec<ApplicationRow> = sqlx::query_as(
                "SELECT kind, status, gender, class_status, degree, tshirt_size, diet, other_diet,
                        hardware, hear_about, attendance_type, first_timer, submitted_at
                 FROM applications",
            )
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(database("Failed to load applications"))?;
            Ok(rows.into_iter().map(ApplicationRecord::from).collect())
        })
    }

    fn draft_application_count(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM draft_applications")
                .fetch_one(self.pool.as_ref())
                .await
                .map_err(database("Failed to count drafts"))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }

    fn reimbursements(&self) -> StoreFuture<'_, Vec<ReimbursementRecord>> {
        Box::pin(async move {
            let rows: Vec<(String, Option<i64>, Option<i64>)> =
                sqlx::query_as("SELECT status, final_amount, max_amount FROM reimbursements")
                    .fetch_all(self.pool.as_ref())
                    .await
                    .map_err(database("Failed to load reimbursements"))?;
            Ok(rows
                .into_iter()
                .map(|(status, final_amount, max_amount)| ReimbursementRecord {
                    status,
                    final_amount,
                    max_amount,
                })
                .collect())
        })
    }

    fn workshops(&self) -> StoreFuture<'_, Vec<WorkshopRecord>> {
        Box::pin(async move {
            let rows: Vec<(i64, String)> =
                sqlx::query_as("SELECT id, title FROM workshops ORDER BY id")
                    .fetch_all(self.pool.as_ref())
                    .await
                    .map_err(database("Failed to load workshops"))?;
            Ok(rows
                .into_iter()
                .map(|(id, title)| WorkshopRecord { id, title })
                .collect())
        })
    }

    fn workshop_attendance(&self) -> StoreFuture<'_, Vec<AttendanceRecord>> {
        Box::pin(async move {
            let rows: Vec<(i64,)> = sqlx::query_as("SELECT workshop_id FROM workshop_attendance")
                .fetch_all(self.pool.as_ref())
                .await
                .map_err(database("Failed to load workshop attendance"))?;
            Ok(rows
                .into_iter()
                .map(|(workshop_id,)| AttendanceRecord { workshop_id })
                .collect())
        })
    }
}
