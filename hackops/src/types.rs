//! Domain types for baggage tracking.
//!
//! Rooms describe the physical storage grid. Bags are the tracked items:
//! created Active on check-in, flipped to Removed on check-out, never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identity reference for owners and custodians.
///
/// Users live in the identity provider; this service only stores their ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bag identifier, assigned by the record store in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BagId(i64);

impl BagId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id value
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name, e.g. `E01`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Create a room id (surrounding whitespace is dropped)
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    /// Room name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Rooms
// ============================================================================

/// Largest accepted number of rows or columns in a room grid.
pub const MAX_ROOM_SIDE: u32 = 1_000;

/// A storage room: a `rows` x `cols` grid with a door reference point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room name
    pub id: RoomId,
    /// Number of rows (row indexes `0..rows`)
    pub rows: u32,
    /// Number of columns (column indexes `0..cols`)
    pub cols: u32,
    /// Row of the door; allocation prefers slots close to it
    pub door_row: u32,
    /// Column of the door
    pub door_col: u32,
}

impl Room {
    /// Create a room with its door at `(0, 0)`.
    #[must_use]
    pub fn new(id: impl AsRef<str>, rows: u32, cols: u32) -> Self {
        Self {
            id: RoomId::new(id),
            rows,
            cols,
            door_row: 0,
            door_col: 0,
        }
    }

    /// Move the door reference point.
    #[must_use]
    pub const fn with_door(mut self, row: u32, col: u32) -> Self {
        self.door_row = row;
        self.door_col = col;
        self
    }

    /// Whether `(row, col)` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, row: u32, col: u32) -> bool {
        row < self.rows && col < self.cols
    }

    /// Number of grid slots.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// Check administrative input before the room is stored.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the name is empty, a side
    /// exceeds [`MAX_ROOM_SIDE`] or the door lies outside a non-empty grid.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().is_empty() {
            return Err("Room name is required".to_string());
        }
        if self.rows > MAX_ROOM_SIDE || self.cols > MAX_ROOM_SIDE {
            return Err(format!(
                "Room {} is {}x{}; each side may be at most {MAX_ROOM_SIDE}",
                self.id, self.rows, self.cols
            ));
        }
        if self.capacity() > 0 && !self.contains(self.door_row, self.door_col) {
            return Err(format!(
                "Door ({}, {}) is outside the {}x{} grid of room {}",
                self.door_row, self.door_col, self.rows, self.cols, self.id
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Positions
// ============================================================================

/// Where a bag is stored.
///
/// Regular bags sit on a room grid. Special bags (oversized items, ...)
/// bypass the grid and get a sequential slot in the virtual `@` namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    /// A cell of a room grid
    Grid {
        /// Room holding the bag
        room: RoomId,
        /// Row index
        row: u32,
        /// Column index
        col: u32,
    },
    /// A slot in the special namespace
    Special {
        /// Slot index
        slot: u32,
    },
}

impl Position {
    /// Grid position shorthand.
    #[must_use]
    pub fn grid(room: impl AsRef<str>, row: u32, col: u32) -> Self {
        Self::Grid {
            room: RoomId::new(room),
            row,
            col,
        }
    }

    /// Whether this is a special-namespace slot.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        matches!(self, Self::Special { .. })
    }

    /// Room for grid positions.
    #[must_use]
    pub const fn room(&self) -> Option<&RoomId> {
        match self {
            Self::Grid { room, .. } => Some(room),
            Self::Special { .. } => None,
        }
    }

    /// Human label: `E01-B3` for grid cells, `@4` for special slots.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid { room, row, col } => write!(f, "{room}-{}{col}", row_letters(*row)),
            Self::Special { slot } => write!(f, "@{slot}"),
        }
    }
}

/// Spreadsheet-style row letters: 0 → `A`, 25 → `Z`, 26 → `AA`.
#[must_use]
pub fn row_letters(row: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(row) + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ============================================================================
// Bags
// ============================================================================

/// Lifecycle state of a bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BagStatus {
    /// Checked in and stored
    Active,
    /// Checked out (terminal)
    Removed,
}

impl BagStatus {
    /// Single-letter storage code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Removed => "R",
        }
    }

    /// Parse a storage code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Active),
            "R" => Some(Self::Removed),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Removed => "Removed",
        }
    }
}

/// A tracked bag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    /// Store-assigned id
    pub id: BagId,
    /// Who the bag belongs to
    pub owner: UserId,
    /// Staff member who checked it in
    pub custodian_in: UserId,
    /// Staff member who checked it out (set iff `status` is Removed)
    pub custodian_out: Option<UserId>,
    /// Lifecycle state
    pub status: BagStatus,
    /// Storage position
    pub position: Position,
    /// Free-text type, e.g. `Suitcase`
    pub category: String,
    /// Short color code
    pub color: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional reference to an externally stored picture
    pub image: Option<String>,
    /// Check-in time
    pub created_at: DateTime<Utc>,
    /// Last change (check-in or check-out)
    pub updated_at: DateTime<Utc>,
}

impl Bag {
    /// Whether the bag is still stored.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BagStatus::Active
    }

    /// Whether the bag sits in the special namespace.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        self.position.is_special()
    }
}

/// A bag that has been placed but not yet stored (no id yet).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBag {
    /// Owner identity
    pub owner: UserId,
    /// Staff member checking it in
    pub custodian_in: UserId,
    /// Resolved position
    pub position: Position,
    /// Free-text type
    pub category: String,
    /// Short color code
    pub color: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional image reference
    pub image: Option<String>,
    /// Check-in time
    pub created_at: DateTime<Utc>,
}

impl NewBag {
    /// Attach the store-assigned id.
    #[must_use]
    pub fn into_bag(self, id: BagId) -> Bag {
        Bag {
            id,
            owner: self.owner,
            custodian_in: self.custodian_in,
            custodian_out: None,
            status: BagStatus::Active,
            position: self.position,
            category: self.category,
            color: self.color,
            description: self.description,
            image: self.image,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// An operator-supplied grid position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPosition {
    /// Room name
    pub room: RoomId,
    /// Row index
    pub row: u32,
    /// Column index
    pub col: u32,
}

/// Everything needed to check a bag in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckInRequest {
    /// Owner identity
    pub owner: UserId,
    /// Staff member performing the check-in
    pub custodian_in: UserId,
    /// Free-text type
    pub category: String,
    /// Short color code
    pub color: String,
    /// Optional description
    pub description: Option<String>,
    /// Place in the special namespace instead of a grid
    pub special: bool,
    /// Optional image reference
    pub image: Option<String>,
    /// Explicit position chosen by the operator
    pub manual_position: Option<ManualPosition>,
}

/// A bag as shown to volunteers and owners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BagDetail {
    /// The bag
    #[serde(flatten)]
    pub bag: Bag,
    /// Display label of the position, e.g. `E01-B3`
    pub position_label: String,
    /// Whether the bag has been handed back
    pub checked_out: bool,
}

impl From<Bag> for BagDetail {
    fn from(bag: Bag) -> Self {
        Self {
            position_label: bag.position.label(),
            checked_out: !bag.is_active(),
            bag,
        }
    }
}

/// A room with the active bags stored in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoomOccupancy {
    /// The room
    pub room: Room,
    /// Active bags in the room
    pub bags: Vec<Bag>,
}

/// Every room with its active bags, plus active special bags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BaggageMap {
    /// Rooms in allocation order
    pub rooms: Vec<RoomOccupancy>,
    /// Active bags in the special namespace
    pub special: Vec<Bag>,
}
