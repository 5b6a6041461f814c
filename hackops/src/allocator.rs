//! Slot allocation.
//!
//! A pure function over a snapshot of occupancy: it never reads the store and
//! never reserves anything. Two callers working from the same snapshot get the
//! same answer, so the record store's uniqueness constraint is what decides
//! the winner at commit time.
//!
//! # Ordering
//!
//! Rooms are tried in preference order (see [`order_rooms`]). Inside a room,
//! cells are tried by Manhattan distance from the door, ties broken by row and
//! then column (see [`scan_order`]). Special bags take the lowest slot index
//! not held by another active special bag.

use crate::types::{Position, Room, RoomId};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Every room is full.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No free slot left in any room")]
pub struct Exhausted;

/// Positions currently held by active bags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    grid: HashMap<RoomId, HashSet<(u32, u32)>>,
    special: BTreeSet<u32>,
}

impl Occupancy {
    /// Empty occupancy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the positions of active bags.
    #[must_use]
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut occupancy = Self::new();
        for position in positions {
            occupancy.insert(&position);
        }
        occupancy
    }

    /// Mark a position as held. Returns `false` if it already was.
    pub fn insert(&mut self, position: &Position) -> bool {
        match position {
            Position::Grid { room, row, col } => self
                .grid
                .entry(room.clone())
                .or_default()
                .insert((*row, *col)),
            Position::Special { slot } => self.special.insert(*slot),
        }
    }

    /// Release a position. Returns `false` if it was not held.
    pub fn remove(&mut self, position: &Position) -> bool {
        match position {
            Position::Grid { room, row, col } => self
                .grid
                .get_mut(room)
                .is_some_and(|cells| cells.remove(&(*row, *col))),
            Position::Special { slot } => self.special.remove(slot),
        }
    }

    /// Whether a position is held.
    #[must_use]
    pub fn contains(&self, position: &Position) -> bool {
        match position {
            Position::Grid { room, row, col } => self.is_cell_taken(room, *row, *col),
            Position::Special { slot } => self.special.contains(slot),
        }
    }

    /// Number of held cells in a room.
    #[must_use]
    pub fn used_in(&self, room: &RoomId) -> usize {
        self.grid.get(room).map_or(0, HashSet::len)
    }

    /// Number of held positions overall.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grid.values().map(HashSet::len).sum::<usize>() + self.special.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_cell_taken(&self, room: &RoomId, row: u32, col: u32) -> bool {
        self.grid
            .get(room)
            .is_some_and(|cells| cells.contains(&(row, col)))
    }
}

/// Pick the next free position.
///
/// `rooms` must already be in preference order.
///
/// # Errors
///
/// Returns [`Exhausted`] when `special` is false and every cell of every room
/// is held.
pub fn allocate(rooms: &[Room], occupied: &Occupancy, special: bool) -> Result<Position, Exhausted> {
    if special {
        return Ok(Position::Special {
            slot: lowest_free_slot(&occupied.special),
        });
    }

    for room in rooms {
        if let Some((row, col)) =
            scan_order(room).find(|&(row, col)| !occupied.is_cell_taken(&room.id, row, col))
        {
            return Ok(Position::Grid {
                room: room.id.clone(),
                row,
                col,
            });
        }
    }

    Err(Exhausted)
}

/// Cells of a room in the order the allocator tries them.
///
/// Ordered by Manhattan distance from the door, then row, then column. Cells
/// are produced ring by ring, so finding a free cell near the door costs time
/// proportional to the cells in front of it rather than to the room size.
pub fn scan_order(room: &Room) -> impl Iterator<Item = (u32, u32)> {
    let rows = i64::from(room.rows);
    let cols = i64::from(room.cols);
    let door_row = i64::from(room.door_row);
    let door_col = i64::from(room.door_col);

    // Distance to the farthest corner; -1 leaves an empty grid with no rings.
    let farthest = if rows == 0 || cols == 0 {
        -1
    } else {
        door_row.max(rows - 1 - door_row) + door_col.max(cols - 1 - door_col)
    };

    (0..=farthest)
        .flat_map(move |distance| {
            let first_row = (door_row - distance).max(0);
            let last_row = (door_row + distance).min(rows - 1);
            (first_row..=last_row).flat_map(move |row| {
                let reach = distance - (row - door_row).abs();
                let right = (reach > 0).then_some(door_col + reach);
                std::iter::once(door_col - reach)
                    .chain(right)
                    .filter(move |col| (0..cols).contains(col))
                    .map(move |col| (row, col))
            })
        })
        .filter_map(|(row, col)| Some((u32::try_from(row).ok()?, u32::try_from(col).ok()?)))
}

/// Put rooms in allocation order.
///
/// Rooms named in `preference` come first, in that order. Every other room
/// follows, sorted by name. Preferred names with no matching room are ignored.
#[must_use]
pub fn order_rooms(mut rooms: Vec<Room>, preference: &[RoomId]) -> Vec<Room> {
    rooms.sort_by(|a, b| {
        let rank = |room: &Room| {
            preference
                .iter()
                .position(|p| *p == room.id)
                .unwrap_or(preference.len())
        };
        rank(a).cmp(&rank(b)).then_with(|| a.id.cmp(&b.id))
    });
    rooms
}

fn lowest_free_slot(taken: &BTreeSet<u32>) -> u32 {
    // Sorted iteration: the first gap between 0, 1, 2, ... is the answer.
    let mut candidate = 0;
    for &slot in taken {
        if slot != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}
