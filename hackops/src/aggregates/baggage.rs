//! Baggage aggregate: the check-in/check-out state machine.
//!
//! The reducer works on a snapshot loaded by the service: the rooms in
//! allocation order, the occupancy of active bags, and the bags a command
//! refers to. Commands are validated and resolved here; persistence happens in
//! the service, which then feeds the stored bag back as an event so the
//! reducer can emit the owner notification.
//!
//! ```text
//! CheckIn ──► validate ──► place (manual or allocator) ──► pending
//!                                                            │ store
//! BagCheckedIn ◄─────────────────────────────────────────────┘
//!      └──► notify owner (fire-and-forget)
//! ```
//!
//! **Concurrency**: the snapshot may be stale by the time the bag is stored.
//! The store rejects a second active bag on the same position, which the
//! service reports as [`BaggageError::PositionTaken`].

use crate::allocator::{allocate, Occupancy};
use crate::notifications::{check_in_message, check_out_message};
use crate::types::{
    Bag, BagId, BagStatus, CheckInRequest, ManualPosition, NewBag, Position, Room, UserId,
};
use hackops_core::{
    effect::Effect, environment::Clock, notify::Notifier, reducer::Reducer, smallvec, SmallVec,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Longest accepted category.
pub const MAX_CATEGORY_LEN: usize = 10;
/// Longest accepted color code.
pub const MAX_COLOR_LEN: usize = 2;
/// Longest accepted description.
pub const MAX_DESCRIPTION_LEN: usize = 1023;

// ============================================================================
// Errors
// ============================================================================

/// Why a baggage operation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaggageError {
    /// The position already holds an active bag
    #[error("Position {position} is already taken")]
    PositionTaken {
        /// Label of the contested position
        position: String,
    },

    /// Every room is full
    #[error("No space available in any room")]
    NoSpaceAvailable,

    /// A referenced bag or room does not exist
    #[error("{resource} {id} not found")]
    NotFound {
        /// `Bag` or `Room`
        resource: String,
        /// The id that was looked up
        id: String,
    },

    /// Check-out of a bag that is already checked out
    #[error("Bag {bag_id} has already been checked out")]
    AlreadyRemoved {
        /// The bag
        bag_id: BagId,
    },

    /// Malformed request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The record store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BaggageError {
    /// Bag lookup miss.
    #[must_use]
    pub fn bag_not_found(id: BagId) -> Self {
        Self::NotFound {
            resource: "Bag".to_string(),
            id: id.to_string(),
        }
    }

    /// Room lookup miss.
    #[must_use]
    pub fn room_not_found(room: impl ToString) -> Self {
        Self::NotFound {
            resource: "Room".to_string(),
            id: room.to_string(),
        }
    }

    /// Short reason used as a metrics label.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::PositionTaken { .. } => "position_taken",
            Self::NoSpaceAvailable => "no_space",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyRemoved { .. } => "already_removed",
            Self::InvalidInput(_) => "invalid_input",
            Self::Storage(_) => "storage",
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Snapshot the reducer decides against.
#[derive(Clone, Debug, Default)]
pub struct BaggageState {
    /// Rooms in allocation order
    pub rooms: Vec<Room>,
    /// Positions held by active bags
    pub occupancy: Occupancy,
    /// Bags loaded for the current command, by id
    pub bags: HashMap<BagId, Bag>,
    /// Placement decided by the last check-in, waiting to be stored
    pub pending: Option<NewBag>,
    /// Rejection of the last command
    pub last_error: Option<BaggageError>,
}

impl BaggageState {
    /// Snapshot for a check-in.
    #[must_use]
    pub fn new(rooms: Vec<Room>, occupancy: Occupancy) -> Self {
        Self {
            rooms,
            occupancy,
            ..Self::default()
        }
    }

    /// Snapshot for commands on existing bags.
    #[must_use]
    pub fn with_bags(bags: impl IntoIterator<Item = Bag>) -> Self {
        let mut state = Self::default();
        for bag in bags {
            if bag.is_active() {
                state.occupancy.insert(&bag.position);
            }
            state.bags.insert(bag.id, bag);
        }
        state
    }

    /// A loaded bag.
    #[must_use]
    pub fn bag(&self, id: BagId) -> Option<&Bag> {
        self.bags.get(&id)
    }

    /// A room by name.
    #[must_use]
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id.as_str() == name)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Inputs to the baggage reducer.
#[derive(Clone, Debug)]
pub enum BaggageAction {
    // Commands
    /// Place a new bag
    CheckIn {
        /// Bag data and optional manual position
        request: CheckInRequest,
    },

    /// Hand a bag back
    CheckOut {
        /// Bag to check out
        bag_id: BagId,
        /// Staff member returning the bag
        custodian_out: UserId,
    },

    // Events
    /// The bag was stored
    BagCheckedIn {
        /// The stored bag
        bag: Bag,
    },

    /// The check-out was stored
    BagCheckedOut {
        /// The bag after check-out
        bag: Bag,
    },

    /// A command was refused
    Rejected {
        /// Why
        error: BaggageError,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the baggage reducer.
#[derive(Clone)]
pub struct BaggageEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Owner notifications
    pub notifier: Arc<dyn Notifier>,
}

impl BaggageEnvironment {
    /// Creates a new `BaggageEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self { clock, notifier }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the baggage state machine.
#[derive(Clone, Debug, Default)]
pub struct BaggageReducer;

impl BaggageReducer {
    /// Creates a new `BaggageReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_metadata(request: &CheckInRequest) -> Result<(), BaggageError> {
        let category = request.category.trim();
        if category.is_empty() {
            return Err(BaggageError::InvalidInput("Type is required".to_string()));
        }
        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(BaggageError::InvalidInput(format!(
                "Type must be at most {MAX_CATEGORY_LEN} characters"
            )));
        }

        let color = request.color.trim();
        if color.is_empty() || color.chars().count() > MAX_COLOR_LEN {
            return Err(BaggageError::InvalidInput(format!(
                "Color must be 1 to {MAX_COLOR_LEN} characters"
            )));
        }
        if !color.chars().all(char::is_alphanumeric) {
            return Err(BaggageError::InvalidInput(
                "Color must be a letter or digit code".to_string(),
            ));
        }

        if request
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(BaggageError::InvalidInput(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        if request.special && request.manual_position.is_some() {
            return Err(BaggageError::InvalidInput(
                "Special bags cannot be placed on a room grid".to_string(),
            ));
        }

        Ok(())
    }

    fn manual_placement(
        state: &BaggageState,
        manual: &ManualPosition,
    ) -> Result<Position, BaggageError> {
        let Some(room) = state.room(manual.room.as_str()) else {
            return Err(BaggageError::room_not_found(&manual.room));
        };
        if !room.contains(manual.row, manual.col) {
            return Err(BaggageError::InvalidInput(format!(
                "Position ({}, {}) is outside the {}x{} grid of room {}",
                manual.row, manual.col, room.rows, room.cols, room.id
            )));
        }

        let position = Position::Grid {
            room: room.id.clone(),
            row: manual.row,
            col: manual.col,
        };
        if state.occupancy.contains(&position) {
            return Err(BaggageError::PositionTaken {
                position: position.label(),
            });
        }
        Ok(position)
    }

    fn place(state: &BaggageState, request: &CheckInRequest) -> Result<Position, BaggageError> {
        match &request.manual_position {
            Some(manual) => Self::manual_placement(state, manual),
            None => allocate(&state.rooms, &state.occupancy, request.special)
                .map_err(|_| BaggageError::NoSpaceAvailable),
        }
    }

    fn notify_owner(
        env: &BaggageEnvironment,
        owner: UserId,
        message: String,
    ) -> Effect<BaggageAction> {
        let notifier = Arc::clone(&env.notifier);
        Effect::future(async move {
            if let Err(error) = notifier.notify(&owner.to_string(), message).await {
                tracing::warn!(%owner, %error, "Baggage notification was not delivered");
            }
            None
        })
    }

    fn reject(state: &mut BaggageState, error: BaggageError) -> SmallVec<[Effect<BaggageAction>; 4]> {
        tracing::debug!(reason = error.reason(), %error, "Baggage command rejected");
        state.last_error = Some(error);
        SmallVec::new()
    }
}

impl Reducer for BaggageReducer {
    type State = BaggageState;
    type Action = BaggageAction;
    type Environment = BaggageEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            BaggageAction::CheckIn { request } => {
                state.last_error = None;
                state.pending = None;

                if let Err(error) = Self::validate_metadata(&request) {
                    return Self::reject(state, error);
                }
                let position = match Self::place(state, &request) {
                    Ok(position) => position,
                    Err(error) => return Self::reject(state, error),
                };

                state.occupancy.insert(&position);
                state.pending = Some(NewBag {
                    owner: request.owner,
                    custodian_in: request.custodian_in,
                    position,
                    category: request.category.trim().to_string(),
                    color: request.color.trim().to_string(),
                    description: request
                        .description
                        .map(|d| d.trim().to_string())
                        .filter(|d| !d.is_empty()),
                    image: request.image,
                    created_at: env.clock.now(),
                });
                SmallVec::new()
            },

            BaggageAction::CheckOut {
                bag_id,
                custodian_out,
            } => {
                state.last_error = None;

                let Some(bag) = state.bags.get_mut(&bag_id) else {
                    return Self::reject(state, BaggageError::bag_not_found(bag_id));
                };
                if bag.status == BagStatus::Removed {
                    return Self::reject(state, BaggageError::AlreadyRemoved { bag_id });
                }

                bag.status = BagStatus::Removed;
                bag.custodian_out = Some(custodian_out);
                bag.updated_at = env.clock.now();
                let position = bag.position.clone();
                state.occupancy.remove(&position);
                SmallVec::new()
            },

            // ========== Events ==========
            BaggageAction::BagCheckedIn { bag } => {
                state.pending = None;
                state.occupancy.insert(&bag.position);
                let effect = Self::notify_owner(env, bag.owner, check_in_message(&bag));
                state.bags.insert(bag.id, bag);
                smallvec![effect]
            },

            BaggageAction::BagCheckedOut { bag } => {
                state.occupancy.remove(&bag.position);
                let effect = Self::notify_owner(env, bag.owner, check_out_message(&bag));
                state.bags.insert(bag.id, bag);
                smallvec![effect]
            },

            BaggageAction::Rejected { error } => Self::reject(state, error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RoomId;
    use hackops_testing::{assertions, test_clock, RecordingNotifier, ReducerTest};
    use uuid::Uuid;

    fn env() -> BaggageEnvironment {
        BaggageEnvironment::new(Arc::new(test_clock()), Arc::new(RecordingNotifier::new()))
    }

    fn user() -> UserId {
        UserId::from_uuid(Uuid::new_v4())
    }

    fn request() -> CheckInRequest {
        CheckInRequest {
            owner: user(),
            custodian_in: user(),
            category: "Suitcase".to_string(),
            color: "R".to_string(),
            description: Some("  Blue ribbon ".to_string()),
            special: false,
            image: None,
            manual_position: None,
        }
    }

    fn e01_state() -> BaggageState {
        BaggageState::new(vec![Room::new("E01", 2, 2)], Occupancy::new())
    }

    fn stored(id: i64, status: BagStatus) -> Bag {
        let mut bag = NewBag {
            owner: user(),
            custodian_in: user(),
            position: Position::grid("E01", 1, 1),
            category: "Backpack".to_string(),
            color: "K".to_string(),
            description: None,
            image: None,
            created_at: test_clock().now(),
        }
        .into_bag(BagId::new(id));
        if status == BagStatus::Removed {
            bag.status = BagStatus::Removed;
            bag.custodian_out = Some(user());
        }
        bag
    }

    #[test]
    fn check_in_places_at_the_door() {
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: request() })
            .then_state(|state| {
                assert!(state.last_error.is_none());
                let pending = state.pending.as_ref().unwrap();
                assert_eq!(pending.position, Position::grid("E01", 0, 0));
                assert_eq!(pending.description.as_deref(), Some("Blue ribbon"));
                assert_eq!(pending.created_at, test_clock().now());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn second_check_in_gets_the_next_cell() {
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: request() })
            .when_action(BaggageAction::CheckIn { request: request() })
            .then_state(|state| {
                let pending = state.pending.as_ref().unwrap();
                assert_eq!(pending.position, Position::grid("E01", 0, 1));
            })
            .run();
    }

    #[test]
    fn full_room_has_no_space() {
        let occupied = Occupancy::from_positions([
            Position::grid("E01", 0, 0),
            Position::grid("E01", 0, 1),
            Position::grid("E01", 1, 0),
            Position::grid("E01", 1, 1),
        ]);
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(BaggageState::new(vec![Room::new("E01", 2, 2)], occupied))
            .when_action(BaggageAction::CheckIn { request: request() })
            .then_state(|state| {
                assert_eq!(state.last_error, Some(BaggageError::NoSpaceAvailable));
                assert!(state.pending.is_none());
            })
            .run();
    }

    #[test]
    fn manual_position_taken() {
        let occupied = Occupancy::from_positions([Position::grid("E01", 1, 1)]);
        let mut req = request();
        req.manual_position = Some(ManualPosition {
            room: RoomId::new("E01"),
            row: 1,
            col: 1,
        });
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(BaggageState::new(vec![Room::new("E01", 2, 2)], occupied))
            .when_action(BaggageAction::CheckIn { request: req })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(BaggageError::PositionTaken {
                        position: "E01-B1".to_string()
                    })
                );
                assert!(state.pending.is_none());
            })
            .run();
    }

    #[test]
    fn manual_position_in_unknown_room() {
        let mut req = request();
        req.manual_position = Some(ManualPosition {
            room: RoomId::new("Z99"),
            row: 0,
            col: 0,
        });
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: req })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(BaggageError::NotFound { ref resource, .. }) if resource == "Room"
                ));
            })
            .run();
    }

    #[test]
    fn manual_position_outside_grid() {
        let mut req = request();
        req.manual_position = Some(ManualPosition {
            room: RoomId::new("E01"),
            row: 2,
            col: 0,
        });
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: req })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(BaggageError::InvalidInput(_))));
            })
            .run();
    }

    #[test]
    fn invalid_metadata_is_rejected_before_allocation() {
        for (category, color) in [("", "R"), ("Longer than ten", "R"), ("Bag", ""), ("Bag", "RED"), ("Bag", "#")] {
            let mut req = request();
            req.category = category.to_string();
            req.color = color.to_string();
            ReducerTest::new(BaggageReducer::new())
                .with_env(env())
                .given_state(e01_state())
                .when_action(BaggageAction::CheckIn { request: req })
                .then_state(|state| {
                    assert!(matches!(state.last_error, Some(BaggageError::InvalidInput(_))));
                    assert!(state.occupancy.is_empty());
                })
                .run();
        }
    }

    #[test]
    fn special_with_manual_position_is_invalid() {
        let mut req = request();
        req.special = true;
        req.manual_position = Some(ManualPosition {
            room: RoomId::new("E01"),
            row: 0,
            col: 0,
        });
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: req })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(BaggageError::InvalidInput(_))));
            })
            .run();
    }

    #[test]
    fn special_goes_to_virtual_namespace() {
        let mut req = request();
        req.special = true;
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::CheckIn { request: req })
            .then_state(|state| {
                let pending = state.pending.as_ref().unwrap();
                assert_eq!(pending.position, Position::Special { slot: 0 });
            })
            .run();
    }

    #[test]
    fn check_out_flips_status_and_frees_the_cell() {
        let bag = stored(7, BagStatus::Active);
        let custodian = user();
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(BaggageState::with_bags([bag]))
            .when_action(BaggageAction::CheckOut {
                bag_id: BagId::new(7),
                custodian_out: custodian,
            })
            .then_state(move |state| {
                let bag = state.bag(BagId::new(7)).unwrap();
                assert_eq!(bag.status, BagStatus::Removed);
                assert_eq!(bag.custodian_out, Some(custodian));
                assert!(state.occupancy.is_empty());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn second_check_out_keeps_history() {
        let bag = stored(7, BagStatus::Removed);
        let original_custodian = bag.custodian_out;
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(BaggageState::with_bags([bag]))
            .when_action(BaggageAction::CheckOut {
                bag_id: BagId::new(7),
                custodian_out: user(),
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(BaggageError::AlreadyRemoved {
                        bag_id: BagId::new(7)
                    })
                );
                assert_eq!(state.bag(BagId::new(7)).unwrap().custodian_out, original_custodian);
            })
            .run();
    }

    #[test]
    fn check_out_unknown_bag() {
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(BaggageState::default())
            .when_action(BaggageAction::CheckOut {
                bag_id: BagId::new(404),
                custodian_out: user(),
            })
            .then_state(|state| {
                assert_eq!(state.last_error, Some(BaggageError::bag_not_found(BagId::new(404))));
            })
            .run();
    }

    #[test]
    fn stored_events_notify_the_owner() {
        ReducerTest::new(BaggageReducer::new())
            .with_env(env())
            .given_state(e01_state())
            .when_action(BaggageAction::BagCheckedIn {
                bag: stored(1, BagStatus::Active),
            })
            .then_state(|state| {
                assert!(state.occupancy.contains(&Position::grid("E01", 1, 1)));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[tokio::test]
    async fn notification_failure_is_swallowed() {
        let notifier = RecordingNotifier::failing(hackops_core::notify::NotifyError::Transport(
            "webhook down".to_string(),
        ));
        let env = BaggageEnvironment::new(Arc::new(test_clock()), Arc::new(notifier.clone()));
        let bag = stored(3, BagStatus::Removed);
        let owner = bag.owner;
        let mut state = BaggageState::default();

        let mut effects = BaggageReducer::new().reduce(
            &mut state,
            BaggageAction::BagCheckedOut { bag },
            &env,
        );

        let Some(Effect::Future(future)) = effects.pop() else {
            unreachable!("check-out produces a notification effect");
        };
        assert!(future.await.is_none());
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, owner.to_string());
        assert!(sent[0].message.contains("ID `3`"));
    }
}
