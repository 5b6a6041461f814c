//! Baggage service - the command and query handlers behind the HTTP API.
//!
//! Commands follow the same sequence:
//! 1. Load a snapshot from the record store
//! 2. Run the reducer with the command
//! 3. Persist the decision (the store enforces position uniqueness)
//! 4. Feed the stored bag back to the reducer as an event
//! 5. Spawn the resulting effects (owner notification) without awaiting them
//!
//! Queries read the store directly.

use crate::aggregates::{
    BaggageAction, BaggageEnvironment, BaggageError, BaggageReducer, BaggageState,
};
use crate::allocator::{order_rooms, Occupancy};
use crate::metrics;
use crate::runtime::EffectRunner;
use crate::stores::{BaggageStore, StoreError};
use crate::types::{
    Bag, BagDetail, BagId, BaggageMap, CheckInRequest, Room, RoomId, RoomOccupancy, UserId,
};
use hackops_core::reducer::Reducer;
use std::collections::HashMap;
use std::sync::Arc;

impl From<StoreError> for BaggageError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::BagNotFound(id) => Self::bag_not_found(id),
            StoreError::NotActive(bag_id) => Self::AlreadyRemoved { bag_id },
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Check-in, check-out and the baggage views.
pub struct BaggageService {
    store: Arc<dyn BaggageStore>,
    reducer: BaggageReducer,
    env: BaggageEnvironment,
    effects: EffectRunner,
    room_order: Vec<RoomId>,
}

impl BaggageService {
    /// Create a new baggage service.
    ///
    /// `room_order` lists the rooms the allocator tries first.
    #[must_use]
    pub fn new(
        store: Arc<dyn BaggageStore>,
        env: BaggageEnvironment,
        effects: EffectRunner,
        room_order: Vec<RoomId>,
    ) -> Self {
        Self {
            store,
            reducer: BaggageReducer::new(),
            env,
            effects,
            room_order,
        }
    }

    /// Runner executing this service's effects.
    #[must_use]
    pub const fn effects(&self) -> &EffectRunner {
        &self.effects
    }

    fn dispatch(&self, state: &mut BaggageState, action: BaggageAction) {
        let effects = self.reducer.reduce(state, action, &self.env);
        self.effects.spawn(effects);
    }

    async fn rooms_in_order(&self) -> Result<Vec<Room>, BaggageError> {
        Ok(order_rooms(self.store.list_rooms().await?, &self.room_order))
    }

    // ========== Commands ==========

    /// Check a bag in and notify its owner.
    ///
    /// Without a manual position the bag goes to the first free slot: special
    /// namespace for special bags, otherwise the first room in allocation
    /// order with a free cell, nearest to the door.
    ///
    /// # Errors
    ///
    /// - [`BaggageError::InvalidInput`] for malformed metadata
    /// - [`BaggageError::NotFound`] for a manual position in an unknown room
    /// - [`BaggageError::PositionTaken`] if the position is held, including
    ///   when a concurrent check-in stored it first
    /// - [`BaggageError::NoSpaceAvailable`] when every room is full
    /// - [`BaggageError::Storage`] when the record store fails
    pub async fn check_in(&self, request: CheckInRequest) -> Result<Bag, BaggageError> {
        let rooms = self.rooms_in_order().await?;
        let occupancy = Occupancy::from_positions(self.store.active_positions().await?);
        let mut state = BaggageState::new(rooms, occupancy);

        self.dispatch(&mut state, BaggageAction::CheckIn { request });
        if let Some(error) = state.last_error.take() {
            metrics::record_check_in_rejected(&error);
            return Err(error);
        }
        let Some(placed) = state.pending.clone() else {
            return Err(BaggageError::Storage(
                "Check-in produced no placement".to_string(),
            ));
        };

        let label = placed.position.label();
        let bag = match self.store.insert_bag(placed).await {
            Ok(bag) => bag,
            Err(StoreError::PositionConflict) => {
                let error = BaggageError::PositionTaken { position: label };
                tracing::info!(%error, "Lost a concurrent check-in race");
                self.dispatch(&mut state, BaggageAction::Rejected { error: error.clone() });
                metrics::record_check_in_rejected(&error);
                return Err(error);
            },
            Err(error) => return Err(error.into()),
        };

        self.dispatch(&mut state, BaggageAction::BagCheckedIn { bag: bag.clone() });
        metrics::record_check_in(&bag);
        tracing::info!(
            bag_id = %bag.id,
            owner = %bag.owner,
            position = %bag.position,
            "Bag checked in"
        );
        Ok(bag)
    }

    /// Check a bag out and notify its owner.
    ///
    /// # Errors
    ///
    /// - [`BaggageError::NotFound`] if the bag does not exist
    /// - [`BaggageError::AlreadyRemoved`] if it was already checked out,
    ///   including by a concurrent request
    /// - [`BaggageError::Storage`] when the record store fails
    pub async fn check_out(&self, bag_id: BagId, custodian_out: UserId) -> Result<Bag, BaggageError> {
        let Some(bag) = self.store.get_bag(bag_id).await? else {
            let error = BaggageError::bag_not_found(bag_id);
            metrics::record_check_out_rejected(&error);
            return Err(error);
        };
        let mut state = BaggageState::with_bags([bag]);

        self.dispatch(
            &mut state,
            BaggageAction::CheckOut {
                bag_id,
                custodian_out,
            },
        );
        if let Some(error) = state.last_error.take() {
            metrics::record_check_out_rejected(&error);
            return Err(error);
        }
        let at = state
            .bag(bag_id)
            .map_or_else(|| self.env.clock.now(), |bag| bag.updated_at);

        let bag = match self.store.mark_removed(bag_id, custodian_out, at).await {
            Ok(bag) => bag,
            Err(error @ (StoreError::NotActive(_) | StoreError::BagNotFound(_))) => {
                let error = BaggageError::from(error);
                tracing::info!(%error, "Lost a concurrent check-out race");
                metrics::record_check_out_rejected(&error);
                return Err(error);
            },
            Err(error) => return Err(error.into()),
        };

        self.dispatch(&mut state, BaggageAction::BagCheckedOut { bag: bag.clone() });
        metrics::record_check_out();
        tracing::info!(
            bag_id = %bag.id,
            owner = %bag.owner,
            position = %bag.position,
            "Bag checked out"
        );
        Ok(bag)
    }

    /// Create or replace a room.
    ///
    /// # Errors
    ///
    /// [`BaggageError::InvalidInput`] for an unnamed room, an oversized grid
    /// or a door outside the grid; [`BaggageError::Storage`] when the store
    /// fails.
    pub async fn upsert_room(&self, room: Room) -> Result<Room, BaggageError> {
        room.validate().map_err(BaggageError::InvalidInput)?;
        let room = self.store.upsert_room(room).await?;
        tracing::info!(room = %room.id, rows = room.rows, cols = room.cols, "Room saved");
        Ok(room)
    }

    // ========== Queries ==========

    /// Rooms in allocation order.
    ///
    /// # Errors
    ///
    /// [`BaggageError::Storage`] when the store fails.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, BaggageError> {
        self.rooms_in_order().await
    }

    /// One bag with its display label.
    ///
    /// # Errors
    ///
    /// [`BaggageError::NotFound`] if the bag does not exist.
    pub async fn get_bag(&self, bag_id: BagId) -> Result<BagDetail, BaggageError> {
        self.store
            .get_bag(bag_id)
            .await?
            .map(BagDetail::from)
            .ok_or_else(|| BaggageError::bag_not_found(bag_id))
    }

    /// Active bags, optionally only those of `owner`.
    ///
    /// # Errors
    ///
    /// [`BaggageError::Storage`] when the store fails.
    pub async fn list_active(&self, owner: Option<UserId>) -> Result<Vec<BagDetail>, BaggageError> {
        Ok(self
            .store
            .active_bags(owner)
            .await?
            .into_iter()
            .map(BagDetail::from)
            .collect())
    }

    /// Every bag ever checked in, newest first.
    ///
    /// # Errors
    ///
    /// [`BaggageError::Storage`] when the store fails.
    pub async fn history(&self) -> Result<Vec<BagDetail>, BaggageError> {
        Ok(self
            .store
            .all_bags()
            .await?
            .into_iter()
            .map(BagDetail::from)
            .collect())
    }

    /// Every room with its active bags, plus the active special bags.
    ///
    /// # Errors
    ///
    /// [`BaggageError::Storage`] when the store fails.
    pub async fn map(&self) -> Result<BaggageMap, BaggageError> {
        let rooms = self.rooms_in_order().await?;
        let mut by_room: HashMap<RoomId, Vec<Bag>> = HashMap::new();
        let mut special = Vec::new();

        for bag in self.store.active_bags(None).await? {
            match bag.position.room() {
                Some(room) => by_room.entry(room.clone()).or_default().push(bag),
                None => special.push(bag),
            }
        }

        Ok(BaggageMap {
            rooms: rooms
                .into_iter()
                .map(|room| RoomOccupancy {
                    bags: by_room.remove(&room.id).unwrap_or_default(),
                    room,
                })
                .collect(),
            special,
        })
    }

    /// Probe the record store.
    ///
    /// # Errors
    ///
    /// [`BaggageError::Storage`] when the store does not answer.
    pub async fn ping(&self) -> Result<(), BaggageError> {
        Ok(self.store.ping().await?)
    }
}
