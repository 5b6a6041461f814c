//! Room registry endpoints.
//!
//! - GET /api/rooms - Rooms in allocation order
//! - PUT /api/rooms/:room - Create or resize a room

use crate::server::state::AppState;
use crate::types::Room;
use axum::{
    extract::{Path, State},
    Json,
};
use hackops_web::WebResult;
use serde::Deserialize;

/// Room dimensions.
#[derive(Debug, Deserialize)]
pub struct RoomBody {
    /// Number of rows
    pub rows: u32,
    /// Number of columns
    pub cols: u32,
    /// Door row (defaults to 0)
    #[serde(default)]
    pub door_row: u32,
    /// Door column (defaults to 0)
    #[serde(default)]
    pub door_col: u32,
}

/// Rooms in allocation order.
///
/// # Errors
///
/// 500 when the store fails.
pub async fn list_rooms(State(state): State<AppState>) -> WebResult<Json<Vec<Room>>> {
    Ok(Json(state.baggage.list_rooms().await?))
}

/// Create or replace a room.
///
/// Resizing does not move stored bags; cells outside the new grid simply stop
/// being allocated.
///
/// # Errors
///
/// 422 for an empty name or a door outside the grid.
pub async fn upsert_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<RoomBody>,
) -> WebResult<Json<Room>> {
    let room = Room::new(name, body.rows, body.cols).with_door(body.door_row, body.door_col);
    Ok(Json(state.baggage.upsert_room(room).await?))
}
