//! Baggage API endpoints.
//!
//! - POST /api/bags - Check a bag in (acting user becomes custodian-in)
//! - POST /api/bags/:id/checkout - Check a bag out (acting user becomes custodian-out)
//! - GET /api/bags/:id - One bag
//! - GET /api/bags?owner= - Active bags, optionally of one owner
//! - GET /api/bags/history - Every bag, newest first
//! - GET /api/bags/map - Rooms with their active bags

use crate::server::state::AppState;
use crate::types::{BagDetail, BagId, BaggageMap, CheckInRequest, ManualPosition, RoomId, UserId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hackops_web::{ActingUser, WebResult};
use serde::Deserialize;
use uuid::Uuid;

// ============================================================================
// Request Types
// ============================================================================

/// Explicit grid position chosen by the volunteer.
#[derive(Debug, Deserialize)]
pub struct PositionBody {
    /// Room name
    pub room: String,
    /// Row index
    pub row: u32,
    /// Column index
    pub col: u32,
}

/// Check-in request body.
#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    /// Owner of the bag
    pub owner: Uuid,
    /// Free-text type, e.g. `Suitcase`
    #[serde(rename = "type")]
    pub category: String,
    /// Short color code
    pub color: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Store in the special namespace
    #[serde(default)]
    pub special: bool,
    /// Reference to an uploaded picture
    #[serde(default)]
    pub image: Option<String>,
    /// Manual placement; allocated automatically when absent
    #[serde(default)]
    pub position: Option<PositionBody>,
}

impl CheckInBody {
    fn into_request(self, custodian_in: UserId) -> CheckInRequest {
        CheckInRequest {
            owner: UserId::from_uuid(self.owner),
            custodian_in,
            category: self.category,
            color: self.color,
            description: self.description,
            special: self.special,
            image: self.image.filter(|i| !i.trim().is_empty()),
            manual_position: self.position.map(|p| ManualPosition {
                room: RoomId::new(p.room),
                row: p.row,
                col: p.col,
            }),
        }
    }
}

/// Filter for the active bag list.
#[derive(Debug, Deserialize)]
pub struct ActiveBagsQuery {
    /// Only bags of this owner
    pub owner: Option<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Check a bag in.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bags \
///   -H "X-User-Id: 6f1c...volunteer" \
///   -H "Content-Type: application/json" \
///   -d '{"owner": "0b7e...hacker", "type": "Suitcase", "color": "R"}'
/// ```
///
/// # Errors
///
/// 422 for invalid metadata, 404 for an unknown room, 409 `POSITION_TAKEN`,
/// 503 `NO_SPACE_AVAILABLE`.
pub async fn check_in(
    State(state): State<AppState>,
    ActingUser(custodian): ActingUser,
    Json(body): Json<CheckInBody>,
) -> WebResult<(StatusCode, Json<BagDetail>)> {
    let request = body.into_request(UserId::from_uuid(custodian));
    let bag = state.baggage.check_in(request).await?;
    Ok((StatusCode::CREATED, Json(bag.into())))
}

/// Check a bag out.
///
/// # Errors
///
/// 404 for an unknown bag, 409 `ALREADY_REMOVED`.
pub async fn check_out(
    State(state): State<AppState>,
    ActingUser(custodian): ActingUser,
    Path(id): Path<i64>,
) -> WebResult<Json<BagDetail>> {
    let bag = state
        .baggage
        .check_out(BagId::new(id), UserId::from_uuid(custodian))
        .await?;
    Ok(Json(bag.into()))
}

/// One bag.
///
/// # Errors
///
/// 404 for an unknown bag.
pub async fn get_bag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Json<BagDetail>> {
    Ok(Json(state.baggage.get_bag(BagId::new(id)).await?))
}

/// Active bags.
///
/// # Errors
///
/// 500 when the store fails.
pub async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<ActiveBagsQuery>,
) -> WebResult<Json<Vec<BagDetail>>> {
    let owner = query.owner.map(UserId::from_uuid);
    Ok(Json(state.baggage.list_active(owner).await?))
}

/// Every bag, newest first.
///
/// # Errors
///
/// 500 when the store fails.
pub async fn history(State(state): State<AppState>) -> WebResult<Json<Vec<BagDetail>>> {
    Ok(Json(state.baggage.history().await?))
}

/// Rooms with their active bags.
///
/// # Errors
///
/// 500 when the store fails.
pub async fn map(State(state): State<AppState>) -> WebResult<Json<BaggageMap>> {
    Ok(Json(state.baggage.map().await?))
}
