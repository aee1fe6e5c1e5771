use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{CreateRoomRequest, CreateRoomResponse, RoomDetails, RoomSummary},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes creating and inspecting rooms.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create-room/{match_id}", post(create_room))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{match_id}", get(room_details))
}

/// Create the room serving a match, or return the existing one while it has a free seat.
#[utoipa::path(
    post,
    path = "/create-room/{match_id}",
    tag = "rooms",
    params(("match_id" = String, Path, description = "External match identifier")),
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created or found", body = CreateRoomResponse),
        (status = 400, description = "Room is full or input is invalid"),
        (status = 500, description = "Room unavailable")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Path(match_id): Path<String>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let response = room_service::create_room(&state, &match_id, payload).await?;
    Ok(Json(response))
}

/// List every live room.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses(
        (status = 200, description = "Live rooms", body = [RoomSummary])
    )
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomSummary>> {
    Json(room_service::list_rooms(&state).await)
}

/// Listing entry and current state of one room.
#[utoipa::path(
    get,
    path = "/rooms/{match_id}",
    tag = "rooms",
    params(("match_id" = String, Path, description = "External match identifier")),
    responses(
        (status = 200, description = "Room state", body = RoomDetails),
        (status = 404, description = "No room for this match")
    )
)]
pub async fn room_details(
    State(state): State<SharedState>,
    Path(match_id): Path<String>,
) -> Result<Json<RoomDetails>, AppError> {
    let details = room_service::room_details(&state, &match_id).await?;
    Ok(Json(details))
}
