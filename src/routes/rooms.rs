use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        room::{CreateRoomRequest, RoomListResponse, RoomSnapshot},
        validation::validate_room_id,
    },
    error::AppError,
    routes::identity::VerifiedUser,
    services::{public_service, room_service},
    state::SharedState,
};

/// Room discovery, creation and explicit join/teardown endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{id}", get(get_room).delete(close_room))
        .route("/rooms/{id}/join", post(join_room))
}

fn checked_room_id(id: &str) -> Result<(), AppError> {
    validate_room_id(id).map_err(|err| AppError::BadRequest(err.to_string()))
}

#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Discoverable rooms", body = RoomListResponse))
)]
/// List the rooms that are not private.
pub async fn list_rooms(State(state): State<SharedState>) -> Json<RoomListResponse> {
    Json(public_service::list_rooms(&state))
}

#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomSnapshot),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Login required"),
        (status = 404, description = "Song not found"),
        (status = 503, description = "Song catalog unavailable")
    )
)]
/// Open a new room hosted by the caller.
pub async fn create_room(
    State(state): State<SharedState>,
    VerifiedUser(identity): VerifiedUser,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<RoomSnapshot>), AppError> {
    let room = room_service::create_room(&state, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Room not found")
    )
)]
/// Return one room by id.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    checked_room_id(&id)?;
    Ok(Json(public_service::get_room(&state, &id)?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/join",
    tag = "rooms",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Joined (or already a player)", body = RoomSnapshot),
        (status = 401, description = "Login required"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room full or already started")
    )
)]
/// Join a room as the caller.
pub async fn join_room(
    State(state): State<SharedState>,
    VerifiedUser(identity): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    checked_room_id(&id)?;
    Ok(Json(room_service::join_room(&state, &id, &identity)?))
}

#[utoipa::path(
    delete,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 204, description = "Room closed"),
        (status = 401, description = "Caller is not the host"),
        (status = 404, description = "Room not found")
    )
)]
/// Tear a room down; host only.
pub async fn close_room(
    State(state): State<SharedState>,
    VerifiedUser(identity): VerifiedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    checked_room_id(&id)?;
    room_service::close_room(&state, &id, &identity)?;
    Ok(StatusCode::NO_CONTENT)
}
