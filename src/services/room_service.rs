//! Room creation and explicit room requests coming from the REST layer.

use tracing::{debug, error, info};

use crate::{
    dto::{
        room::{CreateRoomRequest, RoomSnapshot},
        ws::JoinRejection,
    },
    error::ServiceError,
    services::{lifecycle_service::EnterOutcome, relay_events::publish_room_state},
    state::{
        Identity, SharedState,
        room::{Player, RoomSpec},
    },
};

/// Create a room for `identity`, copying the song metadata from the catalog.
pub async fn create_room(
    state: &SharedState,
    identity: &Identity,
    request: CreateRoomRequest,
) -> Result<RoomSnapshot, ServiceError> {
    let config = state.config();
    let max_players = request
        .max_players
        .unwrap_or_else(|| config.default_max_players());
    if max_players > config.max_players_limit() {
        return Err(ServiceError::InvalidInput(format!(
            "max_players must be at most {}",
            config.max_players_limit()
        )));
    }

    let song = state
        .catalog()
        .find_song(request.song_id)
        .await?
        .ok_or_else(|| {
            debug!(song_id = request.song_id, "room creation for unknown song");
            ServiceError::NotFound(format!("song `{}` not found", request.song_id))
        })?;

    let spec = RoomSpec {
        name: request.room_name.trim().to_string(),
        song: song.into(),
        max_players,
        is_private: request.is_private,
    };
    let host = Player::new(identity.user_id.clone(), identity.name.clone());
    let room = state.rooms().create_room(spec, host).map_err(|err| {
        error!(user_id = %identity.user_id, error = %err, "room registry failed to allocate an id");
        ServiceError::from(err)
    })?;

    info!(
        room_id = %room.id,
        user_id = %identity.user_id,
        song_id = room.song.song_id,
        max_players,
        "room created"
    );
    publish_room_state(state.relay(), room.clone());
    Ok(room.into())
}

/// Explicit join request; capacity and lookup failures are reported to the caller.
pub fn join_room(
    state: &SharedState,
    room_id: &str,
    identity: &Identity,
) -> Result<RoomSnapshot, ServiceError> {
    match state.lifecycle().enter(room_id, identity) {
        EnterOutcome::Entered(room) | EnterOutcome::AlreadyInside(room) => Ok(room.into()),
        EnterOutcome::Rejected(JoinRejection::RoomFull) => {
            Err(ServiceError::RoomFull(room_id.to_string()))
        }
        EnterOutcome::Rejected(JoinRejection::RoomNotFound) => Err(ServiceError::NotFound(
            format!("room `{room_id}` not found"),
        )),
        EnterOutcome::Rejected(JoinRejection::AlreadyStarted) => Err(ServiceError::InvalidState(
            format!("room `{room_id}` already started"),
        )),
    }
}

/// Tear down a room; only its host may do so.
pub fn close_room(
    state: &SharedState,
    room_id: &str,
    identity: &Identity,
) -> Result<(), ServiceError> {
    state
        .lifecycle()
        .teardown(room_id, &identity.user_id)
        .map(|_| ())
}
