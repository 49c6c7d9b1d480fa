//! Service helpers that expose read-only projections of rooms, presence and battles.

use crate::{
    dto::{
        battle::BattleSnapshot,
        presence::PresenceSnapshot,
        room::{RoomListResponse, RoomSnapshot},
    },
    error::ServiceError,
    state::SharedState,
};

/// Return the discoverable rooms, oldest first. Private rooms are omitted.
pub fn list_rooms(state: &SharedState) -> RoomListResponse {
    let rooms = state
        .rooms()
        .list_rooms()
        .into_iter()
        .filter(|room| !room.is_private)
        .map(RoomSnapshot::from)
        .collect();
    RoomListResponse { rooms }
}

/// Return one room, private or not, by id.
pub fn get_room(state: &SharedState, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
    state
        .rooms()
        .get_room(room_id)
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))
}

/// Return the users currently online.
pub fn online_users(state: &SharedState) -> PresenceSnapshot {
    state.presence_service().online_users().into()
}

/// Return the current state of a battle channel; unknown channels are empty.
pub fn get_battle(state: &SharedState, channel_id: &str) -> BattleSnapshot {
    state.battle_service().snapshot(channel_id).into()
}
