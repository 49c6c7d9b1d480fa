use std::{sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{
    dto::{
        events::SignalKind,
        ws::{JoinRejection, ScoreUpdate},
    },
    error::ServiceError,
    services::relay_events::{
        notify_room_closed, publish_all_ready, publish_room_closed, publish_room_state,
        publish_score, publish_signal, publish_start,
    },
    state::{
        Identity,
        lifecycle::{now_millis, start_timestamp},
        relay::NotificationRelay,
        room::{JoinOutcome, LeaveOutcome, Player, ReadyToggle, Room, RoomRegistry},
    },
};

/// Result of [`RoomLifecycleController::enter`].
#[derive(Debug, Clone)]
pub enum EnterOutcome {
    /// The caller was added to the room.
    Entered(Room),
    /// The caller already was a player; the snapshot was re-broadcast.
    AlreadyInside(Room),
    /// The caller could not enter; only the caller should learn about it.
    Rejected(JoinRejection),
}

/// Drives rooms through their ready/start lifecycle and relays room traffic.
///
/// Every mutation goes through [`RoomRegistry`], which hands back an owned
/// post-state snapshot; the relay is only called once the registry released
/// the room. Stale or unauthorized actions are logged and dropped.
pub struct RoomLifecycleController {
    rooms: Arc<RoomRegistry>,
    relay: Arc<dyn NotificationRelay>,
    countdown: Duration,
}

impl RoomLifecycleController {
    /// Build a controller stamping `start_at` with the given countdown.
    pub fn new(
        rooms: Arc<RoomRegistry>,
        relay: Arc<dyn NotificationRelay>,
        countdown: Duration,
    ) -> Self {
        Self {
            rooms,
            relay,
            countdown,
        }
    }

    /// Add the caller to the room and broadcast the resulting snapshot.
    pub fn enter(&self, room_id: &str, identity: &Identity) -> EnterOutcome {
        let player = Player::new(identity.user_id.clone(), identity.name.clone());
        match self.rooms.join_room(room_id, player) {
            JoinOutcome::Joined(room) => {
                info!(room_id, user_id = %identity.user_id, players = room.players.len(), "player entered room");
                publish_room_state(self.relay.as_ref(), room.clone());
                EnterOutcome::Entered(room)
            }
            JoinOutcome::AlreadyJoined(room) => {
                debug!(room_id, user_id = %identity.user_id, "player re-entered room");
                publish_room_state(self.relay.as_ref(), room.clone());
                EnterOutcome::AlreadyInside(room)
            }
            JoinOutcome::RoomFull => {
                debug!(room_id, user_id = %identity.user_id, "room full; enter rejected");
                EnterOutcome::Rejected(JoinRejection::RoomFull)
            }
            JoinOutcome::RoomNotFound => {
                debug!(room_id, user_id = %identity.user_id, "unknown room; enter rejected");
                EnterOutcome::Rejected(JoinRejection::RoomNotFound)
            }
            JoinOutcome::NotJoinable(reason) => {
                debug!(room_id, user_id = %identity.user_id, %reason, "room already started; enter rejected");
                EnterOutcome::Rejected(JoinRejection::AlreadyStarted)
            }
        }
    }

    /// Flip the caller's ready flag. Emits the all-ready signal on the transition only.
    pub fn toggle_ready(&self, room_id: &str, user_id: &str) -> Option<Room> {
        match self.rooms.toggle_ready(room_id, user_id) {
            Ok(ReadyToggle {
                room,
                became_all_ready,
            }) => {
                publish_room_state(self.relay.as_ref(), room.clone());
                if became_all_ready {
                    info!(room_id, "every player is ready");
                    publish_all_ready(self.relay.as_ref(), room_id);
                }
                Some(room)
            }
            Err(rejection) => {
                debug!(room_id, user_id, reason = %rejection, "ready toggle dropped");
                None
            }
        }
    }

    /// Fix the start timestamp when the host asks while everyone is ready.
    ///
    /// Returns the timestamp that was stored, or `None` when the request was
    /// ignored (not host, not all ready, already started, unknown room).
    pub fn start(&self, room_id: &str, user_id: &str) -> Option<u64> {
        let start_at = start_timestamp(now_millis(), self.countdown);
        match self.rooms.start_room(room_id, user_id, start_at) {
            Ok(room) => {
                info!(room_id, user_id, start_at, "room started");
                publish_room_state(self.relay.as_ref(), room);
                publish_start(
                    self.relay.as_ref(),
                    room_id,
                    start_at,
                    self.countdown.as_millis() as u64,
                );
                Some(start_at)
            }
            Err(rejection) => {
                debug!(room_id, user_id, reason = %rejection, "start request ignored");
                None
            }
        }
    }

    /// Relay score telemetry to the room. Only the room's existence is checked.
    pub fn score(&self, room_id: &str, user_id: &str, update: ScoreUpdate) -> bool {
        if !self.rooms.contains(room_id) {
            debug!(room_id, user_id, "score for unknown room dropped");
            return false;
        }
        publish_score(self.relay.as_ref(), room_id, user_id, update);
        true
    }

    /// Forward a negotiation message from a player to the room's signalling topic.
    pub fn relay_signal(
        &self,
        kind: SignalKind,
        room_id: &str,
        user_id: &str,
        payload: serde_json::Value,
    ) -> bool {
        if !self.rooms.is_member(room_id, user_id) {
            debug!(room_id, user_id, ?kind, "signal from non-member dropped");
            return false;
        }
        publish_signal(self.relay.as_ref(), room_id, user_id, kind, payload);
        true
    }

    /// Remove the caller from the room; used for explicit leaves and disconnects alike.
    pub fn leave_or_disconnect(&self, room_id: &str, user_id: &str) -> bool {
        match self.rooms.leave_room(room_id, user_id) {
            LeaveOutcome::Left(room) => {
                info!(room_id, user_id, players = room.players.len(), "player left room");
                publish_room_state(self.relay.as_ref(), room);
                true
            }
            LeaveOutcome::RoomRemoved(_) => {
                info!(room_id, user_id, "last player left; room removed");
                publish_room_closed(self.relay.as_ref(), room_id);
                true
            }
            LeaveOutcome::NotMember | LeaveOutcome::RoomNotFound => {
                debug!(room_id, user_id, "leave for absent player ignored");
                false
            }
        }
    }

    /// Tear the room down on behalf of its host and notify the remaining players.
    pub fn teardown(&self, room_id: &str, user_id: &str) -> Result<Room, ServiceError> {
        let room = self.rooms.remove_hosted_room(room_id, user_id)?;
        info!(room_id, user_id, "room torn down by host");
        self.announce_closed(&room);
        Ok(room)
    }

    /// Tear the room down unconditionally (post-game cleanup).
    pub fn remove_room(&self, room_id: &str) -> Option<Room> {
        let room = self.rooms.remove_room(room_id)?;
        info!(room_id, "room removed");
        self.announce_closed(&room);
        Some(room)
    }

    fn announce_closed(&self, room: &Room) {
        publish_room_closed(self.relay.as_ref(), &room.id);
        for user_id in room.players.keys() {
            notify_room_closed(self.relay.as_ref(), user_id, &room.id);
        }
    }
}
