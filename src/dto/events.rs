//! Records pushed through the notification relay.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{RoomId, UserId};

#[derive(Clone, Debug, Serialize)]
/// Named payload carried across the relay.
pub struct ServerEvent {
    /// Event name (e.g. `room.state`).
    pub event: String,
    /// JSON payload.
    pub data: serde_json::Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<String>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted once when every player of a room became ready.
pub struct AllReadyEvent {
    /// Room whose players are all ready.
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted once when the host started the room.
pub struct StartEvent {
    /// Started room.
    pub room_id: RoomId,
    /// Milliseconds since the Unix epoch at which clients begin playing.
    pub start_at: u64,
    /// Delay between the start request and `start_at`.
    pub countdown_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Live score telemetry relayed to the room.
pub struct ScoreEvent {
    /// Room the score belongs to.
    pub room_id: RoomId,
    /// Reporting player.
    pub user_id: UserId,
    /// Current score.
    pub score: i64,
    /// Current combo.
    pub combo: u32,
    /// Best combo so far.
    pub max_combo: u32,
}

/// Kind of peer-connection negotiation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    Candidate,
}

#[derive(Debug, Serialize, ToSchema)]
/// Opaque signalling payload forwarded to the room, tagged with its sender.
pub struct SignalEvent {
    /// Signalling room.
    pub room_id: RoomId,
    /// Sender.
    pub from: UserId,
    /// Negotiation step.
    pub kind: SignalKind,
    /// Forwarded untouched.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted when a room is torn down.
pub struct RoomClosedEvent {
    /// Removed room.
    pub room_id: RoomId,
}
