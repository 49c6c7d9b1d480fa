use serde::Serialize;
use utoipa::ToSchema;

use crate::state::lifecycle::RoomPhase;

/// Room phase exposed to clients (REST/relay).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// Players are joining.
    Forming,
    /// Some players are ready.
    ReadyCheck,
    /// Every player is ready; waiting for the host.
    AllReady,
    /// Countdown running.
    Starting,
    /// Clients are playing.
    InProgress,
}

impl From<RoomPhase> for VisibleRoomPhase {
    fn from(value: RoomPhase) -> Self {
        match value {
            RoomPhase::Forming => VisibleRoomPhase::Forming,
            RoomPhase::ReadyCheck => VisibleRoomPhase::ReadyCheck,
            RoomPhase::AllReady => VisibleRoomPhase::AllReady,
            RoomPhase::Starting => VisibleRoomPhase::Starting,
            RoomPhase::InProgress => VisibleRoomPhase::InProgress,
        }
    }
}
