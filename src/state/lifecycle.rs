use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::state::room::Room;

/// Default delay between the host's start and the synchronized game begin.
pub const DEFAULT_START_COUNTDOWN: Duration = Duration::from_millis(3_000);

/// Phases a room goes through, derived from its players and start timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Players are joining; nobody declared ready yet.
    Forming,
    /// At least one player is ready, but not all of them.
    ReadyCheck,
    /// Every current player is ready; the host may start.
    AllReady,
    /// Start timestamp fixed, countdown running on the clients.
    Starting,
    /// Countdown elapsed; clients are playing and only relay scores.
    InProgress,
}

/// Actions a player can attempt on a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    /// Join (or re-join) the room.
    Enter,
    /// Flip the caller's ready flag.
    ToggleReady,
    /// Fix the start timestamp.
    Start,
    /// Relay score telemetry.
    Score,
    /// Leave the room, explicitly or through a disconnect.
    Leave,
}

/// Error returned when an action is not allowed in the room's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {action:?} cannot be applied while in {phase:?}")]
pub struct InvalidTransition {
    /// Phase the room was in when the action was attempted.
    pub phase: RoomPhase,
    /// The rejected action.
    pub action: RoomAction,
}

impl RoomPhase {
    /// Derive the phase of `room` at `now_ms` (milliseconds since the Unix epoch).
    pub fn of(room: &Room, now_ms: u64) -> Self {
        match room.start_at {
            Some(start_at) if now_ms >= start_at => RoomPhase::InProgress,
            Some(_) => RoomPhase::Starting,
            None if room.is_all_ready() => RoomPhase::AllReady,
            None if room.players.values().any(|player| player.ready) => RoomPhase::ReadyCheck,
            None => RoomPhase::Forming,
        }
    }

    /// Whether the start timestamp has been fixed.
    pub fn is_started(self) -> bool {
        matches!(self, RoomPhase::Starting | RoomPhase::InProgress)
    }

    /// Check that `action` can be applied from this phase.
    pub fn permits(self, action: RoomAction) -> Result<(), InvalidTransition> {
        let allowed = match (self, action) {
            (_, RoomAction::Score | RoomAction::Leave) => true,
            (phase, RoomAction::Enter | RoomAction::ToggleReady) => !phase.is_started(),
            (RoomPhase::AllReady, RoomAction::Start) => true,
            (_, RoomAction::Start) => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                phase: self,
                action,
            })
        }
    }
}

/// Milliseconds elapsed since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Timestamp at which clients begin playing once the host started at `now_ms`.
pub fn start_timestamp(now_ms: u64, countdown: Duration) -> u64 {
    now_ms.saturating_add(countdown.as_millis() as u64)
}
