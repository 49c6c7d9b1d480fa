use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{format_system_time, phase::VisibleRoomPhase, validation::validate_not_blank},
    state::{
        RoomId, SongId, UserId,
        room::{Player, Room, SongInfo},
    },
};

/// Longest accepted room name, in characters.
const MAX_ROOM_NAME_CHARS: usize = 64;

/// Payload used to open a new multiplayer room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Catalog identifier of the song to play.
    pub song_id: SongId,
    pub room_name: String,
    #[serde(default)]
    pub is_private: bool,
    /// Capacity of the room; the configured default applies when omitted.
    /// The upper bound comes from configuration and is checked by the service.
    #[serde(default)]
    pub max_players: Option<usize>,
}

impl Validate for CreateRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.room_name) {
            errors.add("room_name", e);
        } else if self.room_name.chars().count() > MAX_ROOM_NAME_CHARS {
            let mut err = ValidationError::new("room_name_length");
            err.message =
                Some(format!("Room name must be at most {MAX_ROOM_NAME_CHARS} characters").into());
            errors.add("room_name", err);
        }

        if let Some(max_players) = self.max_players {
            if max_players < 2 {
                let mut err = ValidationError::new("max_players_range");
                err.message = Some("A room needs room for at least 2 players".into());
                errors.add("max_players", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Song metadata embedded in room snapshots.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongSnapshot {
    /// Catalog identifier.
    pub song_id: SongId,
    /// Display title.
    pub title: String,
    /// Difficulty label.
    pub difficulty: String,
    /// Track length in seconds.
    pub length_seconds: u32,
    /// Cover art reference.
    pub cover: String,
}

/// Player entry embedded in room snapshots.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSnapshot {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Whether the player toggled ready.
    pub ready: bool,
}

/// Full room state broadcast after every room mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub id: RoomId,
    /// Room name chosen by the host.
    pub name: String,
    /// Resolved host, never reassigned.
    pub host_id: Option<UserId>,
    /// Song copied from the catalog at creation.
    pub song: SongSnapshot,
    /// Capacity.
    pub max_players: usize,
    /// Hidden from the public listing when set.
    pub is_private: bool,
    /// Lifecycle phase derived from the room data.
    pub phase: VisibleRoomPhase,
    /// Non-empty and every player ready.
    pub all_ready: bool,
    /// Milliseconds since the Unix epoch at which the game begins, once started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u64>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Players in join order.
    pub players: Vec<PlayerSnapshot>,
}

/// Discoverable rooms.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListResponse {
    /// Non-private rooms.
    pub rooms: Vec<RoomSnapshot>,
}

impl From<SongInfo> for SongSnapshot {
    fn from(song: SongInfo) -> Self {
        Self {
            song_id: song.song_id,
            title: song.title,
            difficulty: song.difficulty,
            length_seconds: song.length_seconds,
            cover: song.cover,
        }
    }
}

impl From<Player> for PlayerSnapshot {
    fn from(player: Player) -> Self {
        Self {
            user_id: player.user_id,
            name: player.name,
            ready: player.ready,
        }
    }
}

impl From<Room> for RoomSnapshot {
    fn from(room: Room) -> Self {
        let phase = room.phase().into();
        let all_ready = room.is_all_ready();

        Self {
            id: room.id,
            name: room.name,
            host_id: room.host,
            song: room.song.into(),
            max_players: room.max_players,
            is_private: room.is_private,
            phase,
            all_ready,
            start_at: room.start_at,
            created_at: format_system_time(room.created_at),
            players: room.players.into_values().map(Into::into).collect(),
        }
    }
}
