use serde::{Deserialize, Serialize};

use crate::state::{SongId, room::SongInfo};

/// Song record exposed by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    /// Stable catalog identifier.
    pub id: SongId,
    /// Song title.
    pub title: String,
    /// Difficulty label shown in lobbies (e.g. "hard").
    pub difficulty: String,
    /// Track length in seconds.
    pub length_seconds: u32,
    /// URL or asset key of the cover artwork.
    pub cover: String,
}

impl From<SongEntity> for SongInfo {
    fn from(value: SongEntity) -> Self {
        Self {
            song_id: value.id,
            title: value.title,
            difficulty: value.difficulty,
            length_seconds: value.length_seconds,
            cover: value.cover,
        }
    }
}
