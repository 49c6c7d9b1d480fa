use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    ChannelId, UserId,
    battle::{BattleChannel, BattleParticipant},
};

/// Public projection of a battle participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BattleParticipantSnapshot {
    /// Participant.
    pub user_id: UserId,
    /// Transient editing flag.
    pub editing: bool,
}

/// Public projection of a battle channel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BattleSnapshot {
    /// Channel identifier.
    pub channel_id: ChannelId,
    /// Active participants sorted by user id.
    pub participants: Vec<BattleParticipantSnapshot>,
    /// Spectators sorted by user id.
    pub spectators: Vec<UserId>,
    /// Whether a round is in progress.
    pub playing: bool,
}

impl From<BattleParticipant> for BattleParticipantSnapshot {
    fn from(value: BattleParticipant) -> Self {
        Self {
            user_id: value.user_id,
            editing: value.editing,
        }
    }
}

impl From<BattleChannel> for BattleSnapshot {
    fn from(value: BattleChannel) -> Self {
        Self {
            channel_id: value.channel_id,
            participants: value.participants.into_iter().map(Into::into).collect(),
            spectators: value.spectators,
            playing: value.playing,
        }
    }
}
