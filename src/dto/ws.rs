use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    dto::events::SignalKind,
    state::{ChannelId, ConnectionId, RoomId},
};

#[derive(Debug, Deserialize, ToSchema)]
/// Messages accepted from websocket clients.
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Join a room and start listening to its topics.
    #[serde(rename = "enter")]
    Enter {
        /// Target room.
        room_id: RoomId,
    },
    /// Toggle the sender's ready flag.
    #[serde(rename = "ready")]
    Ready {
        /// Target room.
        room_id: RoomId,
    },
    /// Host request to start the room.
    #[serde(rename = "start")]
    Start {
        /// Target room.
        room_id: RoomId,
    },
    /// Live score telemetry.
    #[serde(rename = "score")]
    Score {
        /// Target room.
        room_id: RoomId,
        /// Current score.
        score: i64,
        /// Current combo.
        combo: u32,
        /// Best combo so far.
        max_combo: u32,
    },
    /// Peer-connection offer.
    #[serde(rename = "rtc.offer")]
    RtcOffer {
        /// Target room.
        room_id: RoomId,
        /// Opaque negotiation payload.
        #[schema(value_type = Object)]
        payload: serde_json::Value,
    },
    /// Peer-connection answer.
    #[serde(rename = "rtc.answer")]
    RtcAnswer {
        /// Target room.
        room_id: RoomId,
        /// Opaque negotiation payload.
        #[schema(value_type = Object)]
        payload: serde_json::Value,
    },
    /// ICE candidate.
    #[serde(rename = "rtc.candidate")]
    RtcCandidate {
        /// Target room.
        room_id: RoomId,
        /// Opaque negotiation payload.
        #[schema(value_type = Object)]
        payload: serde_json::Value,
    },
    /// Leave a room explicitly.
    #[serde(rename = "leave")]
    Leave {
        /// Target room.
        room_id: RoomId,
    },
    /// Take a participant seat in a battle channel.
    #[serde(rename = "battle.join")]
    BattleJoin {
        /// Target channel.
        channel_id: ChannelId,
    },
    /// Give up a participant seat.
    #[serde(rename = "battle.leave")]
    BattleLeave {
        /// Target channel.
        channel_id: ChannelId,
    },
    /// Watch a battle channel.
    #[serde(rename = "battle.spectate")]
    BattleSpectate {
        /// Target channel.
        channel_id: ChannelId,
    },
    /// Stop watching a battle channel.
    #[serde(rename = "battle.unspectate")]
    BattleUnspectate {
        /// Target channel.
        channel_id: ChannelId,
    },
    /// Set the sender's editing flag.
    #[serde(rename = "battle.editing")]
    BattleEditing {
        /// Target channel.
        channel_id: ChannelId,
        /// New flag value.
        editing: bool,
    },
    /// Set the channel's playing flag.
    #[serde(rename = "battle.playing")]
    BattlePlaying {
        /// Target channel.
        channel_id: ChannelId,
        /// New flag value.
        playing: bool,
    },
    /// Any `type` not listed above.
    #[serde(other)]
    Unknown,
}

/// Score/combo telemetry reported by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    /// Current score.
    pub score: i64,
    /// Current combo.
    pub combo: u32,
    /// Best combo so far.
    pub max_combo: u32,
}

/// Battle channel operation requested by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleCommand {
    /// Take a participant seat.
    Join,
    /// Give up a participant seat.
    Leave,
    /// Start watching.
    Spectate,
    /// Stop watching.
    Unspectate,
    /// Set the caller's editing flag.
    Editing(bool),
    /// Set the channel's playing flag.
    Playing(bool),
}

/// Strongly typed inbound event handed to the controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Join a room.
    Enter {
        /// Target room.
        room_id: RoomId,
    },
    /// Toggle the caller's ready flag.
    Ready {
        /// Target room.
        room_id: RoomId,
    },
    /// Start the room (host only).
    Start {
        /// Target room.
        room_id: RoomId,
    },
    /// Relay score telemetry.
    Score {
        /// Target room.
        room_id: RoomId,
        /// Reported values.
        update: ScoreUpdate,
    },
    /// Forward a negotiation message, whatever its kind.
    RtcSignal {
        /// Offer, answer or candidate.
        kind: SignalKind,
        /// Target room.
        room_id: RoomId,
        /// Opaque negotiation payload.
        payload: serde_json::Value,
    },
    /// Leave a room.
    Leave {
        /// Target room.
        room_id: RoomId,
    },
    /// Battle channel operation.
    Battle {
        /// Target channel.
        channel_id: ChannelId,
        /// Requested operation.
        command: BattleCommand,
    },
    /// Raised by the transport when a connection goes away.
    Disconnect {
        /// Closing connection.
        connection_id: ConnectionId,
        /// Rooms the connection had entered and not left.
        rooms: Vec<RoomId>,
    },
}

/// Reasons an inbound frame could not be turned into an [`InboundEvent`].
#[derive(Debug, Error)]
pub enum InboundError {
    /// Not JSON, or missing fields for its type.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The `type` tag is not a known message.
    #[error("unknown message type")]
    UnknownType,
}

impl InboundEvent {
    /// Decode a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        serde_json::from_str::<InboundMessage>(text)?.try_into()
    }
}

impl TryFrom<InboundMessage> for InboundEvent {
    type Error = InboundError;

    fn try_from(message: InboundMessage) -> Result<Self, Self::Error> {
        let battle = |channel_id, command| InboundEvent::Battle {
            channel_id,
            command,
        };

        let event = match message {
            InboundMessage::Enter { room_id } => InboundEvent::Enter { room_id },
            InboundMessage::Ready { room_id } => InboundEvent::Ready { room_id },
            InboundMessage::Start { room_id } => InboundEvent::Start { room_id },
            InboundMessage::Score {
                room_id,
                score,
                combo,
                max_combo,
            } => InboundEvent::Score {
                room_id,
                update: ScoreUpdate {
                    score,
                    combo,
                    max_combo,
                },
            },
            InboundMessage::RtcOffer { room_id, payload } => InboundEvent::RtcSignal {
                kind: SignalKind::Offer,
                room_id,
                payload,
            },
            InboundMessage::RtcAnswer { room_id, payload } => InboundEvent::RtcSignal {
                kind: SignalKind::Answer,
                room_id,
                payload,
            },
            InboundMessage::RtcCandidate { room_id, payload } => InboundEvent::RtcSignal {
                kind: SignalKind::Candidate,
                room_id,
                payload,
            },
            InboundMessage::Leave { room_id } => InboundEvent::Leave { room_id },
            InboundMessage::BattleJoin { channel_id } => battle(channel_id, BattleCommand::Join),
            InboundMessage::BattleLeave { channel_id } => battle(channel_id, BattleCommand::Leave),
            InboundMessage::BattleSpectate { channel_id } => {
                battle(channel_id, BattleCommand::Spectate)
            }
            InboundMessage::BattleUnspectate { channel_id } => {
                battle(channel_id, BattleCommand::Unspectate)
            }
            InboundMessage::BattleEditing {
                channel_id,
                editing,
            } => battle(channel_id, BattleCommand::Editing(editing)),
            InboundMessage::BattlePlaying {
                channel_id,
                playing,
            } => battle(channel_id, BattleCommand::Playing(playing)),
            InboundMessage::Unknown => return Err(InboundError::UnknownType),
        };

        Ok(event)
    }
}

/// Why a room join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JoinRejection {
    /// The room is at capacity.
    RoomFull,
    /// No room with that id.
    RoomNotFound,
    /// The host already started the room.
    AlreadyStarted,
}

/// Frames sent only to the connection that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectReply {
    /// The `enter` request could not be honoured.
    JoinRejected {
        room_id: RoomId,
        reason: JoinRejection,
    },
    /// The frame could not be decoded.
    InvalidMessage { message: String },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_room_events() {
        assert_eq!(
            InboundEvent::from_json_str(r#"{"type":"enter","room_id":"abcd1234"}"#).unwrap(),
            InboundEvent::Enter {
                room_id: "abcd1234".into()
            }
        );
        assert_eq!(
            InboundEvent::from_json_str(
                r#"{"type":"score","room_id":"r","score":100,"combo":5,"max_combo":9}"#
            )
            .unwrap(),
            InboundEvent::Score {
                room_id: "r".into(),
                update: ScoreUpdate {
                    score: 100,
                    combo: 5,
                    max_combo: 9
                }
            }
        );
    }

    #[test]
    fn rtc_frames_collapse_into_one_signal_variant() {
        let event = InboundEvent::from_json_str(
            r#"{"type":"rtc.candidate","room_id":"r","payload":{"candidate":"a=1"}}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            InboundEvent::RtcSignal {
                kind: SignalKind::Candidate,
                room_id: "r".into(),
                payload: json!({ "candidate": "a=1" }),
            }
        );
    }

    #[test]
    fn decodes_battle_commands() {
        assert_eq!(
            InboundEvent::from_json_str(
                r#"{"type":"battle.editing","channel_id":"c1","editing":true}"#
            )
            .unwrap(),
            InboundEvent::Battle {
                channel_id: "c1".into(),
                command: BattleCommand::Editing(true)
            }
        );
    }

    #[test]
    fn unknown_and_malformed_frames_are_errors() {
        assert!(matches!(
            InboundEvent::from_json_str(r#"{"type":"dance","room_id":"r"}"#),
            Err(InboundError::UnknownType)
        ));
        assert!(matches!(
            InboundEvent::from_json_str(r#"{"type":"enter"}"#),
            Err(InboundError::Malformed(_))
        ));
        assert!(matches!(
            InboundEvent::from_json_str("not json"),
            Err(InboundError::Malformed(_))
        ));
    }

    #[test]
    fn direct_replies_are_tagged() {
        let reply = DirectReply::JoinRejected {
            room_id: "r".into(),
            reason: JoinRejection::RoomFull,
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({ "type": "join_rejected", "room_id": "r", "reason": "room_full" })
        );
    }
}
