//! Publish/subscribe seam between the coordination core and the transports.
//!
//! Controllers only ever see [`NotificationRelay`]; the websocket and SSE
//! transports subscribe to the in-process [`BroadcastRelay`] and filter the
//! envelopes by the topics their client listens to.

use std::fmt;

use serde::Serialize;
use serde_with::SerializeDisplay;
use tokio::sync::broadcast;

use crate::{
    dto::events::ServerEvent,
    state::{ChannelId, RoomId, UserId},
};

/// Addressable destination of a relayed message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay)]
pub enum Topic {
    /// Full room snapshots and room teardown notices.
    RoomState(RoomId),
    /// Emitted once when every player of the room became ready.
    RoomAllReady(RoomId),
    /// Carries the synchronized start timestamp.
    RoomStart(RoomId),
    /// Live score/combo telemetry.
    RoomScore(RoomId),
    /// Peer-connection negotiation messages.
    RoomSignal(RoomId),
    /// Participant/spectator snapshots of a battle channel.
    Battle(ChannelId),
    /// Global set of online users.
    Presence,
    /// Messages addressed to every connection of a single user.
    UserNotify(UserId),
}

impl Topic {
    /// Every topic a room member listens to.
    pub fn room_topics(room_id: &str) -> [Topic; 5] {
        [
            Topic::RoomState(room_id.to_string()),
            Topic::RoomAllReady(room_id.to_string()),
            Topic::RoomStart(room_id.to_string()),
            Topic::RoomScore(room_id.to_string()),
            Topic::RoomSignal(room_id.to_string()),
        ]
    }

    /// Topics exposed to read-only watchers of a room (signalling is members-only).
    pub fn room_feed_topics(room_id: &str) -> [Topic; 4] {
        [
            Topic::RoomState(room_id.to_string()),
            Topic::RoomAllReady(room_id.to_string()),
            Topic::RoomStart(room_id.to_string()),
            Topic::RoomScore(room_id.to_string()),
        ]
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::RoomState(id) => write!(f, "room/{id}/state"),
            Topic::RoomAllReady(id) => write!(f, "room/{id}/all_ready"),
            Topic::RoomStart(id) => write!(f, "room/{id}/start"),
            Topic::RoomScore(id) => write!(f, "room/{id}/score"),
            Topic::RoomSignal(id) => write!(f, "room/{id}/signal"),
            Topic::Battle(id) => write!(f, "battle/{id}"),
            Topic::Presence => f.write_str("presence"),
            Topic::UserNotify(id) => write!(f, "user/{id}"),
        }
    }
}

/// A relayed message together with its destination topic.
///
/// Serialises as `{ "topic": ..., "event": ..., "data": ... }`, which is the
/// outbound frame format of the websocket transport.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Destination topic.
    pub topic: Topic,
    /// Event name and payload.
    #[serde(flatten)]
    pub event: ServerEvent,
}

/// Transport used to push state changes to connected clients.
///
/// Implementations must not block: publishing happens after registry locks
/// are released but still on the caller's task.
pub trait NotificationRelay: Send + Sync {
    /// Fan `event` out to the current subscribers of `topic`, best effort.
    fn publish(&self, topic: Topic, event: ServerEvent);
}

/// In-process relay backed by a Tokio broadcast channel.
pub struct BroadcastRelay {
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastRelay {
    /// Construct a relay whose subscribers may lag up to `capacity` envelopes.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent envelopes on every topic.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

impl NotificationRelay for BroadcastRelay {
    fn publish(&self, topic: Topic, event: ServerEvent) {
        // No subscribers is not an error: nobody is watching that room yet.
        let _ = self.sender.send(Envelope { topic, event });
    }
}
