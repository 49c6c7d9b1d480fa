use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        battle::BattleSnapshot,
        events::{
            AllReadyEvent, RoomClosedEvent, ScoreEvent, ServerEvent, SignalEvent, SignalKind,
            StartEvent,
        },
        presence::PresenceSnapshot,
        room::RoomSnapshot,
        ws::ScoreUpdate,
    },
    state::{
        UserId,
        battle::BattleChannel,
        relay::{NotificationRelay, Topic},
        room::Room,
    },
};

/// Full room snapshot.
pub const EVENT_ROOM_STATE: &str = "room.state";
/// Room removed.
pub const EVENT_ROOM_CLOSED: &str = "room.closed";
/// Every player became ready.
pub const EVENT_ALL_READY: &str = "room.all_ready";
/// Host started the room.
pub const EVENT_START: &str = "room.start";
/// Score telemetry.
pub const EVENT_SCORE: &str = "room.score";
/// Peer-connection negotiation.
pub const EVENT_SIGNAL: &str = "rtc.signal";
/// Online user set.
pub const EVENT_PRESENCE: &str = "presence";
/// Battle channel snapshot.
pub const EVENT_BATTLE_STATE: &str = "battle.state";

/// Publish the full room snapshot on the room-state topic.
pub fn publish_room_state(relay: &dyn NotificationRelay, room: Room) {
    let topic = Topic::RoomState(room.id.clone());
    send_event(relay, topic, EVENT_ROOM_STATE, &RoomSnapshot::from(room));
}

/// Publish a teardown notice on the room-state topic.
pub fn publish_room_closed(relay: &dyn NotificationRelay, room_id: &str) {
    let payload = RoomClosedEvent {
        room_id: room_id.to_string(),
    };
    send_event(
        relay,
        Topic::RoomState(room_id.to_string()),
        EVENT_ROOM_CLOSED,
        &payload,
    );
}

/// Tell a single user, on every connection they hold, that a room was closed.
pub fn notify_room_closed(relay: &dyn NotificationRelay, user_id: &UserId, room_id: &str) {
    let payload = RoomClosedEvent {
        room_id: room_id.to_string(),
    };
    send_event(
        relay,
        Topic::UserNotify(user_id.clone()),
        EVENT_ROOM_CLOSED,
        &payload,
    );
}

/// Signal that every player of the room became ready.
pub fn publish_all_ready(relay: &dyn NotificationRelay, room_id: &str) {
    let payload = AllReadyEvent {
        room_id: room_id.to_string(),
    };
    send_event(
        relay,
        Topic::RoomAllReady(room_id.to_string()),
        EVENT_ALL_READY,
        &payload,
    );
}

/// Broadcast the synchronized start timestamp.
pub fn publish_start(relay: &dyn NotificationRelay, room_id: &str, start_at: u64, countdown_ms: u64) {
    let payload = StartEvent {
        room_id: room_id.to_string(),
        start_at,
        countdown_ms,
    };
    send_event(
        relay,
        Topic::RoomStart(room_id.to_string()),
        EVENT_START,
        &payload,
    );
}

/// Relay score telemetry of one player.
pub fn publish_score(relay: &dyn NotificationRelay, room_id: &str, user_id: &str, update: ScoreUpdate) {
    let payload = ScoreEvent {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        score: update.score,
        combo: update.combo,
        max_combo: update.max_combo,
    };
    send_event(
        relay,
        Topic::RoomScore(room_id.to_string()),
        EVENT_SCORE,
        &payload,
    );
}

/// Forward an opaque negotiation message, tagged with its sender.
pub fn publish_signal(
    relay: &dyn NotificationRelay,
    room_id: &str,
    from: &str,
    kind: SignalKind,
    payload: serde_json::Value,
) {
    let event = SignalEvent {
        room_id: room_id.to_string(),
        from: from.to_string(),
        kind,
        payload,
    };
    send_event(
        relay,
        Topic::RoomSignal(room_id.to_string()),
        EVENT_SIGNAL,
        &event,
    );
}

/// Publish the set of online users.
pub fn publish_presence(relay: &dyn NotificationRelay, online: Vec<UserId>) {
    send_event(
        relay,
        Topic::Presence,
        EVENT_PRESENCE,
        &PresenceSnapshot::from(online),
    );
}

/// Publish a battle channel snapshot on its topic.
pub fn publish_battle_state(relay: &dyn NotificationRelay, channel: BattleChannel) {
    let topic = Topic::Battle(channel.channel_id.clone());
    send_event(
        relay,
        topic,
        EVENT_BATTLE_STATE,
        &BattleSnapshot::from(channel),
    );
}

fn send_event(relay: &dyn NotificationRelay, topic: Topic, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(event, payload) {
        Ok(event) => relay.publish(topic, event),
        Err(err) => warn!(event, %topic, error = %err, "failed to serialize relay payload"),
    }
}
