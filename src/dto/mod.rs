use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Battle channel snapshots.
pub mod battle;
/// Relay event payloads.
pub mod events;
/// Health check response.
pub mod health;
/// Public room phase.
pub mod phase;
/// Online user snapshot.
pub mod presence;
/// Room requests and snapshots.
pub mod room;
/// Field validators.
pub mod validation;
/// Websocket frames.
pub mod ws;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
