//! Routes decoded inbound events of one connection to the controllers.
//!
//! A connection keeps the rooms it entered and the topics it listens to. Topic
//! subscriptions are shared with the task forwarding relay envelopes to the
//! socket, so they live behind an `Arc<DashSet>`.

use std::sync::Arc;

use dashmap::DashSet;
use indexmap::IndexSet;
use tracing::{debug, info};

use crate::{
    dto::ws::{BattleCommand, DirectReply, InboundEvent},
    services::lifecycle_service::EnterOutcome,
    state::{
        ConnectionId, Identity, RoomId, SharedState, presence::PresenceTransition, relay::Topic,
    },
};

/// Per-connection bookkeeping owned by the transport loop.
pub struct ConnectionContext {
    connection_id: ConnectionId,
    identity: Identity,
    rooms: IndexSet<RoomId>,
    subscriptions: Arc<DashSet<Topic>>,
}

impl ConnectionContext {
    /// Fresh context listening to the presence topic and the user's direct topic.
    pub fn new(connection_id: ConnectionId, identity: Identity) -> Self {
        let subscriptions = DashSet::new();
        subscriptions.insert(Topic::Presence);
        subscriptions.insert(Topic::UserNotify(identity.user_id.clone()));
        Self {
            connection_id,
            identity,
            rooms: IndexSet::new(),
            subscriptions: Arc::new(subscriptions),
        }
    }

    /// Transport-level id of this connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Identity resolved when the connection was opened.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Rooms entered through this connection and not left yet, in entry order.
    pub fn rooms(&self) -> Vec<RoomId> {
        self.rooms.iter().cloned().collect()
    }

    /// Topic filter shared with the outbound forwarder.
    pub fn subscriptions(&self) -> Arc<DashSet<Topic>> {
        self.subscriptions.clone()
    }

    /// The event the transport raises when this connection goes away.
    pub fn disconnect_event(&self) -> InboundEvent {
        InboundEvent::Disconnect {
            connection_id: self.connection_id,
            rooms: self.rooms(),
        }
    }

    fn subscribe_room(&self, room_id: &str) {
        for topic in Topic::room_topics(room_id) {
            self.subscriptions.insert(topic);
        }
    }

    fn unsubscribe_room(&self, room_id: &str) {
        for topic in Topic::room_topics(room_id) {
            self.subscriptions.remove(&topic);
        }
    }
}

/// Apply one inbound event on behalf of the connection.
///
/// Returns a reply meant for this connection only, when there is one.
pub fn dispatch(
    state: &SharedState,
    context: &mut ConnectionContext,
    event: InboundEvent,
) -> Option<DirectReply> {
    let user_id = context.identity.user_id.clone();

    let reply = match event {
        InboundEvent::Enter { room_id } => {
            // Subscribe first so the snapshot triggered by our own join reaches us.
            context.subscribe_room(&room_id);
            match state.lifecycle().enter(&room_id, &context.identity) {
                EnterOutcome::Entered(_) | EnterOutcome::AlreadyInside(_) => {
                    context.rooms.insert(room_id);
                    None
                }
                EnterOutcome::Rejected(reason) => {
                    if !context.rooms.contains(&room_id) {
                        context.unsubscribe_room(&room_id);
                    }
                    Some(DirectReply::JoinRejected { room_id, reason })
                }
            }
        }
        InboundEvent::Ready { room_id } => {
            state.lifecycle().toggle_ready(&room_id, &user_id);
            None
        }
        InboundEvent::Start { room_id } => {
            state.lifecycle().start(&room_id, &user_id);
            None
        }
        InboundEvent::Score { room_id, update } => {
            state.lifecycle().score(&room_id, &user_id, update);
            None
        }
        InboundEvent::RtcSignal {
            kind,
            room_id,
            payload,
        } => {
            state
                .lifecycle()
                .relay_signal(kind, &room_id, &user_id, payload);
            None
        }
        InboundEvent::Leave { room_id } => {
            state.lifecycle().leave_or_disconnect(&room_id, &user_id);
            context.rooms.shift_remove(&room_id);
            context.unsubscribe_room(&room_id);
            None
        }
        InboundEvent::Battle {
            channel_id,
            command,
        } => {
            let topic = Topic::Battle(channel_id.clone());
            if matches!(command, BattleCommand::Join | BattleCommand::Spectate) {
                context.subscriptions.insert(topic.clone());
            }
            state.battle_service().apply(&channel_id, &user_id, command);
            if matches!(command, BattleCommand::Leave | BattleCommand::Unspectate)
                && !state.battles().is_participant(&channel_id, &user_id)
                && !state.battles().is_spectator(&channel_id, &user_id)
            {
                context.subscriptions.remove(&topic);
            }
            None
        }
        InboundEvent::Disconnect {
            connection_id,
            rooms,
        } => {
            for room_id in &rooms {
                state.lifecycle().leave_or_disconnect(room_id, &user_id);
            }
            let transition = state
                .presence_service()
                .disconnect(&user_id, connection_id);
            // Battle seats are per user; only the last connection releases them.
            if transition == PresenceTransition::Offline {
                state.battle_service().disconnect(&user_id);
            }
            context.rooms.clear();
            context.subscriptions.clear();
            info!(%connection_id, user_id = %user_id, rooms = rooms.len(), "connection cleaned up");
            None
        }
    };

    if let Some(reply) = &reply {
        debug!(user_id = %user_id, ?reply, "direct reply");
    }
    reply
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::song_catalog::InMemorySongCatalog,
        dto::ws::{JoinRejection, ScoreUpdate},
        state::{
            AppState,
            room::{Player, RoomSpec},
        },
    };

    fn app_state() -> SharedState {
        let config = AppConfig::default();
        let catalog = Arc::new(InMemorySongCatalog::from_config(&config));
        AppState::new(config, catalog)
    }

    fn open_room(state: &SharedState, host: &str, max_players: usize) -> RoomId {
        let spec = RoomSpec {
            name: "duel".into(),
            song: state.config().songs()[0].clone().into(),
            max_players,
            is_private: false,
        };
        state
            .rooms()
            .create_room(spec, Player::new(host, host))
            .unwrap()
            .id
    }

    fn connect(state: &SharedState, user_id: &str) -> ConnectionContext {
        let context = ConnectionContext::new(Uuid::new_v4(), Identity::new(user_id, user_id));
        state
            .presence_service()
            .connect(user_id, context.connection_id());
        context
    }

    #[test]
    fn entering_subscribes_to_room_topics() {
        let state = app_state();
        let room_id = open_room(&state, "H", 2);
        let mut guest = connect(&state, "J");

        let reply = dispatch(
            &state,
            &mut guest,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );

        assert!(reply.is_none());
        assert_eq!(guest.rooms(), vec![room_id.clone()]);
        assert!(guest.subscriptions().contains(&Topic::RoomStart(room_id.clone())));
        assert!(guest.subscriptions().contains(&Topic::Presence));
    }

    #[test]
    fn rejected_enter_replies_to_caller_only() {
        let state = app_state();
        let room_id = open_room(&state, "H", 2);
        let mut guest = connect(&state, "J");
        let mut late = connect(&state, "K");
        dispatch(
            &state,
            &mut guest,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );

        let reply = dispatch(
            &state,
            &mut late,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );

        assert_eq!(
            reply,
            Some(DirectReply::JoinRejected {
                room_id: room_id.clone(),
                reason: JoinRejection::RoomFull
            })
        );
        assert!(late.rooms().is_empty());
        assert!(!late.subscriptions().contains(&Topic::RoomState(room_id)));
    }

    #[test]
    fn room_events_reach_the_controller() {
        let state = app_state();
        let room_id = open_room(&state, "H", 2);
        let mut host = connect(&state, "H");
        let mut guest = connect(&state, "J");
        let enter = InboundEvent::Enter {
            room_id: room_id.clone(),
        };
        dispatch(&state, &mut host, enter.clone());
        dispatch(&state, &mut guest, enter);

        for context in [&mut host, &mut guest] {
            dispatch(
                &state,
                context,
                InboundEvent::Ready {
                    room_id: room_id.clone(),
                },
            );
        }
        dispatch(
            &state,
            &mut host,
            InboundEvent::Start {
                room_id: room_id.clone(),
            },
        );
        dispatch(
            &state,
            &mut guest,
            InboundEvent::Score {
                room_id: room_id.clone(),
                update: ScoreUpdate {
                    score: 10,
                    combo: 1,
                    max_combo: 1,
                },
            },
        );

        assert!(state.rooms().get_room(&room_id).unwrap().start_at.is_some());
    }

    #[test]
    fn disconnect_runs_room_battle_and_presence_cleanup() {
        let state = app_state();
        let room_id = open_room(&state, "H", 2);
        let mut host = connect(&state, "H");
        let mut guest = connect(&state, "J");
        dispatch(
            &state,
            &mut host,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );
        dispatch(
            &state,
            &mut guest,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );
        dispatch(
            &state,
            &mut guest,
            InboundEvent::Battle {
                channel_id: "c1".into(),
                command: BattleCommand::Spectate,
            },
        );
        assert!(guest.subscriptions().contains(&Topic::Battle("c1".into())));

        let event = guest.disconnect_event();
        dispatch(&state, &mut guest, event);

        let room = state.rooms().get_room(&room_id).unwrap();
        assert!(!room.contains("J"));
        assert!(!state.battles().contains_channel("c1"));
        assert!(!state.presence().is_online("J"));
        assert!(state.presence().is_online("H"));
        assert!(guest.subscriptions().is_empty());
        assert!(guest.rooms().is_empty());
    }

    #[test]
    fn explicit_leave_drops_room_topics() {
        let state = app_state();
        let room_id = open_room(&state, "H", 3);
        let mut guest = connect(&state, "J");
        dispatch(
            &state,
            &mut guest,
            InboundEvent::Enter {
                room_id: room_id.clone(),
            },
        );

        dispatch(
            &state,
            &mut guest,
            InboundEvent::Leave {
                room_id: room_id.clone(),
            },
        );

        assert!(guest.rooms().is_empty());
        assert!(!guest.subscriptions().contains(&Topic::RoomState(room_id.clone())));
        assert!(!state.rooms().is_member(&room_id, "J"));
    }

    #[test]
    fn closing_an_idle_tab_keeps_battle_seats_of_the_other_tab() {
        let state = app_state();
        let mut playing_tab = connect(&state, "U");
        let mut idle_tab = connect(&state, "U");
        dispatch(
            &state,
            &mut playing_tab,
            InboundEvent::Battle {
                channel_id: "c1".into(),
                command: BattleCommand::Join,
            },
        );

        let event = idle_tab.disconnect_event();
        dispatch(&state, &mut idle_tab, event);

        assert!(state.presence().is_online("U"));
        assert!(state.battles().is_participant("c1", "U"));

        let event = playing_tab.disconnect_event();
        dispatch(&state, &mut playing_tab, event);

        assert!(!state.presence().is_online("U"));
        assert!(!state.battles().contains_channel("c1"));
    }
}
