use std::sync::Arc;

use tracing::info;

use crate::{
    services::relay_events::publish_presence,
    state::{
        ConnectionId, UserId,
        presence::{PresenceRegistry, PresenceTransition},
        relay::NotificationRelay,
    },
};

/// Tracks live connections and publishes the online set on every online/offline transition.
pub struct PresenceService {
    presence: Arc<PresenceRegistry>,
    relay: Arc<dyn NotificationRelay>,
}

impl PresenceService {
    /// Wrap the registry and the relay used for announcements.
    pub fn new(presence: Arc<PresenceRegistry>, relay: Arc<dyn NotificationRelay>) -> Self {
        Self { presence, relay }
    }

    /// Record a connection; publishes when the user comes online.
    pub fn connect(&self, user_id: &str, connection_id: ConnectionId) -> PresenceTransition {
        let transition = self.presence.connect(user_id, connection_id);
        self.announce(user_id, transition);
        transition
    }

    /// Safe to call repeatedly for the same connection.
    pub fn disconnect(&self, user_id: &str, connection_id: ConnectionId) -> PresenceTransition {
        let transition = self.presence.disconnect(user_id, connection_id);
        self.announce(user_id, transition);
        transition
    }

    /// Sorted online user ids.
    pub fn online_users(&self) -> Vec<UserId> {
        self.presence.snapshot()
    }

    /// Number of online users.
    pub fn online_count(&self) -> usize {
        self.presence.online_count()
    }

    fn announce(&self, user_id: &str, transition: PresenceTransition) {
        match transition {
            PresenceTransition::Online => info!(user_id, "user online"),
            PresenceTransition::Offline => info!(user_id, "user offline"),
            PresenceTransition::Unchanged => return,
        }
        publish_presence(self.relay.as_ref(), self.presence.snapshot());
    }
}
