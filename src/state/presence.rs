use std::collections::HashSet;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::state::{ConnectionId, UserId};

/// Online/offline change caused by a connect or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    /// First live connection of the user was recorded.
    Online,
    /// Last live connection of the user was removed.
    Offline,
    /// The user's online state did not change.
    Unchanged,
}

/// Tracks the live connections of every online user.
///
/// Presence is derived from the set of connections rather than a flag so a
/// user with several tabs only goes offline once the last one closes. All
/// mutations for a given user go through the map entry of that user, which
/// linearizes them without blocking other users.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live connection, reporting [`PresenceTransition::Online`] for the first one.
    pub fn connect(&self, user_id: &str, connection_id: ConnectionId) -> PresenceTransition {
        let mut connections = self.connections.entry(user_id.to_string()).or_default();
        let was_offline = connections.is_empty();
        if connections.insert(connection_id) && was_offline {
            PresenceTransition::Online
        } else {
            PresenceTransition::Unchanged
        }
    }

    /// Remove a connection, reporting [`PresenceTransition::Offline`] when it was the last one.
    ///
    /// Unknown or already removed pairs are ignored.
    pub fn disconnect(&self, user_id: &str, connection_id: ConnectionId) -> PresenceTransition {
        let Entry::Occupied(mut entry) = self.connections.entry(user_id.to_string()) else {
            return PresenceTransition::Unchanged;
        };

        if !entry.get_mut().remove(&connection_id) {
            return PresenceTransition::Unchanged;
        }

        if entry.get().is_empty() {
            entry.remove();
            PresenceTransition::Offline
        } else {
            PresenceTransition::Unchanged
        }
    }

    /// Whether the user holds at least one live connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Number of live connections held by the user.
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.connections
            .get(user_id)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    /// Number of users currently online.
    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    /// Sorted copy of the online user identifiers.
    pub fn snapshot(&self) -> Vec<UserId> {
        let mut online: Vec<UserId> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        online.sort_unstable();
        online
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use uuid::Uuid;

    use super::*;

    #[test]
    fn first_connection_goes_online_and_last_goes_offline() {
        let registry = PresenceRegistry::new();
        let (tab_a, tab_b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(registry.connect("u1", tab_a), PresenceTransition::Online);
        assert_eq!(registry.connect("u1", tab_b), PresenceTransition::Unchanged);
        assert_eq!(registry.connection_count("u1"), 2);

        assert_eq!(registry.disconnect("u1", tab_a), PresenceTransition::Unchanged);
        assert!(registry.is_online("u1"));
        assert_eq!(registry.disconnect("u1", tab_b), PresenceTransition::Offline);
        assert!(!registry.is_online("u1"));
    }

    #[test]
    fn reconnecting_the_same_connection_is_idempotent() {
        let registry = PresenceRegistry::new();
        let tab = Uuid::new_v4();

        assert_eq!(registry.connect("u1", tab), PresenceTransition::Online);
        assert_eq!(registry.connect("u1", tab), PresenceTransition::Unchanged);
        assert_eq!(registry.connection_count("u1"), 1);
    }

    #[test]
    fn unknown_or_repeated_disconnects_are_ignored() {
        let registry = PresenceRegistry::new();
        let tab = Uuid::new_v4();

        assert_eq!(
            registry.disconnect("ghost", Uuid::new_v4()),
            PresenceTransition::Unchanged
        );

        registry.connect("u1", tab);
        assert_eq!(
            registry.disconnect("u1", Uuid::new_v4()),
            PresenceTransition::Unchanged
        );
        assert_eq!(registry.disconnect("u1", tab), PresenceTransition::Offline);
        assert_eq!(registry.disconnect("u1", tab), PresenceTransition::Unchanged);
    }

    #[test]
    fn offline_is_reported_once_whatever_the_removal_order() {
        let registry = PresenceRegistry::new();
        let tabs: Vec<_> = (0..5).map(|_| Uuid::new_v4()).collect();
        for tab in &tabs {
            registry.connect("u1", *tab);
        }

        let offline = [3, 0, 4, 1, 2]
            .into_iter()
            .map(|index| registry.disconnect("u1", tabs[index]))
            .filter(|transition| *transition == PresenceTransition::Offline)
            .count();

        assert_eq!(offline, 1);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_a_sorted_copy() {
        let registry = PresenceRegistry::new();
        registry.connect("b", Uuid::new_v4());
        registry.connect("a", Uuid::new_v4());

        let snapshot = registry.snapshot();
        registry.connect("c", Uuid::new_v4());

        assert_eq!(snapshot, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.online_count(), 3);
    }

    #[test]
    fn concurrent_tabs_balance_online_and_offline_transitions() {
        let registry = PresenceRegistry::new();
        let online = AtomicUsize::new(0);
        let offline = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let tab = Uuid::new_v4();
                        if registry.connect("u1", tab) == PresenceTransition::Online {
                            online.fetch_add(1, Ordering::SeqCst);
                        }
                        if registry.disconnect("u1", tab) == PresenceTransition::Offline {
                            offline.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(online.load(Ordering::SeqCst), offline.load(Ordering::SeqCst));
        assert!(!registry.is_online("u1"));
    }
}
