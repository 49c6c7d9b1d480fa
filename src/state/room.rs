use std::time::SystemTime;

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexMap;
use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;

use crate::state::{
    RoomId, SongId, UserId,
    lifecycle::{InvalidTransition, RoomAction, RoomPhase, now_millis},
};

/// Length of generated room identifiers.
pub const ROOM_ID_LENGTH: usize = 8;
/// How many fresh identifiers `create_room` tries before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Song metadata copied into a room when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInfo {
    /// Catalog identifier of the song.
    pub song_id: SongId,
    /// Song title.
    pub title: String,
    /// Difficulty label (e.g. "hard").
    pub difficulty: String,
    /// Song duration in seconds.
    pub length_seconds: u32,
    /// Reference to the cover artwork.
    pub cover: String,
}

/// Player entry inside a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Verified user identifier.
    pub user_id: UserId,
    /// Display name captured when the player joined.
    pub name: String,
    /// Whether the player declared ready.
    pub ready: bool,
}

impl Player {
    /// Build a not-yet-ready player.
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            ready: false,
        }
    }
}

/// Parameters of a room about to be created.
#[derive(Debug, Clone)]
pub struct RoomSpec {
    /// Display name of the room.
    pub name: String,
    /// Song played in the room.
    pub song: SongInfo,
    /// Maximum number of players.
    pub max_players: usize,
    /// Private rooms are not listed publicly.
    pub is_private: bool,
}

/// Ephemeral multiplayer lobby.
#[derive(Debug, Clone)]
pub struct Room {
    /// URL-safe unique identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Host user, resolved once and never reassigned.
    pub host: Option<UserId>,
    /// Song metadata snapshot.
    pub song: SongInfo,
    /// Maximum number of players.
    pub max_players: usize,
    /// Private rooms are not listed publicly.
    pub is_private: bool,
    /// Players keyed by user id, in join order.
    pub players: IndexMap<UserId, Player>,
    /// Synchronized start timestamp (ms since epoch), set once by the host.
    pub start_at: Option<u64>,
    /// Creation time.
    pub created_at: SystemTime,
}

impl Room {
    /// Build a room whose only player is `host`.
    pub fn new(id: RoomId, spec: RoomSpec, host: Player) -> Self {
        let RoomSpec {
            name,
            song,
            max_players,
            is_private,
        } = spec;

        let mut players = IndexMap::new();
        let host_id = host.user_id.clone();
        players.insert(host_id.clone(), host);

        Self {
            id,
            name,
            host: Some(host_id),
            song,
            max_players,
            is_private,
            players,
            start_at: None,
            created_at: SystemTime::now(),
        }
    }

    /// True iff the room has players and every one of them is ready.
    pub fn is_all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|player| player.ready)
    }

    /// Whether the player list reached capacity.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Whether `user_id` currently is a player.
    pub fn contains(&self, user_id: &str) -> bool {
        self.players.contains_key(user_id)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoomPhase {
        RoomPhase::of(self, now_millis())
    }

    /// Adopt the first player as host when none was resolved yet.
    fn resolve_host(&mut self) {
        if self.host.is_none() {
            self.host = self.players.keys().next().cloned();
        }
    }
}

/// Internal invariant violations of the room registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Identifier generation kept colliding with live rooms.
    #[error("could not allocate a unique room id after {attempts} attempts")]
    IdSpaceExhausted {
        /// Number of identifiers tried.
        attempts: usize,
    },
}

/// Reasons a room operation was not applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomRejection {
    /// No live room has this id.
    #[error("room `{0}` not found")]
    RoomNotFound(RoomId),
    /// The user is not a player of the room.
    #[error("user `{user_id}` is not a player of room `{room_id}`")]
    NotMember {
        /// Room identifier.
        room_id: RoomId,
        /// User identifier.
        user_id: UserId,
    },
    /// The action is reserved to the room host.
    #[error("user `{user_id}` is not the host of room `{room_id}`")]
    NotHost {
        /// Room identifier.
        room_id: RoomId,
        /// User identifier.
        user_id: UserId,
    },
    /// The room's phase does not allow the action.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Result of [`RoomRegistry::join_room`].
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// The player was appended; carries the post-join snapshot.
    Joined(Room),
    /// The user already was a player; nothing changed.
    AlreadyJoined(Room),
    /// The room is at capacity.
    RoomFull,
    /// No live room has this id.
    RoomNotFound,
    /// The room already started and does not accept new players.
    NotJoinable(InvalidTransition),
}

/// Result of [`RoomRegistry::leave_room`].
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// The player was removed; carries the remaining room.
    Left(Room),
    /// The last player left and the room was deleted.
    RoomRemoved(Room),
    /// The user was not a player of the room.
    NotMember,
    /// No live room has this id.
    RoomNotFound,
}

/// Result of a successful ready toggle.
#[derive(Debug, Clone)]
pub struct ReadyToggle {
    /// Post-toggle snapshot.
    pub room: Room,
    /// True when this toggle made the room all-ready.
    pub became_all_ready: bool,
}

type IdGenerator = Box<dyn Fn() -> RoomId + Send + Sync>;

/// Live multiplayer rooms keyed by id.
///
/// Every mutation of a room happens while holding that room's map entry, so
/// operations on one room are linearized while other rooms stay available.
/// Methods return owned snapshots so callers publish after the lock is gone.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    generate_id: IdGenerator,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    /// Create an empty registry generating random alphanumeric identifiers.
    pub fn new() -> Self {
        Self::with_id_generator(random_room_id)
    }

    /// Create an empty registry using a custom identifier generator.
    pub fn with_id_generator<F>(generate_id: F) -> Self
    where
        F: Fn() -> RoomId + Send + Sync + 'static,
    {
        Self {
            rooms: DashMap::new(),
            generate_id: Box::new(generate_id),
        }
    }

    /// Store a new room with `host` as its first player.
    pub fn create_room(&self, spec: RoomSpec, host: Player) -> Result<Room, RegistryError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.generate_id)();
            if let Entry::Vacant(slot) = self.rooms.entry(id.clone()) {
                let room = Room::new(id, spec, host);
                slot.insert(room.clone());
                return Ok(room);
            }
        }

        Err(RegistryError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Copy of the room, if it exists.
    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|room| room.clone())
    }

    /// Whether a live room has this id.
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Whether `user_id` is a player of the room.
    pub fn is_member(&self, room_id: &str, user_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.contains(user_id))
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Point-in-time copies of every room, oldest first.
    pub fn list_rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|room| room.clone()).collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rooms
    }

    /// Append `player` unless the room is full, started, or already lists the user.
    pub fn join_room(&self, room_id: &str, player: Player) -> JoinOutcome {
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return JoinOutcome::RoomNotFound;
        };

        if room.contains(&player.user_id) {
            room.resolve_host();
            return JoinOutcome::AlreadyJoined(room.clone());
        }

        if let Err(err) = room.phase().permits(RoomAction::Enter) {
            return JoinOutcome::NotJoinable(err);
        }

        if room.is_full() {
            return JoinOutcome::RoomFull;
        }

        room.players.insert(player.user_id.clone(), player);
        room.resolve_host();
        JoinOutcome::Joined(room.clone())
    }

    /// Remove a player, deleting the room when it becomes empty.
    pub fn leave_room(&self, room_id: &str, user_id: &str) -> LeaveOutcome {
        let Entry::Occupied(mut slot) = self.rooms.entry(room_id.to_string()) else {
            return LeaveOutcome::RoomNotFound;
        };

        if slot.get_mut().players.shift_remove(user_id).is_none() {
            return LeaveOutcome::NotMember;
        }

        if slot.get().players.is_empty() {
            LeaveOutcome::RoomRemoved(slot.remove())
        } else {
            LeaveOutcome::Left(slot.get().clone())
        }
    }

    /// Flip the ready flag of one player.
    pub fn toggle_ready(&self, room_id: &str, user_id: &str) -> Result<ReadyToggle, RoomRejection> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomRejection::RoomNotFound(room_id.to_string()))?;

        room.phase().permits(RoomAction::ToggleReady)?;

        let was_all_ready = room.is_all_ready();
        let player = room
            .players
            .get_mut(user_id)
            .ok_or_else(|| RoomRejection::NotMember {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            })?;
        player.ready = !player.ready;

        Ok(ReadyToggle {
            became_all_ready: !was_all_ready && room.is_all_ready(),
            room: room.clone(),
        })
    }

    /// Fix the start timestamp when `user_id` is the host and every player is ready.
    pub fn start_room(
        &self,
        room_id: &str,
        user_id: &str,
        start_at: u64,
    ) -> Result<Room, RoomRejection> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomRejection::RoomNotFound(room_id.to_string()))?;

        if room.host.as_deref() != Some(user_id) {
            return Err(RoomRejection::NotHost {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        room.phase().permits(RoomAction::Start)?;
        room.start_at = Some(start_at);
        Ok(room.clone())
    }

    /// Tear a room down unconditionally.
    pub fn remove_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id).map(|(_, room)| room)
    }

    /// Tear a room down on behalf of its host.
    pub fn remove_hosted_room(&self, room_id: &str, user_id: &str) -> Result<Room, RoomRejection> {
        if let Some((_, room)) = self
            .rooms
            .remove_if(room_id, |_, room| room.host.as_deref() == Some(user_id))
        {
            return Ok(room);
        }

        if self.contains(room_id) {
            Err(RoomRejection::NotHost {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            })
        } else {
            Err(RoomRejection::RoomNotFound(room_id.to_string()))
        }
    }
}

/// Random URL-safe identifier of [`ROOM_ID_LENGTH`] alphanumeric characters.
pub fn random_room_id() -> RoomId {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    use super::*;

    fn spec(max_players: usize) -> RoomSpec {
        RoomSpec {
            name: "friday duel".into(),
            song: SongInfo {
                song_id: 7,
                title: "Neon Skyline".into(),
                difficulty: "hard".into(),
                length_seconds: 184,
                cover: "covers/7.png".into(),
            },
            max_players,
            is_private: false,
        }
    }

    fn create(registry: &RoomRegistry, max_players: usize) -> Room {
        registry
            .create_room(spec(max_players), Player::new("h", "Host"))
            .unwrap()
    }

    #[test]
    fn created_room_holds_only_the_host() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);

        let stored = registry.get_room(&room.id).unwrap();
        assert_eq!(stored.players.len(), 1);
        assert_eq!(stored.host.as_deref(), Some("h"));
        assert_eq!(stored.song.title, "Neon Skyline");
        assert_eq!(stored.id.len(), ROOM_ID_LENGTH);
        assert!(stored.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(stored.start_at.is_none());
    }

    #[test]
    fn colliding_ids_are_retried() {
        let ids = Mutex::new(vec!["second".to_string(), "first".into(), "first".into()]);
        let registry = RoomRegistry::with_id_generator(move || ids.lock().unwrap().pop().unwrap());

        assert_eq!(create(&registry, 2).id, "first");
        assert_eq!(create(&registry, 2).id, "second");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn exhausted_id_space_is_a_hard_error() {
        let registry = RoomRegistry::with_id_generator(|| "same".to_string());
        create(&registry, 2);

        let err = registry
            .create_room(spec(2), Player::new("x", "X"))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::IdSpaceExhausted {
                attempts: MAX_ID_ATTEMPTS
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn joining_twice_keeps_a_single_entry() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 3);

        assert!(matches!(
            registry.join_room(&room.id, Player::new("j", "Jay")),
            JoinOutcome::Joined(_)
        ));
        let JoinOutcome::AlreadyJoined(after) =
            registry.join_room(&room.id, Player::new("j", "Jay again"))
        else {
            panic!("second join should be idempotent");
        };

        assert_eq!(after.players.len(), 2);
        assert_eq!(after.players["j"].name, "Jay");
    }

    #[test]
    fn full_room_rejects_without_mutation() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);
        registry.join_room(&room.id, Player::new("j", "Jay"));

        assert!(matches!(
            registry.join_room(&room.id, Player::new("k", "Kay")),
            JoinOutcome::RoomFull
        ));
        let players: Vec<_> = registry
            .get_room(&room.id)
            .unwrap()
            .players
            .keys()
            .cloned()
            .collect();
        assert_eq!(players, vec!["h".to_string(), "j".to_string()]);
    }

    #[test]
    fn unknown_room_is_reported_not_found() {
        let registry = RoomRegistry::new();
        assert!(matches!(
            registry.join_room("missing", Player::new("j", "Jay")),
            JoinOutcome::RoomNotFound
        ));
        assert!(matches!(
            registry.leave_room("missing", "j"),
            LeaveOutcome::RoomNotFound
        ));
    }

    #[test]
    fn last_leave_removes_the_room() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);
        registry.join_room(&room.id, Player::new("j", "Jay"));

        assert!(matches!(registry.leave_room(&room.id, "h"), LeaveOutcome::Left(_)));
        assert!(matches!(
            registry.leave_room(&room.id, "h"),
            LeaveOutcome::NotMember
        ));
        assert!(matches!(
            registry.leave_room(&room.id, "j"),
            LeaveOutcome::RoomRemoved(_)
        ));
        assert!(registry.get_room(&room.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn host_is_kept_after_leaving_and_rejoining() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 3);
        registry.join_room(&room.id, Player::new("j", "Jay"));

        let LeaveOutcome::Left(after_leave) = registry.leave_room(&room.id, "h") else {
            panic!("host leave should keep the room");
        };
        assert_eq!(after_leave.host.as_deref(), Some("h"));

        let JoinOutcome::Joined(after_rejoin) =
            registry.join_room(&room.id, Player::new("h", "Host"))
        else {
            panic!("host should be able to rejoin");
        };
        assert_eq!(after_rejoin.host.as_deref(), Some("h"));
        let order: Vec<_> = after_rejoin.players.keys().cloned().collect();
        assert_eq!(order, vec!["j".to_string(), "h".to_string()]);
    }

    #[test]
    fn all_ready_follows_every_ready_flag() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);
        registry.join_room(&room.id, Player::new("j", "Jay"));

        let first = registry.toggle_ready(&room.id, "h").unwrap();
        assert!(!first.became_all_ready);
        assert!(!first.room.is_all_ready());

        let second = registry.toggle_ready(&room.id, "j").unwrap();
        assert!(second.became_all_ready);
        assert!(second.room.is_all_ready());

        let undo = registry.toggle_ready(&room.id, "j").unwrap();
        assert!(!undo.became_all_ready);
        assert!(!undo.room.is_all_ready());
    }

    #[test]
    fn ready_toggle_rejects_strangers() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);

        assert_eq!(
            registry.toggle_ready(&room.id, "ghost").unwrap_err(),
            RoomRejection::NotMember {
                room_id: room.id.clone(),
                user_id: "ghost".into()
            }
        );
        assert_eq!(
            registry.toggle_ready("missing", "h").unwrap_err(),
            RoomRejection::RoomNotFound("missing".into())
        );
    }

    #[test]
    fn start_requires_host_and_all_ready_and_happens_once() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);
        registry.join_room(&room.id, Player::new("j", "Jay"));

        assert!(matches!(
            registry.start_room(&room.id, "h", 1),
            Err(RoomRejection::InvalidTransition(_))
        ));

        registry.toggle_ready(&room.id, "h").unwrap();
        registry.toggle_ready(&room.id, "j").unwrap();

        assert!(matches!(
            registry.start_room(&room.id, "j", 1),
            Err(RoomRejection::NotHost { .. })
        ));
        assert!(registry.get_room(&room.id).unwrap().start_at.is_none());

        let far_future = u64::MAX;
        let started = registry.start_room(&room.id, "h", far_future).unwrap();
        assert_eq!(started.start_at, Some(far_future));

        assert!(matches!(
            registry.start_room(&room.id, "h", 5),
            Err(RoomRejection::InvalidTransition(InvalidTransition {
                phase: RoomPhase::Starting,
                action: RoomAction::Start,
            }))
        ));
        assert_eq!(
            registry.get_room(&room.id).unwrap().start_at,
            Some(far_future)
        );
    }

    #[test]
    fn started_room_refuses_newcomers() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 3);
        registry.toggle_ready(&room.id, "h").unwrap();
        registry.start_room(&room.id, "h", u64::MAX).unwrap();

        assert!(matches!(
            registry.join_room(&room.id, Player::new("late", "Late")),
            JoinOutcome::NotJoinable(_)
        ));
        assert!(matches!(
            registry.join_room(&room.id, Player::new("h", "Host")),
            JoinOutcome::AlreadyJoined(_)
        ));
    }

    #[test]
    fn hosted_removal_checks_the_host() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);

        assert!(matches!(
            registry.remove_hosted_room(&room.id, "j"),
            Err(RoomRejection::NotHost { .. })
        ));
        assert!(registry.remove_hosted_room(&room.id, "h").is_ok());
        assert_eq!(
            registry.remove_hosted_room(&room.id, "h").unwrap_err(),
            RoomRejection::RoomNotFound(room.id.clone())
        );
        assert!(registry.remove_room(&room.id).is_none());
    }

    #[test]
    fn listing_returns_detached_copies() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 2);

        let listed = registry.list_rooms();
        registry.join_room(&room.id, Player::new("j", "Jay"));

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].players.len(), 1);
    }

    #[test]
    fn concurrent_joins_never_exceed_capacity() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 4);
        let joined = AtomicUsize::new(0);

        thread::scope(|scope| {
            for worker in 0..16 {
                let registry = &registry;
                let joined = &joined;
                let room_id = room.id.clone();
                scope.spawn(move || {
                    let user = format!("user-{worker}");
                    if let JoinOutcome::Joined(_) =
                        registry.join_room(&room_id, Player::new(user.clone(), user))
                    {
                        joined.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(joined.load(Ordering::SeqCst), 3);
        assert_eq!(registry.get_room(&room.id).unwrap().players.len(), 4);
    }

    #[test]
    fn concurrent_leave_and_join_keep_player_list_consistent() {
        let registry = RoomRegistry::new();
        let room = create(&registry, 8);

        thread::scope(|scope| {
            for worker in 0..6 {
                let registry = &registry;
                let room_id = room.id.clone();
                scope.spawn(move || {
                    let user = format!("user-{worker}");
                    for _ in 0..100 {
                        registry.join_room(&room_id, Player::new(user.clone(), user.clone()));
                        registry.leave_room(&room_id, &user);
                    }
                });
            }
        });

        let stored = registry.get_room(&room.id).unwrap();
        let players: Vec<_> = stored.players.keys().cloned().collect();
        assert_eq!(players, vec!["h".to_string()]);
    }
}
