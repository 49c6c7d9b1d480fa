//! Shared in-memory state: registries, relay and the controllers built on them.

/// Battle channel membership.
pub mod battle;
/// Room phase derivation and transition table.
pub mod lifecycle;
/// Live connections per user.
pub mod presence;
/// Topic-based notification fan-out.
pub mod relay;
/// Room storage and per-room mutations.
pub mod room;

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::song_catalog::SongCatalog,
    services::{
        battle_service::BattleService, lifecycle_service::RoomLifecycleController,
        presence_service::PresenceService,
    },
};

use self::{
    battle::BattleChannelRegistry,
    presence::PresenceRegistry,
    relay::{BroadcastRelay, NotificationRelay},
    room::RoomRegistry,
};

/// Shared handle handed to every handler and task.
pub type SharedState = Arc<AppState>;

/// Opaque identifier supplied by the upstream identity provider.
pub type UserId = String;
/// URL-safe room identifier.
pub type RoomId = String;
/// Battle channel identifier chosen by clients.
pub type ChannelId = String;
/// Transport-level connection identifier.
pub type ConnectionId = Uuid;
/// Song catalog identifier.
pub type SongId = u64;

/// Verified caller identity attached to every inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Display name captured at join time.
    pub name: String,
}

impl Identity {
    /// Build an identity from its id and display name.
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}

/// Central application state owning the registries and the controllers built on them.
pub struct AppState {
    config: AppConfig,
    catalog: Arc<dyn SongCatalog>,
    relay: Arc<BroadcastRelay>,
    rooms: Arc<RoomRegistry>,
    presence: Arc<PresenceRegistry>,
    battles: Arc<BattleChannelRegistry>,
    lifecycle: RoomLifecycleController,
    battle_service: BattleService,
    presence_service: PresenceService,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, catalog: Arc<dyn SongCatalog>) -> SharedState {
        let relay = Arc::new(BroadcastRelay::new(config.relay_capacity()));
        let publisher: Arc<dyn NotificationRelay> = relay.clone();
        let rooms = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceRegistry::new());
        let battles = Arc::new(BattleChannelRegistry::new());

        Arc::new(Self {
            lifecycle: RoomLifecycleController::new(
                rooms.clone(),
                publisher.clone(),
                config.start_countdown(),
            ),
            battle_service: BattleService::new(battles.clone(), publisher.clone()),
            presence_service: PresenceService::new(presence.clone(), publisher),
            config,
            catalog,
            relay,
            rooms,
            presence,
            battles,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Song metadata source used at room creation.
    pub fn catalog(&self) -> &Arc<dyn SongCatalog> {
        &self.catalog
    }

    /// In-process relay the transports subscribe to.
    pub fn relay(&self) -> &BroadcastRelay {
        &self.relay
    }

    /// Room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Presence registry.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Battle channel registry.
    pub fn battles(&self) -> &BattleChannelRegistry {
        &self.battles
    }

    /// Room lifecycle controller.
    pub fn lifecycle(&self) -> &RoomLifecycleController {
        &self.lifecycle
    }

    /// Battle channel operations.
    pub fn battle_service(&self) -> &BattleService {
        &self.battle_service
    }

    /// Presence tracking with online/offline announcements.
    pub fn presence_service(&self) -> &PresenceService {
        &self.presence_service
    }
}
