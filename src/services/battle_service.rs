use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    dto::ws::BattleCommand,
    services::relay_events::publish_battle_state,
    state::{
        ChannelId,
        battle::{BattleChannel, BattleChannelRegistry},
        relay::NotificationRelay,
    },
};

/// Battle channel operations that publish a snapshot after each change.
pub struct BattleService {
    battles: Arc<BattleChannelRegistry>,
    relay: Arc<dyn NotificationRelay>,
}

impl BattleService {
    /// Wrap the registry and the relay used for snapshots.
    pub fn new(battles: Arc<BattleChannelRegistry>, relay: Arc<dyn NotificationRelay>) -> Self {
        Self { battles, relay }
    }

    /// Apply one command issued by `user_id`. Returns whether the channel changed.
    pub fn apply(&self, channel_id: &str, user_id: &str, command: BattleCommand) -> bool {
        match command {
            BattleCommand::Join => self.join(channel_id, user_id),
            BattleCommand::Leave => self.leave(channel_id, user_id),
            BattleCommand::Spectate => self.spectate(channel_id, user_id),
            BattleCommand::Unspectate => self.unspectate(channel_id, user_id),
            BattleCommand::Editing(editing) => self.set_editing(channel_id, user_id, editing),
            BattleCommand::Playing(playing) => self.set_playing(channel_id, user_id, playing),
        }
    }

    /// Take a participant seat.
    pub fn join(&self, channel_id: &str, user_id: &str) -> bool {
        let changed = self.battles.add_participant(channel_id, user_id);
        if changed {
            info!(channel_id, user_id, "participant joined battle");
        }
        self.publish_if(changed, channel_id)
    }

    /// Give up a participant seat; an emptied channel stops playing.
    pub fn leave(&self, channel_id: &str, user_id: &str) -> bool {
        let changed = self.battles.remove_participant(channel_id, user_id);
        if changed {
            info!(channel_id, user_id, "participant left battle");
            self.clear_playing_if_pruned(channel_id);
        }
        self.publish_if(changed, channel_id)
    }

    /// Start watching a channel.
    pub fn spectate(&self, channel_id: &str, user_id: &str) -> bool {
        let changed = self.battles.add_spectator(channel_id, user_id);
        self.publish_if(changed, channel_id)
    }

    /// Stop watching a channel.
    pub fn unspectate(&self, channel_id: &str, user_id: &str) -> bool {
        let changed = self.battles.remove_spectator(channel_id, user_id);
        if changed {
            self.clear_playing_if_pruned(channel_id);
        }
        self.publish_if(changed, channel_id)
    }

    /// Set a participant's editing flag.
    pub fn set_editing(&self, channel_id: &str, user_id: &str, editing: bool) -> bool {
        let changed = self.battles.set_editing(channel_id, user_id, editing);
        if !changed {
            debug!(channel_id, user_id, "editing flag from non-participant ignored");
        }
        self.publish_if(changed, channel_id)
    }

    /// Only participants may flip the playing flag.
    pub fn set_playing(&self, channel_id: &str, user_id: &str, playing: bool) -> bool {
        if !self.battles.is_participant(channel_id, user_id) {
            debug!(channel_id, user_id, "playing flag from non-participant ignored");
            return false;
        }
        let changed = self.battles.set_playing(channel_id, playing);
        self.publish_if(changed, channel_id)
    }

    /// Remove the user from every channel and publish each affected one.
    pub fn disconnect(&self, user_id: &str) -> Vec<ChannelId> {
        let mut affected = self.battles.remove_participant_from_all_channels(user_id);
        affected.extend(self.battles.remove_spectator_from_all_channels(user_id));
        affected.sort_unstable();
        affected.dedup();

        for channel_id in &affected {
            self.clear_playing_if_pruned(channel_id);
            publish_battle_state(self.relay.as_ref(), self.battles.snapshot(channel_id));
        }
        if !affected.is_empty() {
            debug!(user_id, channels = affected.len(), "battle memberships cleaned up");
        }
        affected
    }

    /// Current state of a channel.
    pub fn snapshot(&self, channel_id: &str) -> BattleChannel {
        self.battles.snapshot(channel_id)
    }

    fn clear_playing_if_pruned(&self, channel_id: &str) {
        if !self.battles.contains_channel(channel_id) && self.battles.set_playing(channel_id, false)
        {
            debug!(channel_id, "playing flag cleared on empty channel");
        }
    }

    fn publish_if(&self, changed: bool, channel_id: &str) -> bool {
        if changed {
            publish_battle_state(self.relay.as_ref(), self.battles.snapshot(channel_id));
        }
        changed
    }
}
