use std::collections::{HashMap, HashSet};

use dashmap::{DashMap, DashSet, mapref::entry::Entry};

use crate::state::{ChannelId, UserId};

/// Active participant of a battle channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleParticipant {
    /// Participant identifier.
    pub user_id: UserId,
    /// Transient "editing" flag toggled by the participant's client.
    pub editing: bool,
}

/// Point-in-time copy of a battle channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleChannel {
    /// Channel identifier.
    pub channel_id: ChannelId,
    /// Participants sorted by user id.
    pub participants: Vec<BattleParticipant>,
    /// Spectators sorted by user id.
    pub spectators: Vec<UserId>,
    /// Whether the duel is currently being played.
    pub playing: bool,
}

/// Ephemeral 1:1 duel channels keyed by channel id.
///
/// Participant and spectator memberships live in independent maps that are
/// pruned as soon as a set becomes empty. Every operation is total: absent
/// channels or users are a no-op so late disconnect cleanup never fails.
#[derive(Debug, Default)]
pub struct BattleChannelRegistry {
    participants: DashMap<ChannelId, HashMap<UserId, bool>>,
    spectators: DashMap<ChannelId, HashSet<UserId>>,
    playing: DashSet<ChannelId>,
}

impl BattleChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` as participant, creating the channel lazily. Returns false if already present.
    pub fn add_participant(&self, channel_id: &str, user_id: &str) -> bool {
        let mut participants = self.participants.entry(channel_id.to_string()).or_default();
        if participants.contains_key(user_id) {
            return false;
        }
        participants.insert(user_id.to_string(), false);
        true
    }

    /// Remove a participant, pruning the channel's participant set when it empties.
    pub fn remove_participant(&self, channel_id: &str, user_id: &str) -> bool {
        let Entry::Occupied(mut entry) = self.participants.entry(channel_id.to_string()) else {
            return false;
        };
        let removed = entry.get_mut().remove(user_id).is_some();
        if entry.get().is_empty() {
            entry.remove();
        }
        removed
    }

    /// Set the transient editing flag of a participant. Returns false if the user is not one.
    pub fn set_editing(&self, channel_id: &str, user_id: &str, editing: bool) -> bool {
        let Some(mut participants) = self.participants.get_mut(channel_id) else {
            return false;
        };
        match participants.get_mut(user_id) {
            Some(flag) => {
                *flag = editing;
                true
            }
            None => false,
        }
    }

    /// Add `user_id` as spectator, creating the channel lazily. Returns false if already present.
    pub fn add_spectator(&self, channel_id: &str, user_id: &str) -> bool {
        self.spectators
            .entry(channel_id.to_string())
            .or_default()
            .insert(user_id.to_string())
    }

    /// Remove a spectator, pruning the channel's spectator set when it empties.
    pub fn remove_spectator(&self, channel_id: &str, user_id: &str) -> bool {
        let Entry::Occupied(mut entry) = self.spectators.entry(channel_id.to_string()) else {
            return false;
        };
        let removed = entry.get_mut().remove(user_id);
        if entry.get().is_empty() {
            entry.remove();
        }
        removed
    }

    /// Remove the user from every participant set, returning the channels that changed.
    pub fn remove_participant_from_all_channels(&self, user_id: &str) -> Vec<ChannelId> {
        let mut affected = Vec::new();
        self.participants.retain(|channel_id, participants| {
            if participants.remove(user_id).is_some() {
                affected.push(channel_id.clone());
            }
            !participants.is_empty()
        });
        affected.sort_unstable();
        affected
    }

    /// Remove the user from every spectator set, returning the channels that changed.
    pub fn remove_spectator_from_all_channels(&self, user_id: &str) -> Vec<ChannelId> {
        let mut affected = Vec::new();
        self.spectators.retain(|channel_id, spectators| {
            if spectators.remove(user_id) {
                affected.push(channel_id.clone());
            }
            !spectators.is_empty()
        });
        affected.sort_unstable();
        affected
    }

    /// Mark the channel as playing or not, regardless of its membership.
    ///
    /// Returns whether the flag actually changed.
    pub fn set_playing(&self, channel_id: &str, playing: bool) -> bool {
        if playing {
            self.playing.insert(channel_id.to_string())
        } else {
            self.playing.remove(channel_id).is_some()
        }
    }

    /// Whether the channel is marked as playing; unknown channels are not.
    pub fn is_playing(&self, channel_id: &str) -> bool {
        self.playing.contains(channel_id)
    }

    /// Whether the user is an active participant of the channel.
    pub fn is_participant(&self, channel_id: &str, user_id: &str) -> bool {
        self.participants
            .get(channel_id)
            .is_some_and(|participants| participants.contains_key(user_id))
    }

    /// Whether the user is currently spectating the channel.
    pub fn is_spectator(&self, channel_id: &str, user_id: &str) -> bool {
        self.spectators
            .get(channel_id)
            .is_some_and(|spectators| spectators.contains(user_id))
    }

    /// Whether any participant or spectator entry exists for the channel.
    pub fn contains_channel(&self, channel_id: &str) -> bool {
        self.participants.contains_key(channel_id) || self.spectators.contains_key(channel_id)
    }

    /// Copy the current state of a channel. Unknown channels yield an empty snapshot.
    pub fn snapshot(&self, channel_id: &str) -> BattleChannel {
        let mut participants: Vec<BattleParticipant> = self
            .participants
            .get(channel_id)
            .map(|participants| {
                participants
                    .iter()
                    .map(|(user_id, editing)| BattleParticipant {
                        user_id: user_id.clone(),
                        editing: *editing,
                    })
                    .collect()
            })
            .unwrap_or_default();
        participants.sort_unstable_by(|a, b| a.user_id.cmp(&b.user_id));

        let mut spectators: Vec<UserId> = self
            .spectators
            .get(channel_id)
            .map(|spectators| spectators.iter().cloned().collect())
            .unwrap_or_default();
        spectators.sort_unstable();

        BattleChannel {
            channel_id: channel_id.to_string(),
            participants,
            spectators,
            playing: self.is_playing(channel_id),
        }
    }
}
