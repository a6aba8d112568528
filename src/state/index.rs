//! Ownership index: (guild, owner) -> owned temporary channels.
//!
//! Derived data only. Everything here can be rebuilt from the persisted
//! `temp_channels` section, and [`OwnershipIndex::rebuild`] is used both at
//! startup and by tests that check incremental maintenance against it.

use crate::state::ids::{ChannelId, GuildId, UserId};
use crate::store::State;
use std::collections::{BTreeSet, HashMap};

/// In-memory ownership index.
///
/// Empty owner sets are removed eagerly so two indexes holding the same
/// memberships always compare equal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OwnershipIndex {
    by_owner: HashMap<(GuildId, UserId), BTreeSet<ChannelId>>,
    by_channel: HashMap<ChannelId, (GuildId, UserId)>,
}

impl OwnershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index from persisted records.
    pub fn from_state(state: &State) -> Self {
        let mut index = Self::new();
        index.rebuild(state);
        index
    }

    /// Clear and repopulate from the `temp_channels` section.
    pub fn rebuild(&mut self, state: &State) {
        self.by_owner.clear();
        self.by_channel.clear();
        for (guild, channels) in &state.temp_channels {
            for (channel, entry) in channels {
                self.add(*guild, entry.owner_id(), *channel);
            }
        }
    }

    /// Number of temporary channels `user` owns in `guild`.
    pub fn count(&self, guild: GuildId, user: UserId) -> usize {
        self.by_owner.get(&(guild, user)).map_or(0, BTreeSet::len)
    }

    /// Record `channel` as owned by `user`. A channel already indexed under
    /// another owner is moved, so a channel never has two memberships.
    pub fn add(&mut self, guild: GuildId, user: UserId, channel: ChannelId) {
        if let Some((old_guild, old_owner)) = self.by_channel.get(&channel).copied() {
            if (old_guild, old_owner) == (guild, user) {
                return;
            }
            self.detach(old_guild, old_owner, channel);
        }
        self.by_owner.entry((guild, user)).or_default().insert(channel);
        self.by_channel.insert(channel, (guild, user));
    }

    /// Remove `channel` from whichever owner holds it. Returns the previous
    /// owner, or `None` when the channel was not indexed in `guild`.
    pub fn remove(&mut self, guild: GuildId, channel: ChannelId) -> Option<UserId> {
        let (indexed_guild, owner) = self.by_channel.get(&channel).copied()?;
        if indexed_guild != guild {
            return None;
        }
        self.by_channel.remove(&channel);
        self.detach(guild, owner, channel);
        Some(owner)
    }

    /// Move `channel` from `old_owner` to `new_owner`. Returns false (and
    /// changes nothing) when `old_owner` does not currently hold it.
    pub fn transfer(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        old_owner: UserId,
        new_owner: UserId,
    ) -> bool {
        if self.by_channel.get(&channel) != Some(&(guild, old_owner)) {
            return false;
        }
        self.detach(guild, old_owner, channel);
        self.by_owner
            .entry((guild, new_owner))
            .or_default()
            .insert(channel);
        self.by_channel.insert(channel, (guild, new_owner));
        true
    }

    /// Channels owned by `user` in `guild`, ascending by id (creation order
    /// for snowflakes).
    pub fn owned(&self, guild: GuildId, user: UserId) -> Vec<ChannelId> {
        self.by_owner
            .get(&(guild, user))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Guild and owner of an indexed channel.
    pub fn locate(&self, channel: ChannelId) -> Option<(GuildId, UserId)> {
        self.by_channel.get(&channel).copied()
    }

    /// Total number of indexed channels.
    pub fn len(&self) -> usize {
        self.by_channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }

    fn detach(&mut self, guild: GuildId, owner: UserId, channel: ChannelId) {
        if let Some(set) = self.by_owner.get_mut(&(guild, owner)) {
            set.remove(&channel);
            if set.is_empty() {
                self.by_owner.remove(&(guild, owner));
            }
        }
    }
}
