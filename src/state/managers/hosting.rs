//! Hosting channel configuration.
//!
//! Hosting channels spawn temporary channels when members interact with
//! them. Their configuration lives in the same document as the temporary
//! records and goes through the same critical sections.

use super::lifecycle::LifecycleManager;
use crate::error::{LifecycleError, LifecycleResult};
use crate::state::ids::{ChannelId, ChannelKind, GuildId, UserId};
use crate::store::HostingChannelConfig;
use tracing::info;

impl LifecycleManager {
    /// Create or replace the hosting configuration for `channel`. Without an
    /// explicit category the configured default is recorded.
    pub fn setup_hosting(
        &self,
        guild: GuildId,
        channel: ChannelId,
        kind: ChannelKind,
        category: Option<ChannelId>,
        owner: UserId,
    ) -> HostingChannelConfig {
        let config = HostingChannelConfig {
            kind,
            temp_category_id: category.or(self.default_category),
            owner_id: owner,
        };
        self.mutate(|inner| {
            inner
                .state
                .hosting_channels
                .entry(guild)
                .or_default()
                .insert(channel, config.clone());
        });
        info!(guild = %guild, channel = %channel, kind = %kind, "Hosting channel configured");
        config
    }

    pub fn remove_hosting(&self, guild: GuildId, channel: ChannelId) -> LifecycleResult<()> {
        self.mutate_if(|inner| {
            let channels = inner.state.hosting_channels.get_mut(&guild)?;
            let removed = channels.remove(&channel)?;
            if channels.is_empty() {
                inner.state.hosting_channels.remove(&guild);
            }
            Some(removed)
        })
        .ok_or(LifecycleError::NotFound(channel))?;
        info!(guild = %guild, channel = %channel, "Hosting channel removed");
        Ok(())
    }

    /// Hosting channels of `guild`, by channel id.
    pub fn list_hosting(&self, guild: GuildId) -> Vec<(ChannelId, HostingChannelConfig)> {
        self.read(|inner| {
            inner
                .state
                .hosting_channels
                .get(&guild)
                .map(|channels| channels.iter().map(|(id, c)| (*id, c.clone())).collect())
                .unwrap_or_default()
        })
    }

    pub fn hosting(&self, guild: GuildId, channel: ChannelId) -> Option<HostingChannelConfig> {
        self.read(|inner| inner.state.hosting(guild, channel).cloned())
    }

    /// Hand a hosting channel to `new_owner`. Owner-only, like temporary
    /// channel transfers.
    pub fn transfer_hosting(
        &self,
        guild: GuildId,
        channel: ChannelId,
        requester: UserId,
        new_owner: UserId,
    ) -> LifecycleResult<()> {
        self.try_mutate(|inner| {
            let config = inner
                .state
                .hosting_channels
                .get_mut(&guild)
                .and_then(|channels| channels.get_mut(&channel))
                .ok_or(LifecycleError::NotFound(channel))?;
            if config.owner_id != requester {
                return Err(LifecycleError::NotAuthorized);
            }
            config.owner_id = new_owner;
            Ok(())
        })?;
        info!(guild = %guild, channel = %channel, to = %new_owner, "Hosting channel ownership transferred");
        Ok(())
    }

    /// Category for temporary channels created outside a hosting channel:
    /// the first hosting channel that names one, else the configured default.
    pub fn resolve_temporary_category(&self, guild: GuildId) -> Option<ChannelId> {
        self.read(|inner| {
            inner
                .state
                .hosting_channels
                .get(&guild)
                .and_then(|channels| channels.values().find_map(|c| c.temp_category_id))
        })
        .or(self.default_category)
    }
}
