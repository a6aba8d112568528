//! Language preferences and keepalive configuration.

use super::lifecycle::LifecycleManager;
use crate::error::{LifecycleError, LifecycleResult};
use crate::i18n::{self, Lang};
use crate::state::ids::{ChannelId, GuildId, UserId};
use crate::store::KeepaliveConfig;
use tracing::info;

/// Where a language preference applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangScope {
    User(UserId),
    Channel(ChannelId),
    Guild(GuildId),
}

impl LifecycleManager {
    pub fn set_lang(&self, scope: LangScope, lang: Lang) {
        let code = lang.code().to_string();
        self.mutate(|inner| {
            let state = &mut inner.state;
            match scope {
                LangScope::User(id) => state.user_lang.insert(id, code),
                LangScope::Channel(id) => state.channel_lang.insert(id, code),
                LangScope::Guild(id) => state.server_lang.insert(id, code),
            };
        });
        info!(scope = ?scope, lang = %lang, "Language preference set");
    }

    /// Returns false when nothing was set for `scope`.
    pub fn clear_lang(&self, scope: LangScope) -> bool {
        self.mutate_if(|inner| {
            let state = &mut inner.state;
            match scope {
                LangScope::User(id) => state.user_lang.remove(&id),
                LangScope::Channel(id) => state.channel_lang.remove(&id),
                LangScope::Guild(id) => state.server_lang.remove(&id),
            }
        })
        .is_some()
    }

    /// Language to answer in: user, then channel, then guild preference,
    /// then the default.
    pub fn effective_language(
        &self,
        guild: Option<GuildId>,
        user: Option<UserId>,
        channel: Option<ChannelId>,
    ) -> Lang {
        self.read(|inner| {
            let state = &inner.state;
            i18n::resolve(
                user.and_then(|id| state.user_lang.get(&id)).map(String::as_str),
                channel
                    .and_then(|id| state.channel_lang.get(&id))
                    .map(String::as_str),
                guild
                    .and_then(|id| state.server_lang.get(&id))
                    .map(String::as_str),
            )
        })
    }

    // ------------------------------------------------------------------
    // Keepalive
    // ------------------------------------------------------------------

    /// Configure the heartbeat for `guild`, replacing any previous one.
    pub fn setup_keepalive(
        &self,
        guild: GuildId,
        channel: ChannelId,
        interval_minutes: u32,
        message: impl Into<String>,
    ) -> LifecycleResult<KeepaliveConfig> {
        if interval_minutes < 1 {
            return Err(LifecycleError::IntervalTooShort(interval_minutes));
        }
        let config = KeepaliveConfig {
            channel_id: channel,
            interval_minutes,
            message: message.into(),
            last_sent: 0.0,
        };
        self.mutate(|inner| {
            inner.state.keepalive_config.insert(guild, config.clone());
        });
        info!(guild = %guild, channel = %channel, interval_minutes, "Keepalive configured");
        Ok(config)
    }

    pub fn remove_keepalive(&self, guild: GuildId) -> bool {
        self.mutate_if(|inner| inner.state.keepalive_config.remove(&guild))
            .is_some()
    }

    pub fn keepalive_status(&self, guild: GuildId) -> Option<KeepaliveConfig> {
        self.read(|inner| inner.state.keepalive_config.get(&guild).cloned())
    }

    /// Configurations whose interval has elapsed at `now` (unix seconds).
    pub fn keepalive_due(&self, now: f64) -> Vec<(GuildId, KeepaliveConfig)> {
        self.read(|inner| {
            inner
                .state
                .keepalive_config
                .iter()
                .filter(|(_, c)| now - c.last_sent >= f64::from(c.interval_minutes) * 60.0)
                .map(|(guild, c)| (*guild, c.clone()))
                .collect()
        })
    }

    /// Record a sent heartbeat. Returns false when the configuration was
    /// removed in the meantime.
    pub fn mark_keepalive_sent(&self, guild: GuildId, at: f64) -> bool {
        self.mutate_if(|inner| {
            let config = inner.state.keepalive_config.get_mut(&guild)?;
            config.last_sent = at;
            Some(())
        })
        .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::state::managers::Limits;
    use crate::store::DurableStore;
    use std::sync::Arc;

    fn manager() -> Arc<LifecycleManager> {
        let (platform, _) = MemoryPlatform::new();
        LifecycleManager::new(
            Arc::new(platform),
            DurableStore::ephemeral(),
            Limits::default(),
            None,
        )
    }

    #[test]
    fn language_resolution_order() {
        let manager = manager();
        let (g, u, c) = (GuildId(1), UserId(2), ChannelId(3));
        assert_eq!(manager.effective_language(Some(g), Some(u), Some(c)), Lang::Fr);

        manager.set_lang(LangScope::Guild(g), Lang::Ar);
        assert_eq!(manager.effective_language(Some(g), Some(u), Some(c)), Lang::Ar);

        manager.set_lang(LangScope::Channel(c), Lang::En);
        assert_eq!(manager.effective_language(Some(g), Some(u), Some(c)), Lang::En);

        manager.set_lang(LangScope::User(u), Lang::Fr);
        assert_eq!(manager.effective_language(Some(g), Some(u), Some(c)), Lang::Fr);

        assert!(manager.clear_lang(LangScope::User(u)));
        assert!(!manager.clear_lang(LangScope::User(u)));
        assert_eq!(manager.effective_language(Some(g), Some(u), Some(c)), Lang::En);
    }

    #[test]
    fn keepalive_interval_must_be_positive() {
        let manager = manager();
        assert_eq!(
            manager.setup_keepalive(GuildId(1), ChannelId(5), 0, "ping"),
            Err(LifecycleError::IntervalTooShort(0))
        );
        assert!(manager.keepalive_status(GuildId(1)).is_none());
    }

    #[test]
    fn keepalive_becomes_due_after_its_interval() {
        let manager = manager();
        let g = GuildId(1);
        manager.setup_keepalive(g, ChannelId(5), 2, "ping").unwrap();

        // Never sent: due immediately.
        assert_eq!(manager.keepalive_due(1_000.0).len(), 1);
        assert!(manager.mark_keepalive_sent(g, 1_000.0));
        assert!(manager.keepalive_due(1_060.0).is_empty());
        assert_eq!(manager.keepalive_due(1_120.0).len(), 1);

        assert!(manager.remove_keepalive(g));
        assert!(!manager.mark_keepalive_sent(g, 2_000.0));
    }
}
