//! Keepalive commands: setup_keepalive, remove_keepalive, keepalive_status.

use super::core::{CommandError, CommandHandler, CommandResult, Context, parse_channel};
use crate::i18n::Key;
use async_trait::async_trait;

/// Message posted when `setup_keepalive` gets none.
const DEFAULT_MESSAGE: &str = "🔄 Keepalive";

const SETUP_USAGE: &str = "setup_keepalive <channel> <minutes> [message]";

/// Handler for `setup_keepalive <channel> <minutes> [message]`. Admin only.
pub struct SetupKeepaliveHandler;

#[async_trait]
impl CommandHandler for SetupKeepaliveHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        ctx.require_admin()?;
        let [channel, minutes, message @ ..] = args else {
            return Err(CommandError::Usage(SETUP_USAGE));
        };
        let channel = parse_channel(channel).ok_or(CommandError::Usage(SETUP_USAGE))?;
        // Negative or non-numeric intervals are usage errors; zero is
        // rejected by the manager.
        let minutes: u32 = minutes.parse().map_err(|_| CommandError::Usage(SETUP_USAGE))?;
        let message = if message.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            message.join(" ")
        };

        let config = ctx
            .manager
            .setup_keepalive(ctx.guild(), channel, minutes, message)?;
        Ok(ctx.tr(
            Key::KeepaliveSet,
            &[
                ("channel", &ctx.channel_mention(config.channel_id)),
                ("interval", &config.interval_minutes),
            ],
        ))
    }
}

/// Handler for `remove_keepalive`. Admin only.
pub struct RemoveKeepaliveHandler;

#[async_trait]
impl CommandHandler for RemoveKeepaliveHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &[&str]) -> CommandResult {
        ctx.require_admin()?;
        if ctx.manager.remove_keepalive(ctx.guild()) {
            Ok(ctx.tr(Key::KeepaliveRemoved, &[]))
        } else {
            Err(CommandError::Refused(Key::KeepaliveMissing))
        }
    }
}

/// Handler for `keepalive_status`.
pub struct KeepaliveStatusHandler;

#[async_trait]
impl CommandHandler for KeepaliveStatusHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &[&str]) -> CommandResult {
        let config = ctx
            .manager
            .keepalive_status(ctx.guild())
            .ok_or(CommandError::Refused(Key::KeepaliveMissing))?;
        Ok(ctx.tr(
            Key::KeepaliveStatus,
            &[
                ("channel", &ctx.channel_mention(config.channel_id)),
                ("interval", &config.interval_minutes),
                ("message", &config.message),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Registry;
    use crate::i18n::Lang;
    use crate::platform::MemoryPlatform;
    use crate::state::ids::{ChannelKind, GuildId, Invoker, Member, Permissions, UserId};
    use crate::state::managers::{LangScope, LifecycleManager, Limits};
    use crate::store::DurableStore;
    use std::sync::Arc;

    const G: GuildId = GuildId(1);

    #[tokio::test]
    async fn keepalive_lifecycle() {
        let (platform, _) = MemoryPlatform::new();
        let platform = Arc::new(platform);
        let manager = LifecycleManager::new(
            platform.clone(),
            DurableStore::ephemeral(),
            Limits::default(),
            None,
        );
        manager.set_lang(LangScope::Guild(G), Lang::En);
        let general = platform.add_channel(G, ChannelKind::Text, "general");
        let general_arg = general.to_string();
        let general_arg = general_arg.as_str();
        let registry = Registry::new();
        let admin = Invoker {
            guild: G,
            member: Member::new(UserId(1), "admin"),
            channel: Some(general),
            permissions: Permissions::ADMIN,
        };

        let reply = registry
            .dispatch(&manager, &admin, "setup_keepalive", &[general_arg, "0"])
            .await;
        assert_eq!(reply, "The interval must be at least 1 minute.");

        let reply = registry
            .dispatch(&manager, &admin, "setup_keepalive", &[general_arg, "15"])
            .await;
        assert_eq!(reply, "Keepalive configured for #general every 15 minutes.");

        let reply = registry
            .dispatch(&manager, &admin, "keepalive_status", &[])
            .await;
        assert_eq!(
            reply,
            "Keepalive active in #general, every 15 minutes, message: 🔄 Keepalive"
        );

        let reply = registry
            .dispatch(&manager, &admin, "remove_keepalive", &[])
            .await;
        assert_eq!(reply, "Keepalive configuration removed.");
        let reply = registry
            .dispatch(&manager, &admin, "keepalive_status", &[])
            .await;
        assert_eq!(reply, "No keepalive configuration found.");
    }
}
