//! Hosting channel commands: setup_hosting, remove_hosting, list_hosting.

use super::core::{CommandError, CommandHandler, CommandResult, Context, parse_channel};
use crate::error::LifecycleError;
use crate::i18n::Key;
use crate::state::ids::ChannelKind;
use async_trait::async_trait;

const SETUP_USAGE: &str = "setup_hosting <channel> <text|voice> [category]";
const REMOVE_USAGE: &str = "remove_hosting <channel>";

/// Handler for `setup_hosting <channel> <text|voice> [category]`. Admin only.
pub struct SetupHostingHandler;

#[async_trait]
impl CommandHandler for SetupHostingHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        ctx.require_admin()?;
        let (Some(channel), Some(kind)) = (args.first(), args.get(1)) else {
            return Err(CommandError::Usage(SETUP_USAGE));
        };
        let channel = parse_channel(channel).ok_or(CommandError::Usage(SETUP_USAGE))?;
        let kind: ChannelKind = kind.parse().map_err(|_| CommandError::InvalidKind)?;
        let category = match args.get(2) {
            Some(raw) => Some(parse_channel(raw).ok_or(CommandError::Usage(SETUP_USAGE))?),
            None => None,
        };

        ctx.manager
            .setup_hosting(ctx.guild(), channel, kind, category, ctx.user());
        Ok(ctx.tr(Key::SetupHostingSuccess, &[]))
    }
}

/// Handler for `remove_hosting <channel>`. Admin only.
pub struct RemoveHostingHandler;

#[async_trait]
impl CommandHandler for RemoveHostingHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        ctx.require_admin()?;
        let channel = args
            .first()
            .and_then(|raw| parse_channel(raw))
            .ok_or(CommandError::Usage(REMOVE_USAGE))?;

        ctx.manager
            .remove_hosting(ctx.guild(), channel)
            .map_err(|e| match e {
                LifecycleError::NotFound(_) => CommandError::Refused(Key::HostingNotFound),
                other => other.into(),
            })?;
        Ok(ctx.tr(Key::HostingRemoved, &[]))
    }
}

/// Handler for `list_hosting`.
pub struct ListHostingHandler;

#[async_trait]
impl CommandHandler for ListHostingHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &[&str]) -> CommandResult {
        let hosting = ctx.manager.list_hosting(ctx.guild());
        if hosting.is_empty() {
            return Ok(ctx.tr(Key::ListHostingEmpty, &[]));
        }

        let mut lines = vec![ctx.tr(Key::ListHostingTitle, &[])];
        lines.extend(hosting.into_iter().map(|(channel, config)| {
            format!(
                "- {} (type: {}, owner: {})",
                ctx.channel_mention(channel),
                config.kind,
                ctx.user_mention(config.owner_id)
            )
        }));
        Ok(lines.join("\n"))
    }
}
