//! Temporary channel commands: create_temp, delete_temp, list_temp,
//! change_host, invite.
//!
//! The `*_prefix` variants keep the older command forms: voice-only
//! creation and deletion of every channel the member owns.

use super::core::{CommandError, CommandHandler, CommandResult, Context, parse_user};
use crate::error::LifecycleError;
use crate::i18n::Key;
use crate::state::ids::{ChannelKind, UserId};
use async_trait::async_trait;

/// Channel name used when `create_temp` gets none.
const DEFAULT_NAME: &str = "Temporary";

const CREATE_USAGE: &str = "create_temp <text|voice> [name]";
const DELETE_USAGE: &str = "delete_temp [channel]";
const DELETE_ALL_USAGE: &str = "delete_temp_prefix";
const CHANGE_HOST_USAGE: &str = "change_host <user> [channel]";
const INVITE_USAGE: &str = "invite <user> [channel]";

fn target_user(arg: Option<&&str>, usage: &'static str) -> Result<UserId, CommandError> {
    arg.and_then(|raw| parse_user(raw))
        .ok_or(CommandError::Usage(usage))
}

/// Handler for `create_temp <text|voice> [name]`.
pub struct CreateTempHandler;

#[async_trait]
impl CommandHandler for CreateTempHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        let Some((kind, rest)) = args.split_first() else {
            return Err(CommandError::Usage(CREATE_USAGE));
        };
        let kind: ChannelKind = kind.parse().map_err(|_| CommandError::InvalidKind)?;
        create_and_reply(ctx, kind, rest).await
    }
}

/// Handler for `create_temp_prefix [name]`. Always creates a voice channel.
pub struct CreateTempPrefixHandler;

#[async_trait]
impl CommandHandler for CreateTempPrefixHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        create_and_reply(ctx, ChannelKind::Voice, args).await
    }
}

async fn create_and_reply(ctx: &Context<'_>, kind: ChannelKind, words: &[&str]) -> CommandResult {
    let name = if words.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        words.join(" ")
    };

    let created = ctx
        .manager
        .create_temp(ctx.guild(), &ctx.invoker.member, kind, &name, None)
        .await?;

    let key = match kind {
        ChannelKind::Voice => Key::CreatedTempVoice,
        ChannelKind::Text => Key::CreatedTempText,
    };
    Ok(ctx.tr(
        key,
        &[
            ("channel", &ctx.channel_mention(created.channel)),
            ("count", &created.count),
            ("max", &ctx.manager.limits().max_temp_per_user),
        ],
    ))
}

/// Handler for `delete_temp [channel]`.
pub struct DeleteTempHandler;

#[async_trait]
impl CommandHandler for DeleteTempHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        let channel = ctx.channel_or_here(args.first().copied(), DELETE_USAGE)?;
        // Resolve the name while the channel still exists.
        let mention = ctx.channel_mention(channel);

        ctx.manager
            .delete_temp(ctx.guild(), channel, ctx.user(), ctx.invoker.permissions)
            .await
            .map_err(|e| match e {
                LifecycleError::NotFound(_) => CommandError::Refused(Key::NoTempToDelete),
                other => other.into(),
            })?;

        Ok(ctx.tr(Key::DeletedTemp, &[("channel", &mention)]))
    }
}

/// Handler for `delete_temp_prefix`. Deletes every temporary channel the
/// invoker owns in the guild.
pub struct DeleteAllTempHandler;

#[async_trait]
impl CommandHandler for DeleteAllTempHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        if !args.is_empty() {
            return Err(CommandError::Usage(DELETE_ALL_USAGE));
        }
        let (guild, user) = (ctx.guild(), ctx.user());
        let owned = ctx.manager.list_owned(guild, user);
        if owned.is_empty() {
            return Err(CommandError::Refused(Key::NoTempToDelete));
        }

        for channel in owned {
            match ctx
                .manager
                .delete_temp(guild, channel, user, ctx.invoker.permissions)
                .await
            {
                // Already reclaimed by a watcher or another request.
                Ok(_) | Err(LifecycleError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(ctx.tr(Key::DeletedAllTemp, &[]))
    }
}

/// Handler for `list_temp` and `list_temp_prefix`.
pub struct ListTempHandler;

#[async_trait]
impl CommandHandler for ListTempHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &[&str]) -> CommandResult {
        let owned = ctx.manager.list_owned(ctx.guild(), ctx.user());
        if owned.is_empty() {
            return Ok(ctx.tr(Key::ListTempEmpty, &[]));
        }

        let mut lines = vec![ctx.tr(Key::ListTempTitle, &[])];
        for channel in owned {
            let kind = ctx
                .manager
                .record_of(channel)
                .map(|r| r.kind.as_str())
                .unwrap_or("?");
            lines.push(format!("- {} ({kind})", ctx.channel_mention(channel)));
        }
        Ok(lines.join("\n"))
    }
}

/// Handler for `change_host <user> [channel]`.
///
/// Transfers a temporary channel, or failing that a hosting channel.
pub struct ChangeHostHandler;

#[async_trait]
impl CommandHandler for ChangeHostHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        let new_owner = target_user(args.first(), CHANGE_HOST_USAGE)?;
        let channel = ctx.channel_or_here(args.get(1).copied(), CHANGE_HOST_USAGE)?;
        let (guild, requester) = (ctx.guild(), ctx.user());

        let transferred = match ctx
            .manager
            .transfer_ownership(guild, channel, requester, new_owner)
        {
            Err(LifecycleError::NotFound(_)) => {
                ctx.manager
                    .transfer_hosting(guild, channel, requester, new_owner)
            }
            other => other,
        };
        transferred.map_err(|e| match e {
            LifecycleError::NotAuthorized => CommandError::Refused(Key::NotOwner),
            other => other.into(),
        })?;

        Ok(ctx.tr(
            Key::ChangeHostSuccess,
            &[("new_host", &ctx.user_mention(new_owner))],
        ))
    }
}

/// Handler for `invite <user> [channel]`. Requires manage-channels.
pub struct InviteHandler;

#[async_trait]
impl CommandHandler for InviteHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        let target = target_user(args.first(), INVITE_USAGE)?;
        let channel = ctx.channel_or_here(args.get(1).copied(), INVITE_USAGE)?;

        let kind = ctx
            .manager
            .invite(ctx.guild(), channel, ctx.invoker.permissions, target)
            .await?;

        let key = match kind {
            ChannelKind::Voice => Key::InviteSuccessVoice,
            ChannelKind::Text => Key::InviteSuccessText,
        };
        Ok(ctx.tr(
            key,
            &[
                ("user", &ctx.user_mention(target)),
                ("channel", &ctx.channel_mention(channel)),
            ],
        ))
    }
}
