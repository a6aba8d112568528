//! Command handler context and core types.
//!
//! Defines the `Context` passed to every command handler, the handler trait
//! and the error type handlers return. Replies are plain localized text; the
//! front end decides how to deliver them.

use crate::error::LifecycleError;
use crate::i18n::{self, Key, Lang};
use crate::state::ids::{ChannelId, GuildId, Invoker, UserId};
use crate::state::managers::LifecycleManager;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Shared lifecycle manager.
    pub manager: &'a Arc<LifecycleManager>,
    /// Who invoked the command, and where.
    pub invoker: &'a Invoker,
    /// Effective language of the invoker.
    pub lang: Lang,
}

impl<'a> Context<'a> {
    pub fn new(manager: &'a Arc<LifecycleManager>, invoker: &'a Invoker) -> Self {
        let lang = manager.effective_language(
            Some(invoker.guild),
            Some(invoker.user()),
            invoker.channel,
        );
        Self {
            manager,
            invoker,
            lang,
        }
    }

    #[inline]
    pub fn guild(&self) -> GuildId {
        self.invoker.guild
    }

    #[inline]
    pub fn user(&self) -> UserId {
        self.invoker.user()
    }

    /// Render `key` in the invoker's language.
    pub fn tr(&self, key: Key, args: &[(&str, &dyn fmt::Display)]) -> String {
        i18n::tr(self.lang, key, args)
    }

    pub fn require_admin(&self) -> Result<(), CommandError> {
        if self.invoker.permissions.administrator {
            Ok(())
        } else {
            Err(CommandError::NotAdministrator)
        }
    }

    pub fn channel_mention(&self, channel: ChannelId) -> String {
        self.manager.platform().mention(channel)
    }

    pub fn user_mention(&self, user: UserId) -> String {
        self.manager.platform().user_mention(user)
    }

    /// The channel named by `arg`, or the one the command was issued in.
    pub fn channel_or_here(
        &self,
        arg: Option<&str>,
        usage: &'static str,
    ) -> Result<ChannelId, CommandError> {
        match arg {
            Some(raw) => parse_channel(raw).ok_or(CommandError::Usage(usage)),
            None => self.invoker.channel.ok_or(CommandError::Usage(usage)),
        }
    }
}

/// Accepts a bare snowflake or a `<#id>` mention.
pub fn parse_channel(raw: &str) -> Option<ChannelId> {
    let raw = raw
        .strip_prefix("<#")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    raw.parse().ok()
}

/// Accepts a bare snowflake or a `<@id>` / `<@!id>` mention.
pub fn parse_user(raw: &str) -> Option<UserId> {
    let raw = raw
        .strip_prefix("<@")
        .and_then(|s| s.strip_suffix('>'))
        .map(|s| s.trim_start_matches('!'))
        .unwrap_or(raw);
    raw.parse().ok()
}

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid channel kind")]
    InvalidKind,
    #[error("invalid language")]
    InvalidLang,
    #[error("administrator permission required")]
    NotAdministrator,
    /// A refusal whose reply needs no arguments.
    #[error("refused ({0:?})")]
    Refused(Key),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl CommandError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::InvalidKind => "invalid_kind",
            Self::InvalidLang => "invalid_lang",
            Self::NotAdministrator => "not_administrator",
            Self::Refused(_) => "refused",
            Self::Lifecycle(e) => e.error_code(),
        }
    }

    /// Localized reply for the invoker.
    pub fn render(&self, ctx: &Context<'_>) -> String {
        match self {
            Self::Usage(usage) => ctx.tr(Key::Usage, &[("usage", usage)]),
            Self::InvalidKind => ctx.tr(Key::InvalidKind, &[]),
            Self::InvalidLang => ctx.tr(Key::InvalidLang, &[]),
            Self::NotAdministrator => ctx.tr(Key::NoPermission, &[]),
            Self::Refused(key) => ctx.tr(*key, &[]),
            Self::Lifecycle(e) => match e {
                LifecycleError::QuotaExceeded { max } => {
                    ctx.tr(Key::AlreadyMaxTemp, &[("max", max)])
                }
                LifecycleError::NotFound(_) => ctx.tr(Key::NotTempOrHosting, &[]),
                LifecycleError::NotAuthorized => ctx.tr(Key::NoPermission, &[]),
                LifecycleError::TargetNotConnected(user) => ctx.tr(
                    Key::UserNotConnectedVoice,
                    &[("user", &ctx.user_mention(*user))],
                ),
                LifecycleError::IntervalTooShort(_) => ctx.tr(Key::KeepaliveInterval, &[]),
                LifecycleError::Platform(_) => ctx.tr(Key::PlatformFailure, &[]),
            },
        }
    }
}

/// Result type for command handlers: the reply text on success.
pub type CommandResult = Result<String, CommandError>;

/// A named command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult;
}
