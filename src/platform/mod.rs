//! Chat platform collaborator.
//!
//! The lifecycle core only talks to the platform through [`Platform`].
//! Calls are fire-and-forget from the platform's point of view: timeouts and
//! rejections come back as [`PlatformError`] and the caller decides whether
//! to absorb or propagate them.

pub mod memory;

pub use memory::MemoryPlatform;

use crate::state::ids::{ChannelId, ChannelKind, GuildId, Member, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the platform collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("channel {0} not found")]
    NotFound(ChannelId),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("request timed out")]
    Timeout,
}

impl PlatformError {
    /// Static code for metrics labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Rejected(_) => "rejected",
            Self::Timeout => "timeout",
        }
    }
}

/// Target of a visibility overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// The guild's default role.
    Everyone,
    Member(UserId),
}

/// Events delivered by the platform's gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// A member's voice connection changed. A move between channels has both
    /// `before` and `after` set.
    VoiceStateUpdate {
        guild: GuildId,
        member: Member,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
    },
    /// A message was posted in a guild text channel.
    MessagePosted {
        guild: GuildId,
        channel: ChannelId,
        author: Member,
        content: String,
    },
}

/// Operations the core consumes from the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn create_channel(
        &self,
        guild: GuildId,
        kind: ChannelKind,
        name: &str,
        category: Option<ChannelId>,
    ) -> Result<ChannelId, PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError>;

    async fn set_channel_visibility(
        &self,
        channel: ChannelId,
        principal: Principal,
        visible: bool,
    ) -> Result<(), PlatformError>;

    /// Members currently connected to a voice channel. Text channels report 0.
    async fn occupancy(&self, channel: ChannelId) -> Result<usize, PlatformError>;

    /// Voice channel `user` is connected to in `guild`, if any.
    async fn voice_channel_of(&self, guild: GuildId, user: UserId) -> Option<ChannelId>;

    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError>;

    async fn direct_message(&self, user: UserId, content: &str) -> Result<(), PlatformError>;

    /// Human-readable channel reference for replies (a mention on most
    /// platforms).
    fn mention(&self, channel: ChannelId) -> String {
        format!("<#{channel}>")
    }

    fn user_mention(&self, user: UserId) -> String {
        format!("<@{user}>")
    }
}
