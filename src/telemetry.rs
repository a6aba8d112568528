//! Telemetry utilities for command timing and tracing spans.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::state::ids::{ChannelId, GuildId, UserId};
    use tracing::{Span, info_span};

    /// Span for one gateway connection.
    pub fn connection(peer: &str) -> Span {
        info_span!("connection", peer = %peer)
    }

    /// Span for a command execution.
    pub fn command(name: &str, guild: GuildId, user: UserId) -> Span {
        info_span!("command", name = %name, guild = %guild, user = %user)
    }

    /// Span for one reclamation watcher.
    pub fn watcher(channel: ChannelId) -> Span {
        info_span!("watcher", channel = %channel)
    }
}
