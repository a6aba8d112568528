//! Command handler registry and dispatch.
//!
//! The `Registry` maps command names to handlers and keeps usage counters.
//! Dispatch wraps every command in a tracing span and a latency timer.

use super::context::{CommandHandler, Context};
use crate::handlers::{hosting, keepalive, lang, temp};
use crate::i18n::Key;
use crate::state::ids::Invoker;
use crate::state::managers::LifecycleManager;
use crate::telemetry::{CommandTimer, spans};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug};

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
    /// Invocation counters, one per registered command.
    command_counts: HashMap<&'static str, AtomicU64>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn CommandHandler>> = HashMap::new();

        // Temporary channels
        handlers.insert("create_temp", Box::new(temp::CreateTempHandler));
        handlers.insert("delete_temp", Box::new(temp::DeleteTempHandler));
        handlers.insert("list_temp", Box::new(temp::ListTempHandler));
        handlers.insert("change_host", Box::new(temp::ChangeHostHandler));
        handlers.insert("invite", Box::new(temp::InviteHandler));
        handlers.insert("create_temp_prefix", Box::new(temp::CreateTempPrefixHandler));
        handlers.insert("delete_temp_prefix", Box::new(temp::DeleteAllTempHandler));
        handlers.insert("list_temp_prefix", Box::new(temp::ListTempHandler));

        // Hosting channels
        handlers.insert("setup_hosting", Box::new(hosting::SetupHostingHandler));
        handlers.insert("remove_hosting", Box::new(hosting::RemoveHostingHandler));
        handlers.insert("list_hosting", Box::new(hosting::ListHostingHandler));

        // Language preferences
        handlers.insert("set_lang_user", Box::new(lang::SetLangHandler(lang::Scope::User)));
        handlers.insert("set_lang_channel", Box::new(lang::SetLangHandler(lang::Scope::Channel)));
        handlers.insert("set_lang_server", Box::new(lang::SetLangHandler(lang::Scope::Server)));
        handlers.insert("clear_lang_user", Box::new(lang::ClearLangHandler(lang::Scope::User)));
        handlers.insert(
            "clear_lang_channel",
            Box::new(lang::ClearLangHandler(lang::Scope::Channel)),
        );
        handlers.insert(
            "clear_lang_server",
            Box::new(lang::ClearLangHandler(lang::Scope::Server)),
        );

        // Keepalive
        handlers.insert("setup_keepalive", Box::new(keepalive::SetupKeepaliveHandler));
        handlers.insert("remove_keepalive", Box::new(keepalive::RemoveKeepaliveHandler));
        handlers.insert("keepalive_status", Box::new(keepalive::KeepaliveStatusHandler));

        let command_counts = handlers
            .keys()
            .map(|name| (*name, AtomicU64::new(0)))
            .collect();

        Self {
            handlers,
            command_counts,
        }
    }

    /// Usage counts of commands invoked at least once, most used first.
    pub fn command_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(name, count)| (*name, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        stats
    }

    /// Run `name` for `invoker` and return the localized reply.
    pub async fn dispatch(
        &self,
        manager: &Arc<LifecycleManager>,
        invoker: &Invoker,
        name: &str,
        args: &[&str],
    ) -> String {
        let ctx = Context::new(manager, invoker);
        let name = name.to_ascii_lowercase();

        let Some((&cmd_name, handler)) = self.handlers.get_key_value(name.as_str()) else {
            crate::metrics::record_command_error("unknown", "unknown_command");
            return ctx.tr(Key::UnknownCommand, &[("command", &name)]);
        };
        if let Some(counter) = self.command_counts.get(cmd_name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let _timer = CommandTimer::new(cmd_name);
        let result = handler
            .handle(&ctx, args)
            .instrument(spans::command(cmd_name, invoker.guild, invoker.user()))
            .await;

        match result {
            Ok(reply) => reply,
            Err(e) => {
                crate::metrics::record_command_error(cmd_name, e.error_code());
                debug!(command = cmd_name, error = %e, "Command error");
                e.render(&ctx)
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
