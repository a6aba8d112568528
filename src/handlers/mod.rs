//! Command and event handlers.
//!
//! Commands go through the [`Registry`]; platform events go through the
//! event router. Both act only via the lifecycle manager.

mod core;
pub mod events;
mod hosting;
mod keepalive;
mod lang;
mod temp;

pub use self::core::{
    CommandError, CommandHandler, CommandResult, Context, Registry, parse_channel, parse_user,
};
pub use events::{handle_event, spawn_event_router};
