//! Core handler infrastructure.
//!
//! The handler registry, the context passed to handlers and the error type
//! they return.

pub mod context;
pub mod registry;

pub use context::{
    CommandError, CommandHandler, CommandResult, Context, parse_channel, parse_user,
};
pub use registry::Registry;
