//! Background services.
//!
//! Reclamation watchers and the keepalive sender. Both hold the lifecycle
//! manager and never touch the persisted state directly.

pub mod keepalive;
pub mod watcher;

pub use keepalive::spawn_keepalive_task;
pub use watcher::{WatchState, WatcherRegistry};
