//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;
use std::path::PathBuf;

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_store_path() -> PathBuf {
    PathBuf::from("bot_data.json")
}

// =============================================================================
// Lifecycle Defaults
// =============================================================================

pub fn default_max_temp_per_user() -> usize {
    3
}

pub fn default_poll_interval() -> u64 {
    10
}

pub fn default_watcher_ceiling() -> u64 {
    6 * 60 * 60
}

// =============================================================================
// Background Task Defaults
// =============================================================================

pub fn default_keepalive_tick() -> u64 {
    60
}

// =============================================================================
// Listener Defaults
// =============================================================================

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7000))
}
