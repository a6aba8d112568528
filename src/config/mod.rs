//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BotConfig, LifecycleConfig)
//! - [`listen`]: Control gateway listener configuration (ListenConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup validation collecting every problem at once

mod defaults;
mod listen;
mod types;
mod validation;

pub use listen::ListenConfig;
pub use types::{
    BotConfig, Config, ConfigError, HttpConfig, KeepaliveSenderConfig, LifecycleConfig,
    StoreConfig, TOKEN_ENV,
};
pub use validation::{ValidationError, validate};
