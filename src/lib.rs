//! tempchan - temporary channel daemon.
//!
//! Provisions per-user temporary text and voice channels on a chat
//! platform, enforces a per-user quota, and reclaims voice channels once
//! they stay empty.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod i18n;
pub mod metrics;
pub mod network;
pub mod platform;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
