//! Prometheus metrics collection for tempchan.
//!
//! Metrics are exposed on the HTTP endpoint next to the liveness route.
//!
//! - `tempchan_channels_created_total{kind}` - temporary channels provisioned
//! - `tempchan_channels_deleted_total{reason}` - deletions by owner/admin or reclamation
//! - `tempchan_quota_rejections_total` - creations refused at the quota
//! - `tempchan_active_watchers` - reclamation watchers currently running
//! - `tempchan_command_duration_seconds{command}` - command latency histogram

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Temporary channels created, by kind.
pub static CHANNELS_CREATED: OnceLock<IntCounterVec> = OnceLock::new();

/// Temporary channel records removed, by reason (`deleted`, `reclaimed`).
pub static CHANNELS_DELETED: OnceLock<IntCounterVec> = OnceLock::new();

/// Creations refused because the requester was at the quota.
pub static QUOTA_REJECTIONS: OnceLock<IntCounter> = OnceLock::new();

/// Platform call failures, by operation and error code.
pub static PLATFORM_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Durable store write failures.
pub static PERSISTENCE_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Keepalive heartbeats sent.
pub static KEEPALIVES_SENT: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Reclamation watchers currently running.
pub static ACTIVE_WATCHERS: OnceLock<IntGauge> = OnceLock::new();

/// Live temporary channel records.
pub static TEMP_CHANNELS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Command Metrics
// ========================================================================

/// Commands processed by name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by name.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by name and error code.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if $metric.get().is_none() {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(CHANNELS_CREATED, IntCounterVec::new(Opts::new("tempchan_channels_created_total", "Temporary channels created"), &["kind"]));
    register!(CHANNELS_DELETED, IntCounterVec::new(Opts::new("tempchan_channels_deleted_total", "Temporary channel records removed"), &["reason"]));
    register!(QUOTA_REJECTIONS, IntCounter::new("tempchan_quota_rejections_total", "Creations refused at the per-user quota"));
    register!(PLATFORM_ERRORS, IntCounterVec::new(Opts::new("tempchan_platform_errors_total", "Platform call failures"), &["operation", "error"]));
    register!(PERSISTENCE_FAILURES, IntCounter::new("tempchan_persistence_failures_total", "Durable store write failures"));
    register!(KEEPALIVES_SENT, IntCounter::new("tempchan_keepalives_sent_total", "Keepalive heartbeats sent"));
    register!(ACTIVE_WATCHERS, IntGauge::new("tempchan_active_watchers", "Reclamation watchers running"));
    register!(TEMP_CHANNELS, IntGauge::new("tempchan_temp_channels", "Live temporary channel records"));

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("tempchan_command_total", "Commands processed by name"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("tempchan_command_duration_seconds", "Command latency by name")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("tempchan_command_errors_total", "Command errors by name"), &["command", "error"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a created temporary channel.
#[inline]
pub fn record_created(kind: &str) {
    if let Some(c) = CHANNELS_CREATED.get() {
        c.with_label_values(&[kind]).inc();
    }
}

/// Record a removed temporary channel record.
#[inline]
pub fn record_deleted(reason: &str) {
    if let Some(c) = CHANNELS_DELETED.get() {
        c.with_label_values(&[reason]).inc();
    }
}

#[inline]
pub fn record_quota_rejection() {
    if let Some(c) = QUOTA_REJECTIONS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_platform_error(operation: &str, error: &str) {
    if let Some(c) = PLATFORM_ERRORS.get() {
        c.with_label_values(&[operation, error]).inc();
    }
}

#[inline]
pub fn record_persistence_failure() {
    if let Some(c) = PERSISTENCE_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_keepalive_sent() {
    if let Some(c) = KEEPALIVES_SENT.get() {
        c.inc();
    }
}

#[inline]
pub fn set_temp_channels(count: usize) {
    if let Some(g) = TEMP_CHANNELS.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

#[inline]
pub fn watcher_started() {
    if let Some(g) = ACTIVE_WATCHERS.get() {
        g.inc();
    }
}

#[inline]
pub fn watcher_stopped() {
    if let Some(g) = ACTIVE_WATCHERS.get() {
        g.dec();
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_command("create_temp", 0.001);
        record_created("voice");
        record_quota_rejection();

        let output = gather_metrics();
        assert!(output.contains("tempchan_command_total"));
        assert!(output.contains("tempchan_channels_created_total"));
    }
}
