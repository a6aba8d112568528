//! Keepalive background task.
//!
//! Posts each guild's configured heartbeat message once its interval has
//! elapsed, then records the send time.

use crate::metrics;
use crate::state::managers::LifecycleManager;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Spawn the keepalive sender. Checks every `tick`.
pub fn spawn_keepalive_task(manager: Arc<LifecycleManager>, tick: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);

        loop {
            interval.tick().await;
            send_due(&manager, unix_now()).await;
        }
    });
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Send every heartbeat due at `now` (unix seconds). Returns how many went out.
pub async fn send_due(manager: &LifecycleManager, now: f64) -> usize {
    let mut sent = 0;
    for (guild, config) in manager.keepalive_due(now) {
        match manager
            .platform()
            .send_message(config.channel_id, &config.message)
            .await
        {
            Ok(()) => {
                // Removed while sending: nothing left to update.
                if manager.mark_keepalive_sent(guild, now) {
                    debug!(guild = %guild, channel = %config.channel_id, "Keepalive sent");
                }
                metrics::record_keepalive_sent();
                sent += 1;
            }
            Err(e) => {
                metrics::record_platform_error("send_message", e.error_code());
                warn!(guild = %guild, channel = %config.channel_id, error = %e, "Keepalive failed");
            }
        }
    }
    sent
}
