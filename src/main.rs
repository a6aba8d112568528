//! tempchand - temporary channel lifecycle daemon.
//!
//! Provisions per-member temporary channels from hosting channels, enforces
//! the per-member quota and reclaims channels once they empty out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempchan::config::{Config, TOKEN_ENV, validate};
use tempchan::handlers::spawn_event_router;
use tempchan::network::Gateway;
use tempchan::platform::{MemoryPlatform, Platform};
use tempchan::services::spawn_keepalive_task;
use tempchan::state::managers::{LifecycleManager, Limits};
use tempchan::store::DurableStore;
use tempchan::{http, metrics};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let explicit = std::env::args().nth(1);
    let config_path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let config = if explicit.is_none() && !Path::new(&config_path).exists() {
        warn!(path = %config_path, "No config file, using defaults");
        Config::default().with_token_override(std::env::var(TOKEN_ENV).ok())
    } else {
        Config::load(&config_path).map_err(|e| {
            error!(path = %config_path, error = %e, "Failed to load config");
            e
        })?
    };

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Refusing to start with {} configuration error(s)",
            errors.len()
        ));
    }

    info!(
        store = %config.store.path.display(),
        max_temp_per_user = config.lifecycle.max_temp_per_user,
        listen = %config.listen.address,
        "Starting tempchand"
    );

    metrics::init();

    // The in-process platform is shared by the gateway, which drives it,
    // and the manager, which only sees the trait.
    let (platform, events) = MemoryPlatform::new();
    let platform = Arc::new(platform);
    let manager = LifecycleManager::new(
        platform.clone() as Arc<dyn Platform>,
        DurableStore::open(&config.store.path),
        Limits::from(&config.lifecycle),
        config.bot.default_category_id,
    );

    spawn_event_router(manager.clone(), events);
    manager.resume_watchers();

    spawn_keepalive_task(
        manager.clone(),
        Duration::from_secs(config.keepalive.tick_secs),
    );
    info!(tick_secs = config.keepalive.tick_secs, "Keepalive sender started");

    // Start HTTP server for liveness and Prometheus metrics (port 0 disables)
    if config.http.port != 0 {
        tokio::spawn(http::run_http_server(config.http.port));
    }

    let gateway = Gateway::bind(&config.listen, platform, manager).await?;
    gateway.run().await?;

    Ok(())
}
