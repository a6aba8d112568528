//! HTTP server for liveness checks and the Prometheus metrics endpoint.
//!
//! Runs on a separate tokio task and serves `/` and `/metrics`.

use axum::{Router, routing::get};
use std::net::SocketAddr;

/// Body returned by the liveness route.
pub const ALIVE: &str = "Bot is alive!";

/// Handler for GET / - liveness check.
async fn alive_handler() -> &'static str {
    ALIVE
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Routes served by the HTTP endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/", get(alive_handler))
        .route("/metrics", get(metrics_handler))
}

/// Run the HTTP server.
///
/// Binds to `0.0.0.0:port`. This is a long-running task that should be
/// spawned in the background.
pub async fn run_http_server(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, router()).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
