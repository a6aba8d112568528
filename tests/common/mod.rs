//! Integration test common infrastructure.
//!
//! Provides an in-process daemon behind a real control socket, a line
//! client to drive it, and polling helpers for asynchronous effects.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;

use std::time::Duration;

/// Poll `condition` until it holds, failing the test after about two
/// seconds.
#[allow(dead_code)]
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
