//! Test server management.
//!
//! Runs the daemon's components in-process: a memory platform, a lifecycle
//! manager over a file store in a temporary directory, the event router and
//! the control gateway bound to an ephemeral port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempchan::config::ListenConfig;
use tempchan::handlers::spawn_event_router;
use tempchan::network::Gateway;
use tempchan::platform::MemoryPlatform;
use tempchan::state::managers::{LifecycleManager, Limits};
use tempchan::store::DurableStore;
use tempfile::TempDir;

/// A test server instance.
pub struct TestServer {
    pub platform: Arc<MemoryPlatform>,
    pub manager: Arc<LifecycleManager>,
    addr: SocketAddr,
    data_dir: TempDir,
}

impl TestServer {
    /// Spawn a server with default limits.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_limits(Limits::default()).await
    }

    pub async fn spawn_with_limits(limits: Limits) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let store = DurableStore::open(data_dir.path().join("bot_data.json"));

        let (platform, events) = MemoryPlatform::new();
        let platform = Arc::new(platform);
        let manager = LifecycleManager::new(platform.clone(), store, limits, None);
        spawn_event_router(manager.clone(), events);
        manager.resume_watchers();

        let listen = ListenConfig {
            address: SocketAddr::from(([127, 0, 0, 1], 0)),
            max_line_length: 256,
        };
        let gateway = Gateway::bind(&listen, platform.clone(), manager.clone()).await?;
        let addr = gateway.local_addr()?;
        tokio::spawn(gateway.run());

        Ok(Self {
            platform,
            manager,
            addr,
            data_dir,
        })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Location of the persisted document.
    #[allow(dead_code)]
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.path().join("bot_data.json")
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }
}
