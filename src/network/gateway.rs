//! Gateway - TCP listener that accepts control connections.
//!
//! The Gateway binds the control socket and spawns a Connection task for
//! each client.

use super::connection::{Connection, GatewayError};
use crate::config::ListenConfig;
use crate::handlers::Registry;
use crate::platform::MemoryPlatform;
use crate::state::managers::LifecycleManager;
use crate::telemetry::spans;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, warn};

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    max_line_length: usize,
    platform: Arc<MemoryPlatform>,
    manager: Arc<LifecycleManager>,
    registry: Arc<Registry>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        config: &ListenConfig,
        platform: Arc<MemoryPlatform>,
        manager: Arc<LifecycleManager>,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(config.address).await?;
        info!(address = %listener.local_addr()?, "Control listener bound");
        Ok(Self {
            listener,
            max_line_length: config.max_line_length,
            platform,
            manager,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the gateway, accepting connections forever.
    pub async fn run(self) -> Result<(), GatewayError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "Control connection accepted");
                    let connection = Connection::new(
                        stream,
                        addr,
                        self.max_line_length,
                        Arc::clone(&self.platform),
                        Arc::clone(&self.manager),
                        Arc::clone(&self.registry),
                    );

                    tokio::spawn(
                        async move {
                            if let Err(e) = connection.run().await {
                                warn!(code = e.error_code(), error = %e, "Control connection error");
                            }
                            info!("Control connection closed");
                        }
                        .instrument(spans::connection(&addr.to_string())),
                    );
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept control connection");
                }
            }
        }
    }
}
