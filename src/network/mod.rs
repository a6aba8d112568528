//! Network module.
//!
//! Contains the Gateway (TCP listener), the per-client Connection and the
//! control protocol they speak.

mod connection;
mod gateway;
pub mod protocol;

pub use connection::{Connection, GatewayError};
pub use gateway::Gateway;
pub use protocol::{ProtocolError, Request};
