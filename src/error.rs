//! Unified error handling for tempchan.
//!
//! Every public lifecycle operation returns a typed [`LifecycleError`];
//! nothing in the core aborts the process. Each error carries a static
//! code used as a metrics label.

use crate::platform::PlatformError;
use crate::state::ids::{ChannelId, UserId};
use crate::store::StoreError;
use thiserror::Error;

// ============================================================================
// Lifecycle Errors (manager operations)
// ============================================================================

/// Errors returned by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requester already owns the maximum number of temporary channels.
    #[error("quota exceeded: {max} temporary channels already owned")]
    QuotaExceeded { max: usize },

    /// No record for the referenced channel (stale or already reclaimed).
    #[error("channel {0} is not a managed channel")]
    NotFound(ChannelId),

    /// Requester is neither the owner nor holds the required capability.
    #[error("not authorized")]
    NotAuthorized,

    /// Invite target is not in any voice channel.
    #[error("member {0} is not connected to a voice channel")]
    TargetNotConnected(UserId),

    /// Keepalive intervals are whole minutes, at least one.
    #[error("keepalive interval must be at least 1 minute, got {0}")]
    IntervalTooShort(u32),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl LifecycleError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::NotFound(_) => "not_found",
            Self::NotAuthorized => "not_authorized",
            Self::TargetNotConnected(_) => "target_not_connected",
            Self::IntervalTooShort(_) => "interval_too_short",
            Self::Platform(e) => e.error_code(),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

// ============================================================================
// Persistence Errors
// ============================================================================

/// A durable write failed. Logged and counted, never propagated to callers:
/// in-memory state stays authoritative for the rest of the process.
#[derive(Debug, Error)]
#[error("persistence failed (generation {generation}): {source}")]
pub struct PersistenceError {
    pub generation: u64,
    #[source]
    pub source: StoreError,
}

impl PersistenceError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self.source {
            StoreError::Io(_) => "store_io",
            StoreError::Serialize(_) => "store_serialize",
        }
    }
}
