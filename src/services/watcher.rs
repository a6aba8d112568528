//! Reclamation watchers.
//!
//! One background task per voice temporary channel. Each tick the watcher
//! observes the channel and feeds the observation to a small state machine:
//!
//! ```text
//! Polling --empty--> ConfirmingEmpty --empty--> Reclaimed
//!    ^                     |
//!    +------occupied-------+
//! any --missing--> Cancelled
//! ```
//!
//! A channel is reclaimed only after two consecutive empty observations one
//! poll interval apart. Watchers are never aborted from outside: they stop
//! on their own when the channel is reclaimed, vanishes, loses its record,
//! or when the ceiling elapses.

use crate::metrics;
use crate::platform::PlatformError;
use crate::state::ids::ChannelId;
use crate::state::managers::{LifecycleManager, Limits};
use crate::telemetry::spans;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Weak};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, warn};

/// Watcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Polling,
    /// Seen empty once; one more empty observation reclaims.
    ConfirmingEmpty,
    Reclaimed,
    /// The channel or its record disappeared without this watcher acting.
    Cancelled,
    /// The ceiling elapsed before the channel was seen empty twice.
    Expired,
}

/// What one tick saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Occupied,
    Empty,
    /// The platform reports the channel gone.
    Missing,
    /// The occupancy query failed.
    Unknown,
}

impl WatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reclaimed | Self::Cancelled | Self::Expired)
    }

    /// Next state after `observation`. `Reclaimed` here means "attempt the
    /// reclamation"; the caller falls back to `Polling` if it loses a race
    /// with a new occupant.
    pub fn advance(self, observation: Observation) -> Self {
        if self.is_terminal() {
            return self;
        }
        match (self, observation) {
            (_, Observation::Missing) => Self::Cancelled,
            (_, Observation::Occupied) => Self::Polling,
            (Self::Polling, Observation::Empty) => Self::ConfirmingEmpty,
            (Self::ConfirmingEmpty, Observation::Empty) => Self::Reclaimed,
            // An unconfirmed observation restarts the debounce.
            (_, Observation::Unknown) => Self::Polling,
            (state, _) => state,
        }
    }
}

/// Channels with a running watcher.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    active: DashMap<ChannelId, Instant>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher for `channel`. Returns false when one is already
    /// registered.
    fn claim(&self, channel: ChannelId) -> bool {
        match self.active.entry(channel) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                true
            }
        }
    }

    fn release(&self, channel: ChannelId) {
        self.active.remove(&channel);
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.active.contains_key(&channel)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Releases the registry entry however the task ends.
struct Claim {
    manager: Weak<LifecycleManager>,
    channel: ChannelId,
}

impl Drop for Claim {
    fn drop(&mut self) {
        metrics::watcher_stopped();
        if let Some(manager) = self.manager.upgrade() {
            manager.watchers().release(self.channel);
        }
    }
}

/// Spawn a watcher for `channel` unless one is already running.
pub fn spawn(manager: &Arc<LifecycleManager>, channel: ChannelId) -> bool {
    if !manager.watchers().claim(channel) {
        debug!(channel = %channel, "Watcher already running");
        return false;
    }
    metrics::watcher_started();

    let claim = Claim {
        manager: Arc::downgrade(manager),
        channel,
    };
    let limits = manager.limits();
    tokio::spawn(
        async move {
            let outcome = watch(&claim.manager, channel, limits).await;
            debug!(outcome = ?outcome, "Watcher finished");
            drop(claim);
        }
        .instrument(spans::watcher(channel)),
    );
    true
}

/// Drive the state machine until a terminal state.
async fn watch(manager: &Weak<LifecycleManager>, channel: ChannelId, limits: Limits) -> WatchState {
    let start = Instant::now();
    let deadline = start + limits.watcher_ceiling;
    let mut ticker = tokio::time::interval_at(start + limits.poll_interval, limits.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = WatchState::Polling;

    loop {
        ticker.tick().await;
        if Instant::now() >= deadline {
            info!(channel = %channel, "Watcher ceiling reached, giving up");
            return WatchState::Expired;
        }

        let Some(manager) = manager.upgrade() else {
            return WatchState::Cancelled;
        };
        // Deleted by its owner or reclaimed on departure.
        if manager.record_of(channel).is_none() {
            return WatchState::Cancelled;
        }

        let observation = match manager.platform().occupancy(channel).await {
            Ok(0) => Observation::Empty,
            Ok(_) => Observation::Occupied,
            Err(PlatformError::NotFound(_)) => Observation::Missing,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Occupancy check failed");
                metrics::record_platform_error("occupancy", e.error_code());
                Observation::Unknown
            }
        };

        state = state.advance(observation);
        match state {
            WatchState::Reclaimed => {
                if manager.reclaim_if_empty(channel).await {
                    return WatchState::Reclaimed;
                }
                if manager.record_of(channel).is_none() {
                    return WatchState::Cancelled;
                }
                state = WatchState::Polling;
            }
            WatchState::Cancelled => {
                // Drops the stale record; a no-op if someone else already did.
                manager.reclaim_if_empty(channel).await;
                return WatchState::Cancelled;
            }
            _ => {}
        }
    }
}
