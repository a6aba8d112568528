//! Temporary channel lifecycle.
//!
//! The `LifecycleManager` is the single writer of the persisted state and
//! the ownership index. Every mutation happens inside one critical section
//! that updates both and captures a snapshot; the snapshot is written after
//! the lock is released. Platform calls never run under the lock.

use super::quota::Reservation;
use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, LifecycleResult, PersistenceError};
use crate::metrics;
use crate::platform::{Platform, PlatformError, Principal};
use crate::services::watcher::{self, WatcherRegistry};
use crate::state::ids::{ChannelId, ChannelKind, GuildId, Member, Permissions, UserId};
use crate::state::index::OwnershipIndex;
use crate::store::{DurableStore, Snapshot, State, TempChannelRecord};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Quota and timing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_temp_per_user: usize,
    pub poll_interval: Duration,
    pub watcher_ceiling: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

impl From<&LifecycleConfig> for Limits {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            max_temp_per_user: config.max_temp_per_user,
            poll_interval: config.poll_interval(),
            watcher_ceiling: config.watcher_ceiling(),
        }
    }
}

/// Outcome of a successful creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created {
    pub channel: ChannelId,
    /// Channels the owner holds in the guild after this creation.
    pub count: usize,
}

/// Everything guarded by the manager's lock.
pub(super) struct Inner {
    pub(super) state: State,
    pub(super) index: OwnershipIndex,
    /// In-flight creations per (guild, user), counted against the quota.
    pub(super) pending: HashMap<(GuildId, UserId), usize>,
    pub(super) generation: u64,
}

impl Inner {
    pub(super) fn new(state: State) -> Self {
        let index = OwnershipIndex::from_state(&state);
        Self {
            state,
            index,
            pending: HashMap::new(),
            generation: 0,
        }
    }
}

/// Owns the durable store, the ownership index and the watcher registry.
pub struct LifecycleManager {
    this: Weak<LifecycleManager>,
    platform: Arc<dyn Platform>,
    store: DurableStore,
    pub(super) inner: Mutex<Inner>,
    watchers: WatcherRegistry,
    limits: Limits,
    pub(super) default_category: Option<ChannelId>,
}

impl LifecycleManager {
    /// Load persisted state and build the index from it.
    ///
    /// Watchers are not started here; call [`resume_watchers`] once the
    /// runtime is serving events.
    ///
    /// [`resume_watchers`]: Self::resume_watchers
    pub fn new(
        platform: Arc<dyn Platform>,
        store: DurableStore,
        limits: Limits,
        default_category: Option<ChannelId>,
    ) -> Arc<Self> {
        let state = store.load();
        let inner = Inner::new(state);
        metrics::set_temp_channels(inner.index.len());
        info!(
            temp_channels = inner.index.len(),
            max_temp_per_user = limits.max_temp_per_user,
            "Lifecycle manager ready"
        );

        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            platform,
            store,
            inner: Mutex::new(inner),
            watchers: WatcherRegistry::new(),
            limits,
            default_category,
        })
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    // ------------------------------------------------------------------
    // Critical sections
    // ------------------------------------------------------------------

    pub(super) fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Apply a mutation and persist it.
    pub(super) fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock();
        let result = f(&mut inner);
        self.commit(inner);
        result
    }

    /// Apply a mutation that may turn out to be a no-op; persist only when
    /// `f` returns `Some`.
    pub(super) fn mutate_if<R>(&self, f: impl FnOnce(&mut Inner) -> Option<R>) -> Option<R> {
        let mut inner = self.inner.lock();
        let result = f(&mut inner)?;
        self.commit(inner);
        Some(result)
    }

    /// Apply a fallible mutation; persist only on success. `f` must leave
    /// the state untouched when it fails.
    pub(super) fn try_mutate<R>(
        &self,
        f: impl FnOnce(&mut Inner) -> LifecycleResult<R>,
    ) -> LifecycleResult<R> {
        let mut inner = self.inner.lock();
        let result = f(&mut inner)?;
        self.commit(inner);
        Ok(result)
    }

    /// Capture a snapshot under the lock, then write it without holding it.
    fn commit(&self, mut inner: MutexGuard<'_, Inner>) {
        inner.generation += 1;
        let generation = inner.generation;
        let snapshot = Snapshot::capture(generation, &inner.state);
        metrics::set_temp_channels(inner.index.len());
        drop(inner);

        if let Err(source) = snapshot.and_then(|s| self.store.write(&s)) {
            let e = PersistenceError { generation, source };
            metrics::record_persistence_failure();
            error!(generation, code = e.error_code(), error = %e, "Failed to persist state");
        }
    }

    fn platform_failure(&self, operation: &'static str, e: PlatformError) -> LifecycleError {
        metrics::record_platform_error(operation, e.error_code());
        warn!(operation, error = %e, "Platform call failed");
        LifecycleError::Platform(e)
    }

    // ------------------------------------------------------------------
    // Core operations
    // ------------------------------------------------------------------

    /// Provision a temporary channel for `owner`.
    ///
    /// A quota slot is reserved before the platform call and converted into
    /// a record only once the channel exists, so a failed or cancelled
    /// creation leaves no record behind. Text channels are hidden from
    /// everyone except the owner; voice channels get a reclamation watcher.
    pub async fn create_temp(
        &self,
        guild: GuildId,
        owner: &Member,
        kind: ChannelKind,
        name: &str,
        category_hint: Option<ChannelId>,
    ) -> LifecycleResult<Created> {
        let user = owner.id;
        let reservation =
            Reservation::acquire(&self.inner, (guild, user), self.limits.max_temp_per_user)
                .inspect_err(|_| {
                    metrics::record_quota_rejection();
                    info!(guild = %guild, user = %user, "Temporary channel quota reached");
                })?;

        let category = category_hint.or_else(|| self.resolve_temporary_category(guild));
        let channel = self
            .platform
            .create_channel(guild, kind, name, category)
            .await
            .map_err(|e| self.platform_failure("create_channel", e))?;

        if kind == ChannelKind::Text
            && let Err(e) = self.restrict_to_owner(channel, user).await
        {
            // Never hand out a text channel everyone can read.
            if let Err(cleanup) = self.platform.delete_channel(channel).await {
                warn!(channel = %channel, error = %cleanup, "Failed to remove unrestricted channel");
            }
            return Err(self.platform_failure("set_channel_visibility", e));
        }

        let count = self.mutate(move |inner| {
            reservation.release_locked(inner);
            inner.state.insert_temp(guild, channel, user, kind);
            inner.index.add(guild, user, channel);
            inner.index.count(guild, user)
        });

        metrics::record_created(kind.as_str());
        info!(
            guild = %guild,
            user = %user,
            channel = %channel,
            kind = %kind,
            count,
            "Temporary channel created"
        );

        if kind == ChannelKind::Voice {
            self.start_watcher(channel);
        }
        Ok(Created { channel, count })
    }

    async fn restrict_to_owner(&self, channel: ChannelId, owner: UserId) -> Result<(), PlatformError> {
        self.platform
            .set_channel_visibility(channel, Principal::Everyone, false)
            .await?;
        self.platform
            .set_channel_visibility(channel, Principal::Member(owner), true)
            .await
    }

    /// Delete a temporary channel on behalf of its owner or an administrator.
    ///
    /// The record is removed first; whoever removes it owns the platform
    /// deletion, so concurrent deleters and reclaimers never both act. A
    /// platform failure is logged and does not restore the record.
    pub async fn delete_temp(
        &self,
        guild: GuildId,
        channel: ChannelId,
        requester: UserId,
        permissions: Permissions,
    ) -> LifecycleResult<TempChannelRecord> {
        let record = self.try_mutate(|inner| {
            let record = inner
                .state
                .temp_record(guild, channel)
                .ok_or(LifecycleError::NotFound(channel))?;
            if record.owner_id != requester && !permissions.administrator {
                return Err(LifecycleError::NotAuthorized);
            }
            inner.state.remove_temp(guild, channel);
            inner.index.remove(guild, channel);
            Ok(record)
        })?;

        self.delete_on_platform(channel).await;
        metrics::record_deleted("deleted");
        info!(guild = %guild, user = %requester, channel = %channel, "Temporary channel deleted");
        Ok(record)
    }

    /// Hand a temporary channel to `new_owner`.
    ///
    /// Only the current owner may transfer; the new owner's quota is not
    /// checked. No platform call is made.
    pub fn transfer_ownership(
        &self,
        guild: GuildId,
        channel: ChannelId,
        requester: UserId,
        new_owner: UserId,
    ) -> LifecycleResult<()> {
        self.try_mutate(|inner| {
            let record = inner
                .state
                .temp_record(guild, channel)
                .ok_or(LifecycleError::NotFound(channel))?;
            if record.owner_id != requester {
                return Err(LifecycleError::NotAuthorized);
            }
            inner.state.set_temp_owner(guild, channel, new_owner);
            inner.index.transfer(guild, channel, requester, new_owner);
            Ok(())
        })?;

        info!(
            guild = %guild,
            channel = %channel,
            from = %requester,
            to = %new_owner,
            "Temporary channel ownership transferred"
        );
        Ok(())
    }

    /// Delete `channel` if it is a voice temporary channel nobody occupies.
    ///
    /// Returns true only when this call removed the record. Safe to call
    /// any number of times, from watchers and departure handlers alike.
    pub async fn reclaim_if_empty(&self, channel: ChannelId) -> bool {
        let Some(record) = self.record_of(channel) else {
            return false;
        };
        if record.kind != ChannelKind::Voice {
            return false;
        }

        let on_platform = match self.platform.occupancy(channel).await {
            Ok(0) => true,
            Ok(occupants) => {
                debug!(channel = %channel, occupants, "Channel in use, not reclaiming");
                return false;
            }
            Err(PlatformError::NotFound(_)) => false,
            Err(e) => {
                // Emptiness unconfirmed; try again on the next observation.
                self.platform_failure("occupancy", e);
                return false;
            }
        };

        let removed = self
            .mutate_if(|inner| {
                let record = inner.state.remove_temp(record.guild_id, channel)?;
                inner.index.remove(record.guild_id, channel);
                Some(record)
            })
            .is_some();
        if !removed {
            return false;
        }

        if on_platform {
            self.delete_on_platform(channel).await;
        }
        metrics::record_deleted("reclaimed");
        info!(
            guild = %record.guild_id,
            user = %record.owner_id,
            channel = %channel,
            external = !on_platform,
            "Temporary channel reclaimed"
        );
        true
    }

    /// Mark `channel` as voice after a voice state update referenced it.
    ///
    /// Records loaded from bare owner ids default to text; the first voice
    /// event for one of them upgrades it and starts its watcher. Returns
    /// true when a record was upgraded.
    pub fn confirm_voice(&self, channel: ChannelId) -> bool {
        let upgraded = self.mutate_if(|inner| {
            let (guild, _) = inner.index.locate(channel)?;
            let entry = inner
                .state
                .temp_channels
                .get_mut(&guild)?
                .get_mut(&channel)?;
            if entry.kind == ChannelKind::Voice {
                return None;
            }
            entry.kind = ChannelKind::Voice;
            Some(guild)
        });
        let Some(guild) = upgraded else {
            return false;
        };
        info!(guild = %guild, channel = %channel, "Temporary channel recorded as voice");
        self.start_watcher(channel);
        true
    }

    async fn delete_on_platform(&self, channel: ChannelId) {
        match self.platform.delete_channel(channel).await {
            Ok(()) | Err(PlatformError::NotFound(_)) => {}
            Err(e) => {
                self.platform_failure("delete_channel", e);
            }
        }
    }

    /// Temporary channels `user` owns in `guild`, ascending.
    pub fn list_owned(&self, guild: GuildId, user: UserId) -> Vec<ChannelId> {
        self.read(|inner| inner.index.owned(guild, user))
    }

    pub fn count(&self, guild: GuildId, user: UserId) -> usize {
        self.read(|inner| inner.index.count(guild, user))
    }

    /// The live record for `channel`, in whichever guild holds it.
    pub fn record_of(&self, channel: ChannelId) -> Option<TempChannelRecord> {
        self.read(|inner| {
            let (guild, _) = inner.index.locate(channel)?;
            inner.state.temp_record(guild, channel)
        })
    }

    /// Let `target` into a temporary or hosting channel.
    ///
    /// Voice: the target must already be connected somewhere and is moved
    /// in. Text: the target is granted visibility.
    pub async fn invite(
        &self,
        guild: GuildId,
        channel: ChannelId,
        permissions: Permissions,
        target: UserId,
    ) -> LifecycleResult<ChannelKind> {
        if !permissions.can_manage_channels() {
            return Err(LifecycleError::NotAuthorized);
        }
        let kind = self
            .read(|inner| {
                inner
                    .state
                    .temp_record(guild, channel)
                    .map(|r| r.kind)
                    .or_else(|| inner.state.hosting(guild, channel).map(|h| h.kind))
            })
            .ok_or(LifecycleError::NotFound(channel))?;

        match kind {
            ChannelKind::Voice => {
                if self.platform.voice_channel_of(guild, target).await.is_none() {
                    return Err(LifecycleError::TargetNotConnected(target));
                }
                self.platform
                    .move_member(guild, target, channel)
                    .await
                    .map_err(|e| self.platform_failure("move_member", e))?;
            }
            ChannelKind::Text => {
                self.platform
                    .set_channel_visibility(channel, Principal::Member(target), true)
                    .await
                    .map_err(|e| self.platform_failure("set_channel_visibility", e))?;
            }
        }
        info!(guild = %guild, channel = %channel, user = %target, kind = %kind, "Member invited");
        Ok(kind)
    }

    // ------------------------------------------------------------------
    // Watchers
    // ------------------------------------------------------------------

    /// Start a reclamation watcher for `channel`. Returns false when one is
    /// already running.
    pub fn start_watcher(&self, channel: ChannelId) -> bool {
        match self.this.upgrade() {
            Some(manager) => watcher::spawn(&manager, channel),
            None => false,
        }
    }

    /// Start watchers for every persisted voice record. Watchers die with
    /// the process, so this runs once at startup.
    pub fn resume_watchers(&self) -> usize {
        let voice: Vec<ChannelId> = self.read(|inner| {
            inner
                .state
                .temp_records()
                .filter(|r| r.kind == ChannelKind::Voice)
                .map(|r| r.channel_id)
                .collect()
        });
        let started = voice
            .into_iter()
            .filter(|channel| self.start_watcher(*channel))
            .count();
        info!(started, "Reclamation watchers resumed");
        started
    }

    /// Copy of the persisted state (diagnostics and tests).
    pub fn snapshot_state(&self) -> State {
        self.read(|inner| inner.state.clone())
    }

    /// True when the index matches one rebuilt from the persisted state.
    pub fn index_consistent(&self) -> bool {
        self.read(|inner| inner.index == OwnershipIndex::from_state(&inner.state))
    }
}
