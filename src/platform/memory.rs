//! In-process platform.
//!
//! Keeps channels, voice connections and outbound messages in memory and
//! emits [`PlatformEvent`]s the way a real gateway would. The daemon drives
//! it from the control gateway; tests drive it directly and use its fault
//! injection hooks.

use super::{Platform, PlatformError, PlatformEvent, Principal};
use crate::state::ids::{ChannelId, ChannelKind, GuildId, Member, UserId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Event queue depth between the platform and the event router.
const EVENT_CHANNEL_SIZE: usize = 1024;

/// First snowflake handed out for created channels.
const FIRST_CHANNEL_ID: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct SimChannel {
    pub guild: GuildId,
    pub kind: ChannelKind,
    pub name: String,
    pub category: Option<ChannelId>,
    pub overwrites: HashMap<Principal, bool>,
    pub messages: Vec<String>,
}

#[derive(Default)]
struct World {
    channels: HashMap<ChannelId, SimChannel>,
    voice: HashMap<(GuildId, UserId), ChannelId>,
    direct: Vec<(UserId, String)>,
    create_failures: VecDeque<PlatformError>,
    fail_deletes: bool,
    fail_moves: bool,
    create_latency: Duration,
    creates: u64,
    deletes: u64,
}

/// In-memory [`Platform`] implementation.
pub struct MemoryPlatform {
    world: Mutex<World>,
    next_id: AtomicU64,
    events: mpsc::Sender<PlatformEvent>,
}

impl MemoryPlatform {
    /// Create a platform and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::Receiver<PlatformEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        (
            Self {
                world: Mutex::new(World::default()),
                next_id: AtomicU64::new(FIRST_CHANNEL_ID),
                events,
            },
            rx,
        )
    }

    fn allocate_id(&self) -> ChannelId {
        ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a channel directly (administrator action on the platform).
    pub fn add_channel(&self, guild: GuildId, kind: ChannelKind, name: &str) -> ChannelId {
        let id = self.allocate_id();
        self.world.lock().channels.insert(
            id,
            SimChannel {
                guild,
                kind,
                name: name.to_string(),
                category: None,
                overwrites: HashMap::new(),
                messages: Vec::new(),
            },
        );
        id
    }

    /// Delete a channel behind the core's back.
    pub fn remove_channel_externally(&self, channel: ChannelId) -> bool {
        let mut world = self.world.lock();
        let removed = world.channels.remove(&channel).is_some();
        world.voice.retain(|_, c| *c != channel);
        removed
    }

    /// Connect `member` to a voice channel (or move them) and emit the event.
    pub async fn join_voice(
        &self,
        guild: GuildId,
        member: Member,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        let before = {
            let mut world = self.world.lock();
            match world.channels.get(&channel) {
                Some(c) if c.kind == ChannelKind::Voice && c.guild == guild => {}
                Some(_) => {
                    return Err(PlatformError::Rejected(format!(
                        "{channel} is not a voice channel of guild {guild}"
                    )));
                }
                None => return Err(PlatformError::NotFound(channel)),
            }
            world.voice.insert((guild, member.id), channel)
        };
        self.emit(PlatformEvent::VoiceStateUpdate {
            guild,
            member,
            before,
            after: Some(channel),
        })
        .await;
        Ok(())
    }

    /// Disconnect `member` from voice and emit the event.
    pub async fn leave_voice(&self, guild: GuildId, member: Member) -> Option<ChannelId> {
        let before = self.world.lock().voice.remove(&(guild, member.id))?;
        self.emit(PlatformEvent::VoiceStateUpdate {
            guild,
            member,
            before: Some(before),
            after: None,
        })
        .await;
        Some(before)
    }

    /// Post a message as `author` and emit the event.
    pub async fn post(
        &self,
        guild: GuildId,
        channel: ChannelId,
        author: Member,
        content: &str,
    ) -> Result<(), PlatformError> {
        {
            let mut world = self.world.lock();
            let c = world
                .channels
                .get_mut(&channel)
                .ok_or(PlatformError::NotFound(channel))?;
            c.messages.push(format!("{}: {}", author.display_name, content));
        }
        self.emit(PlatformEvent::MessagePosted {
            guild,
            channel,
            author,
            content: content.to_string(),
        })
        .await;
        Ok(())
    }

    async fn emit(&self, event: PlatformEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Platform event dropped, no router attached");
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn channel(&self, channel: ChannelId) -> Option<SimChannel> {
        self.world.lock().channels.get(&channel).cloned()
    }

    pub fn exists(&self, channel: ChannelId) -> bool {
        self.world.lock().channels.contains_key(&channel)
    }

    pub fn channel_count(&self) -> usize {
        self.world.lock().channels.len()
    }

    pub fn messages(&self, channel: ChannelId) -> Vec<String> {
        self.channel(channel).map(|c| c.messages).unwrap_or_default()
    }

    pub fn direct_messages(&self, user: UserId) -> Vec<String> {
        self.world
            .lock()
            .direct
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn voice_members(&self, channel: ChannelId) -> Vec<UserId> {
        let mut members: Vec<UserId> = self
            .world
            .lock()
            .voice
            .iter()
            .filter(|(_, c)| **c == channel)
            .map(|((_, u), _)| *u)
            .collect();
        members.sort();
        members
    }

    /// Number of successful `create_channel` calls.
    pub fn creates(&self) -> u64 {
        self.world.lock().creates
    }

    /// Number of successful `delete_channel` calls.
    pub fn deletes(&self) -> u64 {
        self.world.lock().deletes
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Make the next `create_channel` call fail with `error`.
    pub fn fail_next_create(&self, error: PlatformError) {
        self.world.lock().create_failures.push_back(error);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.world.lock().fail_deletes = fail;
    }

    pub fn fail_moves(&self, fail: bool) {
        self.world.lock().fail_moves = fail;
    }

    /// Delay every `create_channel` call, widening race windows in tests.
    pub fn set_create_latency(&self, latency: Duration) {
        self.world.lock().create_latency = latency;
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn create_channel(
        &self,
        guild: GuildId,
        kind: ChannelKind,
        name: &str,
        category: Option<ChannelId>,
    ) -> Result<ChannelId, PlatformError> {
        let latency = self.world.lock().create_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let id = self.allocate_id();
        let mut world = self.world.lock();
        if let Some(err) = world.create_failures.pop_front() {
            return Err(err);
        }
        world.channels.insert(
            id,
            SimChannel {
                guild,
                kind,
                name: name.to_string(),
                category,
                overwrites: HashMap::new(),
                messages: Vec::new(),
            },
        );
        world.creates += 1;
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let evicted: Vec<(GuildId, UserId)> = {
            let mut world = self.world.lock();
            if world.fail_deletes {
                return Err(PlatformError::Timeout);
            }
            if world.channels.remove(&channel).is_none() {
                return Err(PlatformError::NotFound(channel));
            }
            world.deletes += 1;
            let evicted = world
                .voice
                .iter()
                .filter(|(_, c)| **c == channel)
                .map(|(k, _)| *k)
                .collect::<Vec<_>>();
            for key in &evicted {
                world.voice.remove(key);
            }
            evicted
        };
        for (guild, user) in evicted {
            self.emit(PlatformEvent::VoiceStateUpdate {
                guild,
                member: Member::new(user, user.to_string()),
                before: Some(channel),
                after: None,
            })
            .await;
        }
        Ok(())
    }

    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        let before = {
            let mut world = self.world.lock();
            if world.fail_moves {
                return Err(PlatformError::Timeout);
            }
            if !world.channels.contains_key(&channel) {
                return Err(PlatformError::NotFound(channel));
            }
            let Some(current) = world.voice.get(&(guild, user)).copied() else {
                return Err(PlatformError::Rejected(format!(
                    "member {user} is not connected to voice"
                )));
            };
            world.voice.insert((guild, user), channel);
            current
        };
        self.emit(PlatformEvent::VoiceStateUpdate {
            guild,
            member: Member::new(user, user.to_string()),
            before: Some(before),
            after: Some(channel),
        })
        .await;
        Ok(())
    }

    async fn set_channel_visibility(
        &self,
        channel: ChannelId,
        principal: Principal,
        visible: bool,
    ) -> Result<(), PlatformError> {
        let mut world = self.world.lock();
        let c = world
            .channels
            .get_mut(&channel)
            .ok_or(PlatformError::NotFound(channel))?;
        c.overwrites.insert(principal, visible);
        Ok(())
    }

    async fn occupancy(&self, channel: ChannelId) -> Result<usize, PlatformError> {
        let world = self.world.lock();
        match world.channels.get(&channel) {
            Some(c) if c.kind == ChannelKind::Voice => {
                Ok(world.voice.values().filter(|v| **v == channel).count())
            }
            Some(_) => Ok(0),
            None => Err(PlatformError::NotFound(channel)),
        }
    }

    async fn voice_channel_of(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.world.lock().voice.get(&(guild, user)).copied()
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError> {
        let mut world = self.world.lock();
        let c = world
            .channels
            .get_mut(&channel)
            .ok_or(PlatformError::NotFound(channel))?;
        c.messages.push(content.to_string());
        Ok(())
    }

    async fn direct_message(&self, user: UserId, content: &str) -> Result<(), PlatformError> {
        self.world.lock().direct.push((user, content.to_string()));
        Ok(())
    }

    fn mention(&self, channel: ChannelId) -> String {
        match self.world.lock().channels.get(&channel) {
            Some(c) => format!("#{}", c.name),
            None => format!("<#{channel}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GuildId = GuildId(1);

    #[tokio::test]
    async fn occupancy_tracks_voice_connections() {
        let (platform, _rx) = MemoryPlatform::new();
        let lobby = platform.add_channel(G, ChannelKind::Voice, "lobby");

        assert_eq!(platform.occupancy(lobby).await, Ok(0));
        platform.join_voice(G, Member::new(UserId(5), "eve"), lobby).await.unwrap();
        assert_eq!(platform.occupancy(lobby).await, Ok(1));
        platform.leave_voice(G, Member::new(UserId(5), "eve")).await;
        assert_eq!(platform.occupancy(lobby).await, Ok(0));
    }

    #[tokio::test]
    async fn deleted_channels_report_not_found() {
        let (platform, _rx) = MemoryPlatform::new();
        let ch = platform
            .create_channel(G, ChannelKind::Voice, "tmp", None)
            .await
            .unwrap();
        platform.delete_channel(ch).await.unwrap();

        assert_eq!(platform.occupancy(ch).await, Err(PlatformError::NotFound(ch)));
        assert_eq!(
            platform.delete_channel(ch).await,
            Err(PlatformError::NotFound(ch))
        );
    }

    #[tokio::test]
    async fn voice_moves_emit_before_and_after() {
        let (platform, mut rx) = MemoryPlatform::new();
        let a = platform.add_channel(G, ChannelKind::Voice, "a");
        let b = platform.add_channel(G, ChannelKind::Voice, "b");
        let eve = Member::new(UserId(5), "eve");

        platform.join_voice(G, eve.clone(), a).await.unwrap();
        platform.move_member(G, eve.id, b).await.unwrap();

        let _join = rx.recv().await.unwrap();
        match rx.recv().await.unwrap() {
            PlatformEvent::VoiceStateUpdate { before, after, .. } => {
                assert_eq!(before, Some(a));
                assert_eq!(after, Some(b));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn injected_create_failure_is_consumed_once() {
        let (platform, _rx) = MemoryPlatform::new();
        platform.fail_next_create(PlatformError::Timeout);

        assert_eq!(
            platform.create_channel(G, ChannelKind::Text, "x", None).await,
            Err(PlatformError::Timeout)
        );
        assert!(platform
            .create_channel(G, ChannelKind::Text, "x", None)
            .await
            .is_ok());
        assert_eq!(platform.creates(), 1);
    }
}
