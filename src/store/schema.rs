//! Persisted document layout.
//!
//! One JSON document with six top-level sections, each keyed by guild (or by
//! user/channel for the language scopes). Missing sections deserialize as
//! empty so older files keep loading.

use crate::state::ids::{ChannelId, ChannelKind, GuildId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The whole persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub hosting_channels: BTreeMap<GuildId, BTreeMap<ChannelId, HostingChannelConfig>>,
    pub temp_channels: BTreeMap<GuildId, BTreeMap<ChannelId, TempEntry>>,
    pub user_lang: BTreeMap<UserId, String>,
    pub channel_lang: BTreeMap<ChannelId, String>,
    pub server_lang: BTreeMap<GuildId, String>,
    pub keepalive_config: BTreeMap<GuildId, KeepaliveConfig>,
}

/// A channel that spawns temporary channels when members interact with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingChannelConfig {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub temp_category_id: Option<ChannelId>,
    pub owner_id: UserId,
}

/// Stored value for one live temporary channel.
///
/// Older documents stored the bare owner id; those load as text channels so
/// no watcher is resumed for a channel of unknown kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TempEntryRepr")]
pub struct TempEntry {
    pub owner_id: UserId,
    pub kind: ChannelKind,
}

impl TempEntry {
    #[inline]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TempEntryRepr {
    Full { owner_id: UserId, kind: ChannelKind },
    Legacy(UserId),
}

impl From<TempEntryRepr> for TempEntry {
    fn from(repr: TempEntryRepr) -> Self {
        match repr {
            TempEntryRepr::Full { owner_id, kind } => Self { owner_id, kind },
            TempEntryRepr::Legacy(owner_id) => Self {
                owner_id,
                kind: ChannelKind::Text,
            },
        }
    }
}

/// A live temporary channel, flattened out of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempChannelRecord {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub owner_id: UserId,
    pub kind: ChannelKind,
}

/// Periodic heartbeat message configuration for one guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    pub channel_id: ChannelId,
    pub interval_minutes: u32,
    pub message: String,
    /// Unix timestamp (seconds) of the last heartbeat, 0 when never sent.
    #[serde(default)]
    pub last_sent: f64,
}

impl State {
    pub fn temp_record(&self, guild: GuildId, channel: ChannelId) -> Option<TempChannelRecord> {
        self.temp_channels
            .get(&guild)?
            .get(&channel)
            .map(|entry| TempChannelRecord {
                channel_id: channel,
                guild_id: guild,
                owner_id: entry.owner_id,
                kind: entry.kind,
            })
    }

    /// All temporary records, in guild then channel order.
    pub fn temp_records(&self) -> impl Iterator<Item = TempChannelRecord> + '_ {
        self.temp_channels.iter().flat_map(|(guild, channels)| {
            channels.iter().map(|(channel, entry)| TempChannelRecord {
                channel_id: *channel,
                guild_id: *guild,
                owner_id: entry.owner_id,
                kind: entry.kind,
            })
        })
    }

    pub fn insert_temp(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        owner: UserId,
        kind: ChannelKind,
    ) {
        self.temp_channels.entry(guild).or_default().insert(
            channel,
            TempEntry {
                owner_id: owner,
                kind,
            },
        );
    }

    pub fn remove_temp(&mut self, guild: GuildId, channel: ChannelId) -> Option<TempChannelRecord> {
        let channels = self.temp_channels.get_mut(&guild)?;
        let entry = channels.remove(&channel)?;
        if channels.is_empty() {
            self.temp_channels.remove(&guild);
        }
        Some(TempChannelRecord {
            channel_id: channel,
            guild_id: guild,
            owner_id: entry.owner_id,
            kind: entry.kind,
        })
    }

    /// Reassign the owner of a record. Returns false when there is no record.
    pub fn set_temp_owner(&mut self, guild: GuildId, channel: ChannelId, owner: UserId) -> bool {
        match self
            .temp_channels
            .get_mut(&guild)
            .and_then(|channels| channels.get_mut(&channel))
        {
            Some(entry) => {
                entry.owner_id = owner;
                true
            }
            None => false,
        }
    }

    pub fn hosting(&self, guild: GuildId, channel: ChannelId) -> Option<&HostingChannelConfig> {
        self.hosting_channels.get(&guild)?.get(&channel)
    }

    pub fn temp_count(&self) -> usize {
        self.temp_channels.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_default_to_empty() {
        let state: State = serde_json::from_str(r#"{"temp_channels": {}}"#).unwrap();
        assert!(state.hosting_channels.is_empty());
        assert!(state.keepalive_config.is_empty());
    }

    #[test]
    fn legacy_owner_only_entries_load_as_text() {
        let json = r#"{"temp_channels": {"1": {"100": 7, "101": {"owner_id": 8, "kind": "voice"}}}}"#;
        let state: State = serde_json::from_str(json).unwrap();

        let legacy = state.temp_record(GuildId(1), ChannelId(100)).unwrap();
        assert_eq!(legacy.owner_id, UserId(7));
        assert_eq!(legacy.kind, ChannelKind::Text);

        let full = state.temp_record(GuildId(1), ChannelId(101)).unwrap();
        assert_eq!(full.owner_id, UserId(8));
        assert_eq!(full.kind, ChannelKind::Voice);
    }

    #[test]
    fn hosting_kind_is_persisted_as_type() {
        let cfg = HostingChannelConfig {
            kind: ChannelKind::Voice,
            temp_category_id: None,
            owner_id: UserId(3),
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["type"], "voice");
        assert!(json["temp_category_id"].is_null());
    }

    #[test]
    fn removing_last_record_drops_the_guild_section() {
        let mut state = State::default();
        state.insert_temp(GuildId(1), ChannelId(5), UserId(2), ChannelKind::Voice);
        assert!(state.remove_temp(GuildId(1), ChannelId(5)).is_some());
        assert!(state.temp_channels.is_empty());
        assert!(state.remove_temp(GuildId(1), ChannelId(5)).is_none());
    }
}
