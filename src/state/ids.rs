//! Platform identifiers and small domain types shared by every layer.
//!
//! Identifiers are platform snowflakes. They serialize as bare integers, and
//! as their decimal string when used as JSON object keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw snowflake value.
            #[inline]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

snowflake!(
    /// A community ("guild"/"server") on the platform.
    GuildId
);
snowflake!(
    /// A platform user (member of one or more guilds).
    UserId
);
snowflake!(
    /// A channel or category on the platform.
    ChannelId
);

/// What a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Returned when a channel kind string is neither `text` nor `voice`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("channel kind must be 'text' or 'voice', got '{0}'")]
pub struct UnknownKind(pub String);

/// The author of an event or the target of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub display_name: String,
    pub bot: bool,
}

impl Member {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            bot: false,
        }
    }
}

/// Guild-level capabilities of the member invoking a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub administrator: bool,
    pub manage_channels: bool,
}

impl Permissions {
    pub const NONE: Self = Self {
        administrator: false,
        manage_channels: false,
    };

    pub const ADMIN: Self = Self {
        administrator: true,
        manage_channels: true,
    };

    /// Administrators implicitly hold every other capability.
    pub fn can_manage_channels(self) -> bool {
        self.administrator || self.manage_channels
    }
}

/// Who is invoking a command, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub guild: GuildId,
    pub member: Member,
    pub channel: Option<ChannelId>,
    pub permissions: Permissions,
}

impl Invoker {
    #[inline]
    pub fn user(&self) -> UserId {
        self.member.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn snowflakes_are_string_keys_in_json() {
        let mut map = BTreeMap::new();
        map.insert(ChannelId(42), UserId(7));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"42":7}"#);

        let back: BTreeMap<ChannelId, UserId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&ChannelId(42)), Some(&UserId(7)));
    }

    #[test]
    fn channel_kind_parses_case_insensitively() {
        assert_eq!("Voice".parse::<ChannelKind>(), Ok(ChannelKind::Voice));
        assert_eq!("TEXT".parse::<ChannelKind>(), Ok(ChannelKind::Text));
        assert!("stage".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn administrator_implies_manage_channels() {
        let admin = Permissions {
            administrator: true,
            manage_channels: false,
        };
        assert!(admin.can_manage_channels());
        assert!(!Permissions::NONE.can_manage_channels());
    }
}
