//! Control protocol.
//!
//! One request per line, space-separated. The gateway stands in for the chat
//! platform: it creates platform channels, moves members in and out of
//! voice, posts messages and invokes commands.
//!
//! ```text
//! PING
//! CHANNEL <guild> <text|voice> <name...>
//! JOIN    <guild> <user> <display_name> <channel>
//! LEAVE   <guild> <user> <display_name>
//! POST    <guild> <channel> <user> <display_name> <text...>
//! CMD     <guild> <user> <display_name> <perms> <channel|-> <command> [args...]
//! STATS
//! ```
//!
//! `perms` is `-` or a comma-separated list of `admin` and `manage`. The
//! daemon answers `PONG`, `OK [id]`, or `ERR <reason>`; command replies come
//! back as `REPLY <line>` lines terminated by `END`.

use crate::state::ids::{ChannelId, ChannelKind, GuildId, Member, Permissions, UserId};
use std::str::FromStr;
use thiserror::Error;

/// A parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    Channel {
        guild: GuildId,
        kind: ChannelKind,
        name: String,
    },
    Join {
        guild: GuildId,
        member: Member,
        channel: ChannelId,
    },
    Leave {
        guild: GuildId,
        member: Member,
    },
    Post {
        guild: GuildId,
        channel: ChannelId,
        author: Member,
        text: String,
    },
    Command {
        guild: GuildId,
        member: Member,
        permissions: Permissions,
        channel: Option<ChannelId>,
        name: String,
        args: Vec<String>,
    },
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("unknown request: {0}")]
    UnknownVerb(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

struct Fields<'a> {
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn word(&mut self, field: &'static str) -> Result<&'a str, ProtocolError> {
        self.words.next().ok_or(ProtocolError::Missing(field))
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T, ProtocolError> {
        let raw = self.word(field)?;
        raw.parse().map_err(|_| ProtocolError::Invalid {
            field,
            value: raw.to_string(),
        })
    }

    fn member(&mut self) -> Result<Member, ProtocolError> {
        let id: UserId = self.parse("user")?;
        let name = self.word("display_name")?;
        Ok(Member::new(id, name))
    }

    fn rest(self) -> Vec<&'a str> {
        self.words.collect()
    }
}

fn parse_permissions(raw: &str) -> Result<Permissions, ProtocolError> {
    let mut permissions = Permissions::NONE;
    if raw == "-" {
        return Ok(permissions);
    }
    for flag in raw.split(',') {
        match flag {
            "admin" => permissions.administrator = true,
            "manage" => permissions.manage_channels = true,
            _ => {
                return Err(ProtocolError::Invalid {
                    field: "perms",
                    value: raw.to_string(),
                });
            }
        }
    }
    Ok(permissions)
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = Fields {
            words: line.split_whitespace(),
        };
        let verb = fields.words.next().ok_or(ProtocolError::Empty)?;

        match verb.to_ascii_uppercase().as_str() {
            "PING" => Ok(Self::Ping),
            "STATS" => Ok(Self::Stats),
            "CHANNEL" => {
                let guild = fields.parse("guild")?;
                let kind = fields.parse("kind")?;
                let name = fields.rest().join(" ");
                if name.is_empty() {
                    return Err(ProtocolError::Missing("name"));
                }
                Ok(Self::Channel { guild, kind, name })
            }
            "JOIN" => Ok(Self::Join {
                guild: fields.parse("guild")?,
                member: fields.member()?,
                channel: fields.parse("channel")?,
            }),
            "LEAVE" => Ok(Self::Leave {
                guild: fields.parse("guild")?,
                member: fields.member()?,
            }),
            "POST" => {
                let guild = fields.parse("guild")?;
                let channel = fields.parse("channel")?;
                let author = fields.member()?;
                let text = fields.rest().join(" ");
                if text.is_empty() {
                    return Err(ProtocolError::Missing("text"));
                }
                Ok(Self::Post {
                    guild,
                    channel,
                    author,
                    text,
                })
            }
            "CMD" => {
                let guild = fields.parse("guild")?;
                let member = fields.member()?;
                let permissions = parse_permissions(fields.word("perms")?)?;
                let channel = match fields.word("channel")? {
                    "-" => None,
                    raw => Some(raw.parse().map_err(|_| ProtocolError::Invalid {
                        field: "channel",
                        value: raw.to_string(),
                    })?),
                };
                let name = fields.word("command")?.to_string();
                let args = fields.rest().into_iter().map(String::from).collect();
                Ok(Self::Command {
                    guild,
                    member,
                    permissions,
                    channel,
                    name,
                    args,
                })
            }
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        let request: Request = "CMD 1 10 alice admin,manage 5 create_temp voice my room"
            .parse()
            .unwrap();
        assert_eq!(
            request,
            Request::Command {
                guild: GuildId(1),
                member: Member::new(UserId(10), "alice"),
                permissions: Permissions::ADMIN,
                channel: Some(ChannelId(5)),
                name: "create_temp".into(),
                args: vec!["voice".into(), "my".into(), "room".into()],
            }
        );
    }

    #[test]
    fn commands_may_come_from_no_channel() {
        let request: Request = "cmd 1 10 alice - - list_temp".parse().unwrap();
        assert!(matches!(
            request,
            Request::Command { channel: None, permissions: Permissions::NONE, .. }
        ));
    }

    #[test]
    fn posts_keep_their_text() {
        let request: Request = "POST 1 7 11 bob hello there".parse().unwrap();
        assert_eq!(
            request,
            Request::Post {
                guild: GuildId(1),
                channel: ChannelId(7),
                author: Member::new(UserId(11), "bob"),
                text: "hello there".into(),
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!("".parse::<Request>(), Err(ProtocolError::Empty));
        assert_eq!(
            "JOIN 1 10".parse::<Request>(),
            Err(ProtocolError::Missing("display_name"))
        );
        assert_eq!(
            "JOIN x 10 a 5".parse::<Request>(),
            Err(ProtocolError::Invalid {
                field: "guild",
                value: "x".into()
            })
        );
        assert_eq!(
            "CMD 1 10 a root - list_temp".parse::<Request>(),
            Err(ProtocolError::Invalid {
                field: "perms",
                value: "root".into()
            })
        );
        assert!(matches!(
            "DANCE".parse::<Request>(),
            Err(ProtocolError::UnknownVerb(_))
        ));
    }
}
