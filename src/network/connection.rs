//! Connection - handles one control client.
//!
//! Reads requests line by line, applies them to the platform or the command
//! registry and writes the response lines back. A malformed line gets an
//! `ERR` and the connection stays open.

use super::protocol::{ProtocolError, Request};
use crate::handlers::Registry;
use crate::platform::MemoryPlatform;
use crate::state::ids::Invoker;
use crate::state::managers::LifecycleManager;
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};
use tracing::debug;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Codec(#[from] LinesCodecError),
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Codec(_) => "codec",
        }
    }
}

/// One decoded input line.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line(String),
    /// An oversized line; the codec has skipped past it.
    TooLong,
}

/// `LinesCodec` that reports oversized lines as frames. `Framed` ends the
/// stream after any decoder error, so the overflow cannot surface as one.
struct ControlCodec(LinesCodec);

impl ControlCodec {
    fn new(max_line_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_line_length))
    }

    fn frame(result: Result<Option<String>, LinesCodecError>) -> Result<Option<Frame>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::TooLong)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for ControlCodec {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode_eof(buf))
    }
}

impl<T: AsRef<str>> Encoder<T> for ControlCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), LinesCodecError> {
        self.0.encode(line, buf)
    }
}

/// A control client connection.
pub struct Connection {
    addr: SocketAddr,
    framed: Framed<TcpStream, ControlCodec>,
    platform: Arc<MemoryPlatform>,
    manager: Arc<LifecycleManager>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        max_line_length: usize,
        platform: Arc<MemoryPlatform>,
        manager: Arc<LifecycleManager>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            addr,
            framed: Framed::new(stream, ControlCodec::new(max_line_length)),
            platform,
            manager,
            registry,
        }
    }

    /// Serve requests until the peer disconnects.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        while let Some(frame) = self.framed.next().await {
            let line = match frame? {
                Frame::Line(line) => line,
                Frame::TooLong => {
                    self.framed.send("ERR line too long").await?;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let response = match line.parse::<Request>() {
                Ok(request) => self.execute(request).await,
                Err(e) => vec![format!("ERR {e}")],
            };
            for out in response {
                self.framed.send(out).await?;
            }
        }
        debug!(peer = %self.addr, "Peer closed the connection");
        Ok(())
    }

    async fn execute(&self, request: Request) -> Vec<String> {
        match request {
            Request::Ping => vec!["PONG".to_string()],
            Request::Channel { guild, kind, name } => {
                let id = self.platform.add_channel(guild, kind, &name);
                vec![format!("OK {id}")]
            }
            Request::Join {
                guild,
                member,
                channel,
            } => status(self.platform.join_voice(guild, member, channel).await),
            Request::Leave { guild, member } => match self.platform.leave_voice(guild, member).await {
                Some(channel) => vec![format!("OK {channel}")],
                None => vec![format!("ERR {}", ProtocolError::Missing("voice connection"))],
            },
            Request::Post {
                guild,
                channel,
                author,
                text,
            } => status(self.platform.post(guild, channel, author, &text).await),
            Request::Command {
                guild,
                member,
                permissions,
                channel,
                name,
                args,
            } => {
                let invoker = Invoker {
                    guild,
                    member,
                    channel,
                    permissions,
                };
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                let reply = self
                    .registry
                    .dispatch(&self.manager, &invoker, &name, &args)
                    .await;
                block(reply.lines().map(str::to_string))
            }
            Request::Stats => block(
                self.registry
                    .command_stats()
                    .into_iter()
                    .map(|(name, count)| format!("{name} {count}")),
            ),
        }
    }
}

fn status<E: std::fmt::Display>(result: Result<(), E>) -> Vec<String> {
    match result {
        Ok(()) => vec!["OK".to_string()],
        Err(e) => vec![format!("ERR {e}")],
    }
}

/// `REPLY` lines followed by `END`.
fn block(lines: impl Iterator<Item = String>) -> Vec<String> {
    lines
        .map(|line| format!("REPLY {line}"))
        .chain(std::iter::once("END".to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_lines_become_frames_and_decoding_resumes() {
        let mut codec = ControlCodec::new(8);
        let mut buf = BytesMut::from("PING\nwaytoolongline\nSTATS\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Line("PING".into())));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::TooLong));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Line("STATS".into())));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }
}
