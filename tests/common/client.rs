//! Test control client.
//!
//! Sends request lines and reads the daemon's status and reply blocks.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test control client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send a raw request line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one response line.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Send a request answered by a single status line.
    pub async fn request(&mut self, line: &str) -> anyhow::Result<String> {
        self.send_raw(line).await?;
        self.recv().await
    }

    /// Send a request answered by a `REPLY` block and return the reply
    /// lines without their prefix.
    pub async fn request_block(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        self.send_raw(line).await?;
        let mut lines = Vec::new();
        loop {
            let response = self.recv().await?;
            if response == "END" {
                return Ok(lines);
            }
            match response.strip_prefix("REPLY ") {
                Some(reply) => lines.push(reply.to_string()),
                None => anyhow::bail!("unexpected line in reply block: {response}"),
            }
        }
    }

    /// Create a platform channel and return its id.
    pub async fn create_channel(&mut self, guild: u64, kind: &str, name: &str) -> anyhow::Result<u64> {
        let response = self
            .request(&format!("CHANNEL {guild} {kind} {name}"))
            .await?;
        let id = response
            .strip_prefix("OK ")
            .ok_or_else(|| anyhow::anyhow!("unexpected response: {response}"))?;
        Ok(id.parse()?)
    }
}
