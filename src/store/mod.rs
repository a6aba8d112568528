//! Durable store: whole-document JSON persistence.
//!
//! The document is small and rewritten in full on every mutation. Writes go
//! to a sibling temp file that is renamed over the real one, so a crash
//! mid-write leaves the previous document intact.

mod schema;

pub use schema::{HostingChannelConfig, KeepaliveConfig, State, TempChannelRecord, TempEntry};

use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Persistence errors. Never fatal: callers log and keep serving from memory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A serialized document tagged with the mutation generation it reflects.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn capture(generation: u64, state: &State) -> Result<Self, StoreError> {
        Ok(Self {
            generation,
            bytes: serde_json::to_vec_pretty(state)?,
        })
    }
}

/// File-backed store. `ephemeral()` keeps nothing on disk (tests, dry runs).
pub struct DurableStore {
    path: Option<PathBuf>,
    /// Highest generation written so far.
    written: Mutex<u64>,
}

impl DurableStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            written: Mutex::new(0),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            path: None,
            written: Mutex::new(0),
        }
    }

    /// Load the document.
    ///
    /// A missing file yields the default document, which is written out
    /// immediately. An unreadable or unparsable file is moved aside to
    /// `<path>.corrupt` and replaced by the default document.
    pub fn load(&self) -> State {
        let Some(path) = self.path.as_deref() else {
            return State::default();
        };

        let contents = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No state file, starting empty");
                return self.reset(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read state file, starting empty");
                return self.reset(path);
            }
        };

        match serde_json::from_slice::<State>(&contents) {
            Ok(state) => {
                info!(
                    path = %path.display(),
                    temp_channels = state.temp_count(),
                    hosting_guilds = state.hosting_channels.len(),
                    "State loaded"
                );
                state
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "State file is corrupt, starting empty");
                let backup = sibling(path, ".corrupt");
                if let Err(e) = fs::rename(path, &backup) {
                    warn!(path = %backup.display(), error = %e, "Failed to keep a copy of the corrupt state file");
                }
                self.reset(path)
            }
        }
    }

    /// Full-document rewrite, bypassing generation ordering.
    pub fn save(&self, state: &State) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(path, &bytes)
    }

    /// Write a snapshot unless a newer one is already on disk.
    ///
    /// Concurrent mutations capture snapshots under the state lock but write
    /// them outside of it; ordering by generation keeps an older snapshot
    /// from clobbering a newer one.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut written = self.written.lock();
        if snapshot.generation <= *written {
            debug!(
                generation = snapshot.generation,
                written = *written,
                "Skipping stale snapshot"
            );
            return Ok(());
        }
        if let Some(path) = self.path.as_deref() {
            write_atomic(path, &snapshot.bytes)?;
        }
        *written = snapshot.generation;
        Ok(())
    }

    fn reset(&self, path: &Path) -> State {
        let state = State::default();
        if let Err(e) = self.save(&state) {
            warn!(path = %path.display(), error = %e, "Failed to write initial state file");
        }
        state
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let temp_path = sibling(path, ".tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "State saved");
    Ok(())
}
