// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk state directory.
//!
//! Snapshots are stored as versioned JSON envelopes and written atomically:
//! the new content goes to `<file>.tmp`, is fsynced, then renamed over the
//! committed file. A crash mid-write leaves the previous snapshot intact.
//!
//! Loading is tolerant. A missing file yields nothing, and an undecodable or
//! newer-version file is moved aside to `<file>.corrupt` so startup proceeds
//! with default state.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::remote_config::RemoteConfigSnapshot;
use crate::state::QueueState;

/// Snapshot schema version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

pub const QUEUE_FILE: &str = "queue.json";
pub const REMOTE_CONFIG_FILE: &str = "remote_config.json";
pub const SETTINGS_FILE: &str = "config.toml";
pub const LOCK_FILE: &str = "outbound.lock";
pub const LOG_FILE: &str = "outbound.log";

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    data: Value,
}

/// Writes `value` to `path` inside a versioned envelope, atomically.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(&Envelope { version: SNAPSHOT_VERSION, data: value })?;
    let tmp = sibling(path, "tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let raw: RawEnvelope = serde_json::from_slice(&bytes)?;
    if raw.version > SNAPSHOT_VERSION {
        return Err(Error::UnsupportedVersion { found: raw.version, supported: SNAPSHOT_VERSION });
    }
    Ok(Some(serde_json::from_value(raw.data)?))
}

/// Reads a snapshot, moving an unreadable file aside instead of failing.
pub fn load_or_set_aside<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match read_snapshot(path) {
        Ok(value) => value,
        Err(Error::Io(e)) => {
            warn!(path = %path.display(), error = %e, "cannot read snapshot, using defaults");
            None
        }
        Err(e) => {
            let backup = sibling(path, "corrupt");
            match fs::rename(path, &backup) {
                Ok(()) => warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "unreadable snapshot set aside"
                ),
                Err(rename_err) => warn!(
                    path = %path.display(),
                    error = %e,
                    rename_error = %rename_err,
                    "unreadable snapshot could not be set aside"
                ),
            }
            None
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Exclusive handle on a state directory.
///
/// The advisory lock on `outbound.lock` is held until the handle is dropped,
/// so only one process at a time writes the snapshots.
#[derive(Debug)]
pub struct StateDir {
    root: PathBuf,
    _lock: File,
}

impl StateDir {
    /// Creates the directory if needed and takes the writer lock.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(root.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| Error::StateDirLocked(root.clone()))?;
        debug!(root = %root.display(), "state directory opened");
        Ok(StateDir { root, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn queue_path(&self) -> PathBuf {
        self.root.join(QUEUE_FILE)
    }

    pub fn remote_config_path(&self) -> PathBuf {
        self.root.join(REMOTE_CONFIG_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    /// Loads the queue, falling back to an empty one.
    pub fn load_queue(&self) -> QueueState {
        let mut state: QueueState = load_or_set_aside(&self.queue_path()).unwrap_or_default();
        let discarded = state.discard_unattributed();
        if discarded > 0 {
            warn!(discarded, "dropped queued calls without an identity");
        }
        state
    }

    pub fn save_queue(&self, state: &QueueState) -> Result<()> {
        write_snapshot(&self.queue_path(), state)
    }

    /// Loads the cached remote config, if one was ever fetched.
    pub fn load_remote_config(&self) -> Option<RemoteConfigSnapshot> {
        load_or_set_aside(&self.remote_config_path())
    }

    pub fn save_remote_config(&self, snapshot: &RemoteConfigSnapshot) -> Result<()> {
        write_snapshot(&self.remote_config_path(), snapshot)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
