// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State directory resolution and the cross-process sync lock.
//!
//! The state directory holds `outbox.db`, `config.toml`, `outbox.log`,
//! `sync.lock`, and `syncing.lock`. It is chosen in this order:
//!
//! 1. `--dir <path>`
//! 2. `$OUTBOX_DIR`
//! 3. `<data dir>/outbox` (e.g. `~/.local/share/outbox`)

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::env;
use crate::error::{Error, Result};

/// Name of the lock file taken by commands that drive the engine.
pub const LOCK_FILE_NAME: &str = "sync.lock";

/// Name of the lock file held only while a sync run is in progress.
pub const RUN_MARKER_FILE_NAME: &str = "syncing.lock";

/// Name of the log file written by `outbox run`.
pub const LOG_FILE_NAME: &str = "outbox.log";

/// Resolves the state directory without creating it.
pub fn resolve_dir(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env::state_dir() {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("outbox"))
        .ok_or(Error::NoStateDir)
}

/// Resolves and creates the state directory.
pub fn ensure_dir(flag: Option<&Path>) -> Result<PathBuf> {
    let dir = resolve_dir(flag)?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Exclusive lock on `<dir>/sync.lock`, held until dropped.
#[derive(Debug)]
pub struct SyncLock {
    file: File,
}

impl SyncLock {
    /// Takes the lock without waiting.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let file = open_lock_file(&dir.join(LOCK_FILE_NAME))?;
        file.try_lock_exclusive()
            .map_err(|_| Error::Locked(dir.display().to_string()))?;
        Ok(SyncLock { file })
    }

    /// Returns true if another process currently holds the lock.
    pub fn is_held(dir: &Path) -> bool {
        is_locked(&dir.join(LOCK_FILE_NAME))
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Marks a sync run in progress on `<dir>/syncing.lock`.
///
/// Only the holder of [`SyncLock`] sets the marker, so `status` can tell a
/// running engine apart from a process that merely owns the queue.
#[derive(Debug)]
pub struct RunMarker {
    path: PathBuf,
    file: Option<File>,
}

impl RunMarker {
    pub fn new(dir: &Path) -> Self {
        RunMarker {
            path: dir.join(RUN_MARKER_FILE_NAME),
            file: None,
        }
    }

    /// Takes or releases the marker to match `syncing`.
    pub fn set(&mut self, syncing: bool) -> Result<()> {
        match (syncing, self.file.take()) {
            (true, None) => {
                let file = open_lock_file(&self.path)?;
                file.try_lock_exclusive()
                    .map_err(|_| Error::Locked(self.path.display().to_string()))?;
                self.file = Some(file);
            }
            (true, held) => self.file = held,
            (false, Some(file)) => {
                let _ = FileExt::unlock(&file);
            }
            (false, None) => {}
        }
        Ok(())
    }

    /// Returns true while some process has a sync run in progress.
    pub fn is_held(dir: &Path) -> bool {
        is_locked(&dir.join(RUN_MARKER_FILE_NAME))
    }
}

impl Drop for RunMarker {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn is_locked(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    match file.try_lock_shared() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
