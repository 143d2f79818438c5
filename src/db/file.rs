// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed credential store.
//!
//! Keeps the session alive across restarts by writing both tokens to a JSON
//! file with restricted permissions (0600 on Unix). The file is read once on
//! open; every `set`/`clear` writes through. When both slots are empty the
//! file is removed so a logged-out client leaves no secrets on disk.

use super::CredentialStore;
use crate::error::StoreError;
use crate::models::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// On-disk layout of the credentials file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh: Option<String>,
    /// Last time either slot was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl CredentialFile {
    fn slot(&self, slot: Slot) -> &Option<String> {
        match slot {
            Slot::Access => &self.access,
            Slot::Refresh => &self.refresh,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<String> {
        match slot {
            Slot::Access => &mut self.access,
            Slot::Refresh => &mut self.refresh,
        }
    }

    fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Credential store persisted to a JSON file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<CredentialFile>,
}

impl FileCredentialStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => CredentialFile::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        tracing::debug!(
            path = %path.display(),
            has_access = state.access.is_some(),
            has_refresh = state.refresh.is_some(),
            "Opened credential store"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, CredentialFile> {
        // A panic mid-update leaves plain strings behind; the data is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current state to disk while the lock is held, so file
    /// contents follow the same order as in-memory updates.
    fn persist(&self, state: &CredentialFile) {
        let result = if state.is_empty() {
            remove_if_exists(&self.path)
        } else {
            write_private(&self.path, state)
        };

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to persist credentials"
            );
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, slot: Slot) -> Option<String> {
        self.lock().slot(slot).clone()
    }

    fn set(&self, slot: Slot, value: &str) {
        let mut state = self.lock();
        *state.slot_mut(slot) = Some(value.to_string());
        state.updated_at = Some(Utc::now());
        self.persist(&state);
    }

    fn clear(&self, slot: Slot) {
        let mut state = self.lock();
        if state.slot_mut(slot).take().is_none() {
            return;
        }
        state.updated_at = Some(Utc::now());
        self.persist(&state);
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_private(path: &Path, state: &CredentialFile) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(state).map_err(io::Error::other)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        // `mode` only applies on create; tighten a pre-existing file too.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(contents.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;
    }

    Ok(())
}
