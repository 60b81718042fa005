#![deny(warnings)]

//! Save-slot persistence for serialized game states.
//!
//! The simulation core never touches storage; callers load a snapshot at
//! startup and save snapshots as they arrive. This crate provides the store
//! contract plus a JSON-file implementation with atomic replacement.

use sim_core::SerializedGameState;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name prefix shared by every save slot.
pub const SLOT_PREFIX: &str = "entropic-threads-";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save io error: {0}")]
    Io(#[from] io::Error),
    #[error("save encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage contract consumed by drivers.
pub trait SaveStore {
    /// Load a slot. A missing or unreadable-as-JSON slot is `Ok(None)`; the
    /// caller starts fresh.
    fn load(&self, slot: &str) -> Result<Option<SerializedGameState>, SaveError>;

    /// Persist a slot.
    fn save(&self, slot: &str, state: &SerializedGameState) -> Result<(), SaveError>;
}

/// One JSON document per slot under a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        JsonFileStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{SLOT_PREFIX}{slot}.json"))
    }
}

impl SaveStore for JsonFileStore {
    fn load(&self, slot: &str) -> Result<Option<SerializedGameState>, SaveError> {
        let path = self.slot_path(slot);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&text) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                // A corrupt slot is not fatal; the tolerant field defaults
                // live one level up, this guards structurally broken JSON.
                warn!(?path, %err, "discarding unreadable save slot");
                Ok(None)
            }
        }
    }

    fn save(&self, slot: &str, state: &SerializedGameState) -> Result<(), SaveError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(slot);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
