//! Engine state carried between process invocations.
//!
//! A polling caller runs once per bar; open positions and cooldown stamps
//! must survive between runs. The file is a small JSON envelope holding the
//! serialized [`StoreSnapshot`] plus a BLAKE3 checksum of that text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use confluence_core::store::StoreSnapshot;
use confluence_core::MemoryStore;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported state version {0}")]
    Version(u32),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    /// Serialized `StoreSnapshot`; hashed as stored.
    state: String,
}

fn checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Writes the store's contents to `path`, creating parent directories.
pub fn save_state(path: &Path, store: &MemoryStore) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let snapshot = store.snapshot();
    let state = serde_json::to_string(&snapshot)?;
    let envelope = Envelope {
        version: STATE_VERSION,
        checksum: checksum(&state),
        state,
    };
    let text = serde_json::to_string_pretty(&envelope)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    debug!(
        path = %path.display(),
        positions = snapshot.positions.len(),
        cooldowns = snapshot.cooldowns.len(),
        "state saved"
    );
    Ok(())
}

/// Reads a store from `path`. A missing file yields an empty store.
pub fn load_state(path: &Path) -> Result<MemoryStore, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(MemoryStore::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let envelope: Envelope = serde_json::from_str(&text)?;
    if envelope.version != STATE_VERSION {
        return Err(StoreError::Version(envelope.version));
    }
    let actual = checksum(&envelope.state);
    if actual != envelope.checksum {
        return Err(StoreError::ChecksumMismatch {
            expected: envelope.checksum,
            actual,
        });
    }

    let snapshot: StoreSnapshot = serde_json::from_str(&envelope.state)?;
    debug!(path = %path.display(), positions = snapshot.positions.len(), "state loaded");
    Ok(MemoryStore::from_snapshot(snapshot))
}
