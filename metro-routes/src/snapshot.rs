//! On-disk snapshot of the engine's bootstrap state and route cache.
//!
//! Layout: 8-byte magic, little-endian `u32` format version, little-endian
//! `u64` payload length, then the bincode payload. The format is internal
//! and may change between versions; a mismatched version is rejected
//! rather than migrated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Route, Station};
use crate::fares::FormState;

const MAGIC: &[u8; 8] = b"MTROUTE1";

/// Current snapshot format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 8;

/// Errors reading or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(bincode::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(bincode::Error),

    #[error("not a route snapshot (bad magic)")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot truncated: expected {expected} payload bytes, found {found}")]
    Truncated { expected: u64, found: u64 },
}

/// Everything needed to resume without bootstrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub form: FormState,
    pub stations: Vec<Station>,
    pub routes: Vec<Route>,
}

impl Snapshot {
    /// Encode into the framed binary format.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let payload = bincode::serialize(self).map_err(SnapshotError::Encode)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode from the framed binary format.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[8..12]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[12..HEADER_LEN]);
        let expected = u64::from_le_bytes(len);

        let payload = &bytes[HEADER_LEN..];
        if payload.len() as u64 != expected {
            return Err(SnapshotError::Truncated {
                expected,
                found: payload.len() as u64,
            });
        }

        bincode::deserialize(payload).map_err(SnapshotError::Decode)
    }
}

/// Read a snapshot. Returns `None` if the file doesn't exist.
pub async fn read(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Snapshot::decode(&bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a snapshot atomically: encode, write a sibling temp file, rename.
///
/// Creates parent directories if they don't exist.
pub async fn write(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let bytes = snapshot.encode()?;
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

    Ok(())
}
