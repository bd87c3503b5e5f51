//! Whole-store snapshots and their file persistence.
//!
//! A snapshot is the CBOR encoding of [`KeyStoreSnapshot`]. Saving replaces
//! the file atomically: the encoded bytes are written and synced to a
//! temporary file in the same directory, then renamed over the target.

use std::{fmt, fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zeroize::Zeroize;

use crate::error::KeyStoreError;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u8 = 1;

/// Snapshots larger than this are rejected as corrupt without decoding
const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Serialized form of a key store.
///
/// Byte fields are kept as variable-length buffers here; their lengths are
/// validated when the snapshot is turned back into a
/// [`KeyStore`](crate::KeyStore). Key bytes are zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStoreSnapshot {
    /// Format version, currently [`SNAPSHOT_VERSION`]
    pub version: u8,

    /// Client id (32 bytes)
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,

    /// Root key (64 bytes)
    #[serde(with = "serde_bytes")]
    pub root_key: Vec<u8>,

    /// Topic keys, sorted by fingerprint
    pub topic_keys: Vec<TopicKeyEntry>,

    /// Location the snapshot was saved to
    pub location: String,
}

/// One topic key in a snapshot.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicKeyEntry {
    /// Topic fingerprint (32 bytes)
    #[serde(with = "serde_bytes")]
    pub fingerprint: Vec<u8>,

    /// Topic key (64 bytes)
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
}

impl fmt::Debug for KeyStoreSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStoreSnapshot")
            .field("version", &self.version)
            .field("id", &hex::encode(&self.id))
            .field("topic_keys", &self.topic_keys)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for TopicKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicKeyEntry")
            .field("fingerprint", &hex::encode(&self.fingerprint))
            .finish_non_exhaustive()
    }
}

impl Drop for KeyStoreSnapshot {
    fn drop(&mut self) {
        self.root_key.zeroize();
    }
}

impl Drop for TopicKeyEntry {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl KeyStoreSnapshot {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, KeyStoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| KeyStoreError::Corrupt { reason: e.to_string() })?;
        Ok(bytes)
    }

    /// Decode from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self, KeyStoreError> {
        let snapshot: Self = ciborium::from_reader(bytes)
            .map_err(|e| KeyStoreError::Corrupt { reason: e.to_string() })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(KeyStoreError::Corrupt {
                reason: format!(
                    "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                    snapshot.version
                ),
            });
        }

        Ok(snapshot)
    }
}

/// Read and decode the snapshot at `path`.
///
/// # Errors
///
/// - `StorageUnavailable`: the file cannot be read
/// - `Corrupt`: the file is too large or does not decode
pub fn read_snapshot(path: &Path) -> Result<KeyStoreSnapshot, KeyStoreError> {
    let unavailable = |e: std::io::Error| KeyStoreError::StorageUnavailable {
        location: path.display().to_string(),
        reason: e.to_string(),
    };

    let len = fs::metadata(path).map_err(unavailable)?.len();
    if len > MAX_SNAPSHOT_BYTES {
        return Err(KeyStoreError::Corrupt {
            reason: format!("snapshot is {len} bytes, limit is {MAX_SNAPSHOT_BYTES}"),
        });
    }

    let mut bytes = fs::read(path).map_err(unavailable)?;
    let snapshot = KeyStoreSnapshot::decode(&bytes);
    bytes.zeroize();
    snapshot
}

/// Encode `snapshot` and atomically replace the file at `path`.
///
/// Each call writes to its own uniquely named temporary file, so concurrent
/// writers never clobber each other's partial output. The temporary file is
/// removed if any step fails.
///
/// # Errors
///
/// - `StorageUnavailable`: any I/O step fails; the previous file is intact
pub fn write_snapshot(path: &Path, snapshot: &KeyStoreSnapshot) -> Result<(), KeyStoreError> {
    let unavailable = |e: std::io::Error| KeyStoreError::StorageUnavailable {
        location: path.display().to_string(),
        reason: e.to_string(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut bytes = snapshot.encode()?;
    let result = write_synced(dir, &bytes);
    bytes.zeroize();

    result
        .map_err(unavailable)?
        .persist(path)
        .map_err(|e| unavailable(e.error))?;
    Ok(())
}

/// Write `bytes` to a fresh owner-only temporary file in `dir` and sync it.
fn write_synced(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.flush()?;
    file.as_file().sync_all()?;
    Ok(file)
}
