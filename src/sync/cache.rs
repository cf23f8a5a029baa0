use crate::sync::error::SyncError;
use crate::utils::ensure_cache_dir_exists;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How long a pulled document is served from cache.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(300);
const SNAPSHOT_FILE_NAME: &str = "remote_snapshot.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A previously pulled remote document together with its version token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Address of the document the snapshot was taken from.
    pub key: String,
    pub fetched_at: SystemTime,
    pub token: String,
    pub document: String,
}

/// Time-bounded cache of the last pulled document, in memory and optionally on disk.
///
/// The on-disk copy lets a restarted front end skip the first remote round trip while the
/// snapshot is still fresh.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    ttl: Duration,
    memory: Option<Snapshot>,
    file: Option<PathBuf>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::in_memory(DEFAULT_SNAPSHOT_TTL)
    }
}

impl SnapshotCache {
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            ttl,
            memory: None,
            file: None,
        }
    }

    /// A cache that also persists its snapshot under `folder`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CacheDirCreation`] if `folder` cannot be created.
    pub fn with_folder(ttl: Duration, folder: &Path) -> Result<Self, SyncError> {
        ensure_cache_dir_exists(folder)
            .map_err(|e| SyncError::CacheDirCreation(folder.to_path_buf(), e))?;
        Ok(Self {
            ttl,
            memory: None,
            file: Some(folder.join(SNAPSHOT_FILE_NAME)),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the snapshot for `key` if it is younger than the TTL at `now`.
    pub fn fresh(&mut self, key: &str, now: SystemTime) -> Result<Option<Snapshot>, SyncError> {
        if self.memory.is_none() {
            self.memory = self.load_from_disk()?;
        }
        let Some(snapshot) = self.memory.as_ref().filter(|s| s.key == key) else {
            debug!("No cached snapshot for {}", key);
            return Ok(None);
        };
        let age = now
            .duration_since(snapshot.fetched_at)
            .map_err(|e| SyncError::SystemTimeCalculation(key.to_string(), e))?;
        if age > self.ttl {
            debug!("Cached snapshot for {} is stale ({:?} old)", key, age);
            return Ok(None);
        }
        info!("Serving {} from cache ({:?} old)", key, age);
        Ok(Some(snapshot.clone()))
    }

    pub fn store(&mut self, snapshot: Snapshot) -> Result<(), SyncError> {
        if let Some(path) = &self.file {
            let bytes = bincode::serde::encode_to_vec(&snapshot, BINCODE_CONFIG)
                .map_err(|e| SyncError::CacheEncode(Box::new(e)))?;
            std::fs::write(path, &bytes).map_err(|e| SyncError::CacheWrite(path.clone(), e))?;
            debug!("Wrote snapshot ({} bytes) to {}", bytes.len(), path.display());
        }
        self.memory = Some(snapshot);
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.memory = None;
        if let Some(path) = &self.file {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed snapshot {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove snapshot {}: {}", path.display(), e),
            }
        }
    }

    fn load_from_disk(&self) -> Result<Option<Snapshot>, SyncError> {
        let Some(path) = &self.file else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path).map_err(|e| SyncError::CacheRead(path.clone(), e))?;
        let (snapshot, _) = bincode::serde::decode_from_slice::<Snapshot, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| SyncError::CacheDecode(path.clone(), Box::new(e)))?;
        Ok(Some(snapshot))
    }
}
