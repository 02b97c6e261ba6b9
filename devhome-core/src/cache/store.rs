//! Key-value backends for persisted listing records.

use crate::error::DevhomeError;
use crate::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// Minimal blob store used by [`super::ListingCache`].
///
/// Implementations must tolerate concurrent writers to the same key; the
/// last completed write wins.
pub trait CacheStore: Send + Sync {
    /// Reads the blob stored under `key`, `Ok(None)` when absent.
    ///
    /// # Errors
    /// Returns [`DevhomeError::CacheUnavailable`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`DevhomeError::CacheUnavailable`] when the backend cannot be written.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// One file per key inside a cache directory.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial record.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the user's cache directory (`$XDG_CACHE_HOME/devhome/listings`
    /// on Linux), or the system temp directory when none is known.
    pub fn default_location() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("devhome").join("listings"))
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DevhomeError::configuration(format!(
                "invalid cache key: {:?}",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DevhomeError::cache_unavailable(
                format!("failed to read {}", path.display()),
                e,
            )),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            DevhomeError::cache_unavailable(
                format!("failed to create {}", self.dir.display()),
                e,
            )
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            DevhomeError::cache_unavailable("failed to create temporary cache file", e)
        })?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.flush())
            .map_err(|e| DevhomeError::cache_unavailable("failed to write cache record", e))?;
        tmp.persist(&path).map_err(|e| {
            DevhomeError::cache_unavailable(format!("failed to replace {}", path.display()), e.error)
        })?;

        trace!(path = %path.display(), bytes = bytes.len(), "cache record written");
        Ok(())
    }
}

/// In-process store, used for tests and cache-less runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // Poisoning is ignored: every write is a single insert.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).put(key, bytes)
    }
}
