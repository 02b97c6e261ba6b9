//! TTL-bounded persisted cache around the directory scanner.
//!
//! One [`CacheRecord`] is kept per scanned directory, keyed by a hash of the
//! directory's canonical path. Fresh records are served without touching
//! the filesystem; stale, missing or corrupt records trigger a rescan whose
//! result is written back. Cache failures never reach the caller.
//!
//! Concurrent callers may rescan the same directory at the same time; the
//! last write wins. Records are pure re-derivations of the filesystem, so
//! a lost race costs one redundant scan and nothing else.

mod store;


pub use store::{CacheStore, FileCacheStore, MemoryCacheStore};

use crate::models::{DirectoryEntry, PathSafety};
use crate::pattern::ExclusionRuleSet;
use crate::scanner::{absolute_root, scan};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Bumped whenever the record layout changes; old records then miss.
const RECORD_FORMAT: u32 = 1;

/// Persisted scan result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Record layout version
    pub format: u32,
    /// Absolute directory the entries belong to
    pub root: PathBuf,
    /// Fingerprint of the rules and safety level the entries were scanned with
    pub rules: String,
    /// When the scan ran
    pub created_at: DateTime<Utc>,
    /// Filtered entries, unsorted
    pub entries: Vec<DirectoryEntry>,
}

impl CacheRecord {
    /// Whether the record is younger than `ttl` at `now`.
    ///
    /// A zero TTL is never fresh. A record stamped in the future is treated
    /// as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Ok(age) = now.signed_duration_since(self.created_at).to_std() else {
            return false;
        };
        age < ttl
    }
}

/// Result of [`ListingCache::get_or_scan`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Absolute directory that was listed
    pub root: PathBuf,
    /// Entries that survived filtering
    pub entries: Vec<DirectoryEntry>,
    /// True when served from a fresh cache record
    pub from_cache: bool,
    /// When the underlying scan ran
    pub scanned_at: DateTime<Utc>,
}

/// Cache key for a directory: format version plus SHA-256 of the canonical path.
pub fn cache_key(root: &Path) -> String {
    let digest = Sha256::digest(root.to_string_lossy().as_bytes());
    format!("v{}-{:x}", RECORD_FORMAT, digest)
}

fn rules_fingerprint(rules: &ExclusionRuleSet, safety: PathSafety) -> String {
    let mut hasher = Sha256::new();
    for pattern in rules.patterns() {
        hasher.update(pattern.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(format!("{:?}", safety).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Listing cache over a [`CacheStore`].
#[derive(Debug)]
pub struct ListingCache<S> {
    store: S,
}

impl<S: CacheStore> ListingCache<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the listing for `dir`, scanning only when no fresh record exists.
    ///
    /// # Errors
    /// Returns [`crate::DevhomeError::DirectoryUnreadable`] when a rescan is
    /// needed and the directory cannot be opened. Cache read/write failures
    /// are logged and absorbed.
    pub fn get_or_scan(
        &self,
        dir: &Path,
        rules: &ExclusionRuleSet,
        safety: PathSafety,
        ttl: Duration,
    ) -> Result<Listing> {
        self.get_or_scan_at(dir, rules, safety, ttl, Utc::now())
    }

    /// [`Self::get_or_scan`] evaluated at an explicit `now`.
    #[instrument(skip(self, dir, rules), fields(dir = %dir.display()))]
    pub fn get_or_scan_at(
        &self,
        dir: &Path,
        rules: &ExclusionRuleSet,
        safety: PathSafety,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Listing> {
        let root = absolute_root(dir);
        let key = cache_key(&root);
        let fingerprint = rules_fingerprint(rules, safety);

        if let Some(record) = self.load(&key, &root, &fingerprint) {
            if record.is_fresh(now, ttl) {
                info!(entries = record.entries.len(), "serving cached listing");
                return Ok(Listing {
                    root,
                    entries: record.entries,
                    from_cache: true,
                    scanned_at: record.created_at,
                });
            }
            debug!(created_at = %record.created_at, "cached listing is stale");
        }

        let entries = scan(dir, rules, safety)?;
        info!(entries = entries.len(), "rescanned directory");

        let record = CacheRecord {
            format: RECORD_FORMAT,
            root: root.clone(),
            rules: fingerprint,
            created_at: now,
            entries,
        };
        self.save(&key, &record);

        Ok(Listing {
            root,
            entries: record.entries,
            from_cache: false,
            scanned_at: now,
        })
    }

    /// Reads and validates a record. Every failure mode is a miss.
    fn load(&self, key: &str, root: &Path, fingerprint: &str) -> Option<CacheRecord> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no cached listing");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "listing cache unavailable");
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                let e = crate::DevhomeError::serialization("cached listing", e);
                warn!(error = %e, "discarding corrupt cache record");
                return None;
            }
        };

        if record.format != RECORD_FORMAT || record.root != root || record.rules != fingerprint {
            let e = crate::DevhomeError::cache_corrupt("record does not match this scan");
            debug!(error = %e, "discarding cache record");
            return None;
        }

        Some(record)
    }

    fn save(&self, key: &str, record: &CacheRecord) {
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize listing");
                return;
            }
        };
        if let Err(e) = self.store.put(key, &bytes) {
            warn!(error = %e, "failed to persist listing, continuing uncached");
        }
    }
}
