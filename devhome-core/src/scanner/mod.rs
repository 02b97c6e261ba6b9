//! Single-directory scanner with exclusion and path-safety checks.
//!
//! Only the immediate children of the target directory are enumerated.
//! Entries that fail validation or whose metadata cannot be read are
//! skipped individually; the scan as a whole fails only when the directory
//! itself cannot be opened.

use crate::error::DevhomeError;
use crate::models::{DirectoryEntry, PathSafety};
use crate::pattern::ExclusionRuleSet;
use crate::security::{ensure_contained, validate_entry_name};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace};


/// Scanner configured with one rule set and one safety level.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    rules: ExclusionRuleSet,
    safety: PathSafety,
}

impl DirectoryScanner {
    /// Creates a scanner.
    pub fn new(rules: ExclusionRuleSet, safety: PathSafety) -> Self {
        Self { rules, safety }
    }

    /// Exclusion rules applied by this scanner.
    pub fn rules(&self) -> &ExclusionRuleSet {
        &self.rules
    }

    /// Path-safety level applied by this scanner.
    pub fn safety(&self) -> PathSafety {
        self.safety
    }

    /// Scans `dir` and returns accepted entries in discovery order.
    ///
    /// # Errors
    /// Returns [`DevhomeError::DirectoryUnreadable`] if `dir` cannot be opened.
    pub fn scan(&self, dir: &Path) -> Result<Vec<DirectoryEntry>> {
        scan(dir, &self.rules, self.safety)
    }
}

/// Enumerates the immediate children of `dir`.
///
/// Skips `.`/`..`, names matching `rules`, names failing basic validation
/// and, under [`PathSafety::Strict`], candidates resolving outside `dir`.
/// Names that are not valid UTF-8 are skipped as well.
///
/// # Errors
/// Returns [`DevhomeError::DirectoryUnreadable`] if `dir` cannot be opened.
#[instrument(skip(dir, rules), fields(dir = %dir.display()))]
pub fn scan(
    dir: &Path,
    rules: &ExclusionRuleSet,
    safety: PathSafety,
) -> Result<Vec<DirectoryEntry>> {
    let read_dir = fs::read_dir(dir).map_err(|e| DevhomeError::directory_unreadable(dir, e))?;

    let canonical_root = match safety {
        PathSafety::Strict => Some(
            dir.canonicalize()
                .map_err(|e| DevhomeError::directory_unreadable(dir, e))?,
        ),
        PathSafety::Basic => None,
    };

    let mut entries = Vec::new();
    for item in read_dir {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                debug!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let name = match item.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!(name = ?raw, "skipping non UTF-8 entry name");
                continue;
            }
        };

        if name == "." || name == ".." {
            continue;
        }

        if rules.matches(&name) {
            trace!(name = %name, "excluded by pattern");
            continue;
        }

        if let Err(e) = validate_entry_name(&name) {
            debug!(error = %e, "entry rejected");
            continue;
        }

        let path = item.path();
        if let Some(root) = canonical_root.as_deref() {
            if let Err(e) = ensure_contained(root, &path) {
                debug!(error = %e, "entry rejected");
                continue;
            }
        }

        if let Some(entry) = describe(&path, name) {
            entries.push(entry);
        }
    }

    debug!(count = entries.len(), "scan complete");
    Ok(entries)
}

/// Reads kind, modification time and (for files) size. Symlinks are
/// followed, so a link to a directory is reported as a directory.
fn describe(path: &Path, name: String) -> Option<DirectoryEntry> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!(name = %name, error = %e, "entry vanished or unreadable");
            return None;
        }
    };

    let modified_at: DateTime<Utc> = match metadata.modified() {
        Ok(time) => time.into(),
        Err(e) => {
            debug!(name = %name, error = %e, "modification time unavailable");
            return None;
        }
    };

    if metadata.is_dir() {
        Some(DirectoryEntry::dir(name, modified_at))
    } else {
        Some(DirectoryEntry::file(name, modified_at, metadata.len()))
    }
}

/// Canonical absolute form of `dir`, falling back to an absolute (but not
/// canonical) path when the directory cannot be resolved.
pub fn absolute_root(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    })
}
