//! Core data models shared across the scanner, cache, probes and stats.
//!
//! All models are serializable so they can be persisted in the listing
//! cache or emitted as JSON by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory
    Dir,
    /// Anything that is not a directory
    File,
}

impl EntryKind {
    /// Whether this kind is a directory.
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Dir)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Dir => write!(f, "dir"),
            EntryKind::File => write!(f, "file"),
        }
    }
}

/// One immediate child of a scanned directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Bare file name, never a path
    pub name: String,
    /// Directory or file
    pub kind: EntryKind,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Only populated for files
    pub size_bytes: Option<u64>,
}

impl DirectoryEntry {
    /// Creates a directory entry (no size).
    pub fn dir(name: impl Into<String>, modified_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            modified_at,
            size_bytes: None,
        }
    }

    /// Creates a file entry.
    pub fn file(name: impl Into<String>, modified_at: DateTime<Utc>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            modified_at,
            size_bytes: Some(size_bytes),
        }
    }
}

/// How strictly candidate entries are validated during a scan.
///
/// Basic name checks always run; `Strict` adds a canonical-path containment
/// check that defeats symlink escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSafety {
    /// Name checks only
    Basic,
    /// Name checks plus canonical containment
    #[default]
    Strict,
}

/// Sort key applied after retrieval. Directories always come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Case-insensitive name
    #[default]
    Name,
    /// Newest first
    Date,
    /// Largest first
    Size,
}

impl SortKey {
    /// Parses a user-supplied key; anything unrecognized falls back to `Name`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => SortKey::Date,
            "size" => SortKey::Size,
            _ => SortKey::Name,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Name => write!(f, "name"),
            SortKey::Date => write!(f, "date"),
            SortKey::Size => write!(f, "size"),
        }
    }
}

/// Which detection strategy produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Configured binary paths
    ExplicitBinary,
    /// Well-known install locations
    KnownLocations,
    /// Path printed by a shell lookup command
    ShellDiscovery,
    /// Version reported by a running server
    LiveConnection,
    /// Version of the linked client library
    LibraryFallback,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::ExplicitBinary => write!(f, "explicit-binary"),
            StrategyKind::KnownLocations => write!(f, "known-locations"),
            StrategyKind::ShellDiscovery => write!(f, "shell-discovery"),
            StrategyKind::LiveConnection => write!(f, "live-connection"),
            StrategyKind::LibraryFallback => write!(f, "library-fallback"),
        }
    }
}

/// Outcome of probing one runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Runtime name, e.g. `mysql`
    pub runtime: String,
    /// `None` when every strategy was exhausted
    pub version: Option<String>,
    /// Strategy that produced the version
    pub source: Option<StrategyKind>,
}

impl ProbeResult {
    /// A result for a runtime whose strategies all failed.
    pub fn exhausted(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            version: None,
            source: None,
        }
    }

    /// Version string for display, `unknown` when absent.
    pub fn display_version(&self) -> &str {
        self.version.as_deref().unwrap_or("unknown")
    }
}

/// Most recently modified entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestEntry {
    /// Entry name
    pub name: String,
    /// Directory or file
    pub kind: EntryKind,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Age in words, e.g. `3 hours ago`
    pub relative: String,
}

/// Entry in the recency list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    /// Entry name
    pub name: String,
    /// Directory or file
    pub kind: EntryKind,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Age in words
    pub relative: String,
    /// Local timestamp for tooltips
    pub absolute: String,
}

/// Free/total space of the filesystem holding the scanned root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Bytes available
    pub free_bytes: u64,
    /// Filesystem size in bytes
    pub total_bytes: u64,
    /// Free share of the total, rounded to a whole percent
    pub free_percent: u8,
}

/// Best-effort host metrics; each field is independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMetrics {
    /// Installed memory
    pub total_memory_bytes: Option<u64>,
    /// Memory available to new processes
    pub available_memory_bytes: Option<u64>,
    /// Logical CPU count
    pub cpu_cores: Option<usize>,
    /// Seconds since boot
    pub uptime_secs: Option<u64>,
    /// Operating system name and version
    pub os_name: Option<String>,
}

/// Derived statistics, recomputed on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Number of listed directories
    pub directories: usize,
    /// Number of listed files
    pub files: usize,
    /// Newest entry, absent for an empty listing
    pub latest: Option<LatestEntry>,
    /// Newest entries first, at most five
    pub recent: Vec<RecentEntry>,
    /// Space on the filesystem holding the root
    pub disk: Option<DiskUsage>,
    /// Host-wide metrics
    pub host: HostMetrics,
}
