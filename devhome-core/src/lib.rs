//! Environment probing and cached directory introspection for devhome.
//!
//! This crate is the engine behind the `devhome` landing page: it lists one
//! directory, caches the listing, derives statistics, resolves database
//! connection parameters and detects the versions of locally installed
//! runtimes. Presentation is left to the caller.
//!
//! # Security Guarantees
//! - Entry names containing `..`, path separators or NUL are never listed
//! - Strict path safety rejects symlinks that escape the scanned root
//! - Binary paths from configuration are shell-quoted before execution
//! - Database passwords are zeroized on drop and never logged or serialized
//!
//! # Architecture
//! - `pattern` and `scanner` produce entries; `cache` wraps the scanner
//! - `connection` is a pure resolver over explicit inputs
//! - `probe` runs ordered detection strategies behind injectable traits
//! - `stats` derives counts and recency from a listing plus host metrics
//! - `landing` wires everything together per options set

pub mod cache;
pub mod connection;
pub mod error;
pub mod landing;
pub mod listing;
pub mod logging;
pub mod models;
pub mod pattern;
pub mod probe;
pub mod scanner;
pub mod security;
pub mod stats;

// Re-export commonly used types
pub use cache::{CacheStore, FileCacheStore, Listing, ListingCache, MemoryCacheStore};
pub use connection::{ConnectionConfig, ConnectionSources, EnvSnapshot, ExplicitConnection, resolve};
pub use error::{DevhomeError, Result};
pub use landing::{Landing, LandingOptions, LandingReport};
pub use logging::init_logging;
pub use models::{
    DirectoryEntry, DiskUsage, EntryKind, HostMetrics, LatestEntry, PathSafety, ProbeResult,
    RecentEntry, SortKey, StatsSnapshot, StrategyKind,
};
pub use pattern::ExclusionRuleSet;
pub use probe::{CommandRunner, DetectionStrategy, RuntimeProbe, VersionProbe};
pub use scanner::{DirectoryScanner, scan};
pub use stats::{HostQueries, summarize};
