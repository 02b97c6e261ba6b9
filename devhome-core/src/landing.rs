//! Landing page orchestration: listing, statistics and runtime versions.
//!
//! [`Landing`] wires the engine together for one options set. It owns the
//! compiled exclusion rules, the listing cache and the version probe, and
//! produces a [`LandingReport`] per request. Only an unreadable root
//! directory is reported back (as [`LandingReport::error`]); every other
//! failure degrades to missing data.

use crate::cache::{CacheStore, Listing, ListingCache};
use crate::connection::{
    ConnectionConfig, ConnectionSources, DriverDefaults, EnvSnapshot, resolve,
};
use crate::error::DevhomeError;
use crate::listing::sort_entries;
use crate::models::{DirectoryEntry, PathSafety, ProbeResult, SortKey, StatsSnapshot};
use crate::pattern::ExclusionRuleSet;
use crate::probe::catalog::{self, CustomRuntime, MysqlOptions};
use crate::probe::{
    CommandRunner, DisabledCommandRunner, RuntimeProbe, ServerVersionSource, TokioCommandRunner,
    VersionProbe,
};
use crate::scanner::{DirectoryScanner, absolute_root};
use crate::stats::{HostQueries, SysinfoHost, summarize};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Exclusions applied when the options file names none.
pub const DEFAULT_EXCLUDES: &[&str] = &[".DS_Store", ".localized", "*.php*", "*.png"];

/// Options file contents.
///
/// Every field is optional in the file; missing fields take the defaults
/// shown on [`LandingOptions::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LandingOptions {
    /// Glob patterns of entry names to hide
    pub exclude: Vec<String>,
    /// How strictly entry names and paths are validated
    pub path_safety: PathSafety,
    /// Listing cache lifetime; `0` rescans on every request
    pub cache_ttl_secs: u64,
    /// Listing order; unknown values fall back to name
    #[serde(deserialize_with = "lenient_sort")]
    pub sort: SortKey,
    /// Whether probes may spawn external processes
    pub allow_exec: bool,
    /// Deadline for each probe process, in milliseconds
    pub probe_timeout_ms: u64,
    /// MySQL binaries and connection settings
    pub mysql: MysqlOptions,
    /// Additional runtimes to probe
    pub runtimes: Vec<CustomRuntime>,
}

impl Default for LandingOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect(),
            path_safety: PathSafety::Strict,
            cache_ttl_secs: 30,
            sort: SortKey::Name,
            allow_exec: true,
            probe_timeout_ms: 1500,
            mysql: MysqlOptions::default(),
            runtimes: Vec::new(),
        }
    }
}

fn lenient_sort<'de, D>(deserializer: D) -> std::result::Result<SortKey, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|raw| SortKey::parse_lenient(&raw))
}

impl LandingOptions {
    /// Parses options from JSON text.
    ///
    /// # Errors
    /// Returns [`DevhomeError::Serialization`] when the text is not valid
    /// options JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| DevhomeError::serialization("failed to parse options", e))
    }

    /// Reads an options file.
    ///
    /// # Errors
    /// Returns [`DevhomeError::Io`] when the file cannot be read and
    /// [`DevhomeError::Serialization`] when it is not valid options JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DevhomeError::io(format!("failed to read options file {}", path.display()), e)
        })?;
        Self::from_json(&text)
    }

    /// [`Self::cache_ttl_secs`] as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// [`Self::probe_timeout_ms`] as a duration.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Everything the landing page shows for one directory.
#[derive(Debug, Clone, Serialize)]
pub struct LandingReport {
    /// Absolute directory the report describes
    pub root: PathBuf,
    /// Filtered, sorted entries
    pub entries: Vec<DirectoryEntry>,
    /// True when the listing came from the cache
    pub from_cache: bool,
    /// Statistics derived from the entries and the host
    pub stats: StatsSnapshot,
    /// One result per configured runtime, in catalog order
    pub versions: Vec<ProbeResult>,
    /// Set when the root directory could not be read
    pub error: Option<String>,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
}

/// Engine entry point for one options set.
pub struct Landing<S> {
    options: LandingOptions,
    scanner: DirectoryScanner,
    cache: ListingCache<S>,
    runner: Arc<dyn CommandRunner>,
    server: Option<Arc<dyn ServerVersionSource>>,
    env: EnvSnapshot,
    host: Option<Arc<dyn HostQueries>>,
}

impl<S> std::fmt::Debug for Landing<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landing")
            .field("options", &self.options)
            .field("exec", &self.runner.available())
            .field("live", &self.server.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: CacheStore> Landing<S> {
    /// Builds the engine with the real process runner, the MySQL driver
    /// when compiled in, and the process environment.
    pub fn new(options: LandingOptions, store: S) -> Self {
        #[cfg(feature = "mysql")]
        let server: Option<Arc<dyn ServerVersionSource>> =
            Some(Arc::new(crate::probe::MySqlVersionSource));
        #[cfg(not(feature = "mysql"))]
        let server: Option<Arc<dyn ServerVersionSource>> = None;

        Self {
            scanner: DirectoryScanner::new(
                ExclusionRuleSet::new(&options.exclude),
                options.path_safety,
            ),
            cache: ListingCache::new(store),
            runner: Arc::new(TokioCommandRunner::new()),
            server,
            env: EnvSnapshot::from_process(),
            host: None,
            options,
        }
    }

    /// Replaces the process runner. `allow_exec = false` still wins.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the live server source.
    pub fn with_server_source(mut self, source: Arc<dyn ServerVersionSource>) -> Self {
        self.server = Some(source);
        self
    }

    /// Replaces the environment snapshot used for connection resolution.
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    /// Replaces the host metrics source.
    pub fn with_host(mut self, host: Arc<dyn HostQueries>) -> Self {
        self.host = Some(host);
        self
    }

    /// Options this engine was built with.
    pub fn options(&self) -> &LandingOptions {
        &self.options
    }

    /// The listing cache, for inspection.
    pub fn cache(&self) -> &ListingCache<S> {
        &self.cache
    }

    /// Resolved MySQL connection for the live probe.
    pub fn connection(&self) -> ConnectionConfig {
        resolve(&ConnectionSources {
            explicit: self.options.mysql.connection.clone(),
            env: self.env.clone(),
            url: None,
            defaults: DriverDefaults::mysql(),
        })
    }

    /// Built-in and configured runtime probes.
    pub fn runtime_probes(&self) -> Vec<RuntimeProbe> {
        catalog::runtimes(&self.options.mysql, self.connection(), &self.options.runtimes)
    }

    /// Cached, sorted listing of `dir`.
    ///
    /// # Errors
    /// Returns [`DevhomeError::DirectoryUnreadable`] when `dir` cannot be
    /// opened and no fresh cached listing exists.
    pub fn listing(&self, dir: &Path) -> Result<Listing> {
        self.listing_at(dir, Utc::now())
    }

    fn listing_at(&self, dir: &Path, now: DateTime<Utc>) -> Result<Listing> {
        let mut listing = self.cache.get_or_scan_at(
            dir,
            self.scanner.rules(),
            self.scanner.safety(),
            self.options.cache_ttl(),
            now,
        )?;
        sort_entries(&mut listing.entries, self.options.sort);
        Ok(listing)
    }

    /// Detects every configured runtime concurrently.
    pub async fn versions(&self) -> Vec<ProbeResult> {
        self.version_probe()
            .detect_all(&self.runtime_probes())
            .await
    }

    fn version_probe(&self) -> VersionProbe {
        let runner: Arc<dyn CommandRunner> = if self.options.allow_exec {
            Arc::clone(&self.runner)
        } else {
            Arc::new(DisabledCommandRunner)
        };
        let probe = VersionProbe::new(runner).with_timeout(self.options.probe_timeout());
        match &self.server {
            Some(server) => probe.with_server_source(Arc::clone(server)),
            None => probe,
        }
    }

    /// Produces the full report for `dir`. Never fails.
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn build(&self, dir: &Path) -> LandingReport {
        let now = Utc::now();

        let (root, entries, from_cache, error) = match self.listing_at(dir, now) {
            Ok(listing) => (listing.root, listing.entries, listing.from_cache, None),
            Err(e) => {
                warn!(error = %e, "directory listing unavailable");
                (absolute_root(dir), Vec::new(), false, surfaced_error(&e))
            }
        };

        let versions = self.versions().await;

        let stats = match &self.host {
            Some(host) => summarize(&entries, host.as_ref(), &root, now),
            None => summarize(&entries, &SysinfoHost::collect(), &root, now),
        };

        info!(
            entries = entries.len(),
            from_cache,
            runtimes = versions.len(),
            "landing report built"
        );

        LandingReport {
            root,
            entries,
            from_cache,
            stats,
            versions,
            error,
            generated_at: now,
        }
    }
}

/// Message shown on the report for a listing failure. Only fatal errors
/// reach the page; everything else stays in the log.
fn surfaced_error(error: &DevhomeError) -> Option<String> {
    error.is_fatal().then(|| error.to_string())
}
