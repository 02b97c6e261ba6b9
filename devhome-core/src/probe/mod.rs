//! Cascading version detection for local runtimes.
//!
//! A [`RuntimeProbe`] lists [`DetectionStrategy`] values in priority order.
//! [`VersionProbe::detect`] walks them until one yields text that the probe's
//! patterns accept. Strategies that cannot run (execution disabled, no
//! credentials, process timeout, connection refused) are skipped; detection
//! itself never fails.
//!
//! # Security
//! Binary paths may come from configuration. Every path is passed through
//! [`shell_quote`] before it reaches `sh -c`.

pub mod catalog;
#[cfg(feature = "mysql")]
mod live;
mod runner;
mod strategy;


#[cfg(feature = "mysql")]
pub use live::MySqlVersionSource;
pub use runner::{
    CommandOutput, CommandRunner, DEFAULT_MAX_OUTPUT_BYTES, DisabledCommandRunner,
    TokioCommandRunner,
};
pub use strategy::{DetectionStrategy, compile_patterns, extract_version};

use crate::connection::ConnectionConfig;
use crate::error::DevhomeError;
use crate::models::ProbeResult;
use crate::security::shell_quote;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default deadline for each external process
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Live connection to a database server.
#[async_trait]
pub trait ServerVersionSource: Send + Sync {
    /// Connects with `config` and returns the server's self-reported version.
    ///
    /// # Errors
    /// Returns [`DevhomeError::ConnectionAttemptFailed`] on connect, query or
    /// timeout failure. Messages carry only the redacted connection URL.
    async fn server_version(&self, config: &ConnectionConfig) -> Result<String>;
}

/// What to detect and how.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    /// Runtime name reported in [`ProbeResult::runtime`]
    pub name: String,
    /// Strategies in priority order
    pub strategies: Vec<DetectionStrategy>,
    /// Tried in order against binary output
    pub patterns: Vec<Regex>,
    /// Tried in order against live-connection and library text; falls back
    /// to `patterns` when empty
    pub server_patterns: Vec<Regex>,
    /// Arguments appended when invoking a binary
    pub version_args: Vec<String>,
}

impl RuntimeProbe {
    /// Creates a probe with no strategies or patterns that invokes binaries
    /// with `--version`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            patterns: Vec::new(),
            server_patterns: Vec::new(),
            version_args: vec!["--version".to_string()],
        }
    }

    /// Appends a strategy after the existing ones.
    pub fn strategy(mut self, strategy: DetectionStrategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Replaces the binary output patterns. Invalid patterns are skipped.
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns = compile_patterns(patterns);
        self
    }

    /// Replaces the live-connection and library patterns. Invalid patterns
    /// are skipped.
    pub fn server_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.server_patterns = compile_patterns(patterns);
        self
    }

    /// Replaces the arguments passed to each binary.
    pub fn version_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Patterns applied to text that did not come from a binary.
    fn text_patterns(&self) -> &[Regex] {
        if self.server_patterns.is_empty() {
            &self.patterns
        } else {
            &self.server_patterns
        }
    }
}

/// Runs [`RuntimeProbe`]s against a process runner and an optional live
/// server source.
#[derive(Clone)]
pub struct VersionProbe {
    runner: Arc<dyn CommandRunner>,
    server: Option<Arc<dyn ServerVersionSource>>,
    timeout: Duration,
}

impl std::fmt::Debug for VersionProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionProbe")
            .field("exec", &self.runner.available())
            .field("live", &self.server.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VersionProbe {
    /// Creates a probe over `runner` with no live server source and the
    /// default process deadline.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            server: None,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Enables the live-connection strategy.
    pub fn with_server_source(mut self, source: Arc<dyn ServerVersionSource>) -> Self {
        self.server = Some(source);
        self
    }

    /// Sets the per-process deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Detects the version of one runtime.
    #[instrument(skip(self, probe), fields(runtime = %probe.name))]
    pub async fn detect(&self, probe: &RuntimeProbe) -> ProbeResult {
        let mut tried = HashSet::new();

        for strategy in &probe.strategies {
            let kind = strategy.kind();
            match self.attempt(probe, strategy, &mut tried).await {
                Ok(Some(version)) => {
                    info!(strategy = %kind, version = %version, "version detected");
                    return ProbeResult {
                        runtime: probe.name.clone(),
                        version: Some(version),
                        source: Some(kind),
                    };
                }
                Ok(None) => debug!(strategy = %kind, "strategy yielded no version"),
                Err(e) => debug!(strategy = %kind, error = %e, "strategy skipped"),
            }
        }

        debug!("all strategies exhausted");
        ProbeResult::exhausted(probe.name.clone())
    }

    /// Detects every runtime concurrently. Results keep the input order.
    pub async fn detect_all(&self, probes: &[RuntimeProbe]) -> Vec<ProbeResult> {
        futures::future::join_all(probes.iter().map(|probe| self.detect(probe))).await
    }

    async fn attempt(
        &self,
        probe: &RuntimeProbe,
        strategy: &DetectionStrategy,
        tried: &mut HashSet<String>,
    ) -> Result<Option<String>> {
        if strategy.needs_exec() && !self.runner.available() {
            return Err(DevhomeError::strategy_unavailable(
                strategy.kind().to_string(),
                "process execution disabled",
            ));
        }

        match strategy {
            DetectionStrategy::ExplicitBinary(paths) | DetectionStrategy::KnownLocations(paths) => {
                for path in paths {
                    if let Some(version) = self.try_binary(probe, path, tried).await {
                        return Ok(Some(version));
                    }
                }
                Ok(None)
            }
            DetectionStrategy::ShellDiscovery(commands) => {
                for command in commands {
                    let Some(path) = self.discover(command).await else {
                        continue;
                    };
                    if let Some(version) = self.try_binary(probe, &path, tried).await {
                        return Ok(Some(version));
                    }
                }
                Ok(None)
            }
            DetectionStrategy::LiveConnection(config) => {
                if !config.is_attemptable() {
                    return Err(DevhomeError::strategy_unavailable(
                        "live-connection",
                        "no user or socket configured",
                    ));
                }
                let Some(server) = &self.server else {
                    return Err(DevhomeError::strategy_unavailable(
                        "live-connection",
                        "no server driver available",
                    ));
                };
                let text = server.server_version(config).await?;
                Ok(extract_version(
                    probe.text_patterns(),
                    &text,
                    strategy.accepts_raw(),
                ))
            }
            DetectionStrategy::LibraryFallback(text) => Ok(extract_version(
                probe.text_patterns(),
                text,
                strategy.accepts_raw(),
            )),
        }
    }

    /// Invokes one candidate binary unless it was already tried.
    async fn try_binary(
        &self,
        probe: &RuntimeProbe,
        path: &str,
        tried: &mut HashSet<String>,
    ) -> Option<String> {
        let path = path.trim();
        if path.is_empty() || !tried.insert(path.to_string()) {
            return None;
        }

        let mut script = shell_quote(path);
        for arg in &probe.version_args {
            script.push(' ');
            script.push_str(&shell_quote(arg));
        }

        match self.sh(script).await {
            Ok(output) => {
                let version = extract_version(&probe.patterns, &binary_text(&output), false);
                if version.is_none() {
                    debug!(binary = path, "no version in output");
                }
                version
            }
            Err(e) => {
                debug!(binary = path, error = %e, "binary invocation failed");
                None
            }
        }
    }

    /// Runs a discovery command and returns the first non-empty output line.
    async fn discover(&self, command: &str) -> Option<String> {
        let output = self.sh(format!("{} 2>/dev/null", command)).await.ok()?;
        let path = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())?
            .to_string();
        debug!(command, path = %path, "discovered binary");
        Some(path)
    }

    async fn sh(&self, script: String) -> Result<CommandOutput> {
        self.runner
            .run("sh", &["-c".to_string(), script], self.timeout)
            .await
    }
}

/// Text a binary reported about itself. Stderr only counts when the
/// process exited successfully; a failing binary's stderr holds loader or
/// shell errors, not a version banner.
fn binary_text(output: &CommandOutput) -> String {
    if output.success() {
        output.text()
    } else {
        output.stdout.trim().to_string()
    }
}
