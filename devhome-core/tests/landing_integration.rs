//! Integration tests for the landing orchestrator
//!
//! These tests drive `Landing::build` end to end against scratch
//! directories, with process execution and host metrics replaced by fakes.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use devhome_core::connection::EnvSnapshot;
use devhome_core::probe::{CommandOutput, CommandRunner};
use devhome_core::{
    EntryKind, HostQueries, Landing, LandingOptions, MemoryCacheStore, SortKey, StrategyKind,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers `sh -c` scripts by substring; everything else exits 127.
#[derive(Default)]
struct ScriptedRunner {
    answers: Vec<(&'static str, &'static str)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn with(answers: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            answers,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    fn available(&self) -> bool {
        true
    }

    async fn run(
        &self,
        _program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> devhome_core::Result<CommandOutput> {
        let script = args.join(" ");
        self.calls.lock().unwrap().push(script.clone());
        for (needle, output) in &self.answers {
            if script.contains(needle) {
                return Ok(CommandOutput::from_stdout(*output));
            }
        }
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(127),
            truncated: false,
        })
    }
}

struct FixedHost;

impl HostQueries for FixedHost {
    fn disk_space(&self, _path: &Path) -> Option<(u64, u64)> {
        Some((50, 200))
    }

    fn total_memory(&self) -> Option<u64> {
        Some(8 * 1024 * 1024 * 1024)
    }

    fn available_memory(&self) -> Option<u64> {
        Some(2 * 1024 * 1024 * 1024)
    }

    fn cpu_cores(&self) -> Option<usize> {
        Some(4)
    }

    fn uptime(&self) -> Option<u64> {
        Some(120)
    }

    fn os_name(&self) -> Option<String> {
        None
    }
}

fn landing(options: LandingOptions, runner: ScriptedRunner) -> Landing<MemoryCacheStore> {
    Landing::new(options, MemoryCacheStore::new())
        .with_runner(Arc::new(runner))
        .with_env(EnvSnapshot::from_pairs(Vec::<(String, String)>::new()))
        .with_host(Arc::new(FixedHost))
}

fn web_runner() -> ScriptedRunner {
    ScriptedRunner::with(vec![
        ("httpd", "Server version: Apache/2.4.57 (Unix)\nServer built: today"),
        ("php", "PHP 8.3.1 (cli) (built: Jan  1 2024)"),
    ])
}

fn populate(dir: &Path) {
    std::fs::create_dir(dir.join("project")).unwrap();
    std::fs::create_dir(dir.join("archive")).unwrap();
    std::fs::write(dir.join("notes.txt"), b"hello").unwrap();
    std::fs::write(dir.join("logo.png"), b"png").unwrap();
    std::fs::write(dir.join("index.php"), b"<?php").unwrap();
    std::fs::write(dir.join(".DS_Store"), b"").unwrap();
}

#[tokio::test]
async fn test_integration_report_lists_filtered_sorted_entries() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let report = landing(LandingOptions::default(), web_runner())
        .build(dir.path())
        .await;

    assert!(report.error.is_none());
    assert!(!report.from_cache);
    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "project", "notes.txt"]);
    assert_eq!(report.entries[0].kind, EntryKind::Dir);
    assert_eq!(report.entries[2].size_bytes, Some(5));

    assert_eq!(report.stats.directories, 2);
    assert_eq!(report.stats.files, 1);
    assert!(report.stats.latest.is_some());
    assert_eq!(report.stats.recent.len(), 3);
    assert_eq!(report.stats.disk.unwrap().free_percent, 25);
    assert_eq!(report.stats.host.cpu_cores, Some(4));
}

#[tokio::test]
async fn test_integration_report_detects_versions_in_order() {
    let dir = tempfile::tempdir().unwrap();

    let report = landing(LandingOptions::default(), web_runner())
        .build(dir.path())
        .await;

    let runtimes: Vec<_> = report.versions.iter().map(|v| v.runtime.as_str()).collect();
    assert_eq!(runtimes, vec!["apache", "php", "mysql"]);

    assert_eq!(report.versions[0].version.as_deref(), Some("2.4.57"));
    assert_eq!(report.versions[0].source, Some(StrategyKind::KnownLocations));
    assert_eq!(report.versions[1].version.as_deref(), Some("8.3.1"));

    #[cfg(feature = "mysql")]
    {
        assert_eq!(
            report.versions[2].version.as_deref(),
            Some(devhome_core::probe::catalog::MYSQL_CLIENT_LIBRARY)
        );
        assert_eq!(report.versions[2].source, Some(StrategyKind::LibraryFallback));
    }
    #[cfg(not(feature = "mysql"))]
    assert!(report.versions[2].version.is_none());
}

#[tokio::test]
async fn test_integration_unreadable_directory_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let report = landing(LandingOptions::default(), web_runner())
        .build(&missing)
        .await;

    assert!(report.error.is_some());
    assert!(report.entries.is_empty());
    assert_eq!(report.stats.directories, 0);
    assert_eq!(report.stats.files, 0);
    assert_eq!(report.versions.len(), 3);
}

#[tokio::test]
async fn test_integration_cache_reuses_fresh_listing() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let landing = landing(LandingOptions::default(), web_runner());

    let first = landing.build(dir.path()).await;
    std::fs::write(dir.path().join("added.txt"), b"new").unwrap();
    let second = landing.build(dir.path()).await;

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.entries, second.entries);
    assert_eq!(landing.cache().store().len(), 1);
}

#[tokio::test]
async fn test_integration_zero_ttl_always_rescans() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let options = LandingOptions {
        cache_ttl_secs: 0,
        ..LandingOptions::default()
    };
    let landing = landing(options, web_runner());

    landing.build(dir.path()).await;
    std::fs::write(dir.path().join("added.txt"), b"new").unwrap();
    let second = landing.build(dir.path()).await;

    assert!(!second.from_cache);
    assert!(second.entries.iter().any(|e| e.name == "added.txt"));
}

#[tokio::test]
async fn test_integration_sort_by_size_keeps_directories_first() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("zeta")).unwrap();
    std::fs::write(dir.path().join("small.txt"), b"1").unwrap();
    std::fs::write(dir.path().join("large.txt"), vec![0u8; 4096]).unwrap();

    let options = LandingOptions {
        sort: SortKey::Size,
        ..LandingOptions::default()
    };
    let listing = landing(options, web_runner()).listing(dir.path()).unwrap();

    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "large.txt", "small.txt"]);
}

#[tokio::test]
async fn test_integration_exec_disabled_never_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(web_runner());
    let options = LandingOptions {
        allow_exec: false,
        ..LandingOptions::default()
    };
    let landing = Landing::new(options, MemoryCacheStore::new())
        .with_runner(Arc::clone(&runner) as Arc<dyn CommandRunner>)
        .with_env(EnvSnapshot::from_pairs(Vec::<(String, String)>::new()))
        .with_host(Arc::new(FixedHost));

    let report = landing.build(dir.path()).await;

    assert!(runner.calls.lock().unwrap().is_empty());
    assert!(report.versions[0].version.is_none());
    assert!(report.versions[1].version.is_none());
}

#[tokio::test]
async fn test_integration_custom_runtime_from_options() {
    let dir = tempfile::tempdir().unwrap();
    let options = LandingOptions::from_json(
        r#"{"runtimes": [{"name": "node", "binaries": ["/opt/node/bin/node"], "patterns": ["v([0-9.]+)"]}]}"#,
    )
    .unwrap();
    let runner = ScriptedRunner::with(vec![("/opt/node/bin/node", "v20.11.0")]);

    let report = landing(options, runner).build(dir.path()).await;

    let node = report.versions.iter().find(|v| v.runtime == "node").unwrap();
    assert_eq!(node.version.as_deref(), Some("20.11.0"));
    assert_eq!(node.source, Some(StrategyKind::ExplicitBinary));
}

#[tokio::test]
async fn test_integration_report_serializes_without_password() {
    let dir = tempfile::tempdir().unwrap();
    let options = LandingOptions::from_json(
        r#"{"mysql": {"connection": {"user": "root", "password": "hunter2"}}}"#,
    )
    .unwrap();
    let landing = landing(options, ScriptedRunner::default());

    let report = landing.build(dir.path()).await;
    let json = serde_json::to_string(&report).unwrap();
    let summary = serde_json::to_string(&landing.connection().summary()).unwrap();

    assert!(!json.contains("hunter2"));
    assert!(!summary.contains("hunter2"));
    assert!(summary.contains("\"password_set\":true"));
}
