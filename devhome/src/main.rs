//! Local workspace landing page.
//!
//! This binary lists one directory, detects the versions of locally
//! installed runtimes and gathers host statistics, then prints the result
//! as text or JSON.
//!
//! # Security Guarantees
//! - Local-only operation: nothing is sent off the host
//! - Database passwords are never printed or logged
//! - Process execution can be disabled with `--no-exec`

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use devhome_core::{
    CacheStore, FileCacheStore, Landing, LandingOptions, LandingReport, MemoryCacheStore,
    ProbeResult, SortKey, init_logging,
    models::{DirectoryEntry, StatsSnapshot},
    stats::{group_thousands, human_file_size, relative_time},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "devhome")]
#[command(about = "Local workspace landing page")]
#[command(version)]
#[command(long_about = "
devhome - Local workspace landing page

Lists one directory and augments it with:
- Versions of the local web server, PHP and MySQL
- Counts and recently modified entries
- Free disk space, memory and uptime of the host

Listings are cached per directory; a fresh cache skips the rescan.

EXAMPLES:
  devhome
  devhome report ~/Sites --sort date
  devhome --format json versions
  devhome --config ~/.config/devhome.json connection
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Full landing report (default)
    Report(ReportArgs),
    /// Directory listing only
    List(ListArgs),
    /// Detected runtime versions only
    Versions,
    /// Resolved database connection, password redacted
    Connection,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Directory to report on
    #[arg(default_value = ".", help = "Directory to list")]
    pub dir: PathBuf,

    /// Sort key override
    #[arg(long, value_parser = parse_sort, help = "Sort by name, date or size")]
    pub sort: Option<SortKey>,

    /// Cache TTL override
    #[arg(long, value_name = "SECS", help = "Listing cache lifetime in seconds")]
    pub ttl: Option<u64>,

    /// Skip the on-disk cache
    #[arg(long, help = "Do not read or write the on-disk listing cache")]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Directory to list
    #[arg(default_value = ".", help = "Directory to list")]
    pub dir: PathBuf,

    /// Sort key override
    #[arg(long, value_parser = parse_sort, help = "Sort by name, date or size")]
    pub sort: Option<SortKey>,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v debug, -vv trace)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Options file
    #[arg(
        long,
        global = true,
        env = "DEVHOME_CONFIG",
        help = "JSON options file (exclusions, sort, cache TTL, runtimes)"
    )]
    pub config: Option<PathBuf>,

    /// Disable process execution
    #[arg(
        long,
        global = true,
        help = "Never spawn external processes while probing versions"
    )]
    pub no_exec: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Available output formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON structured output
    Json,
}

fn parse_sort(value: &str) -> Result<SortKey, String> {
    Ok(SortKey::parse_lenient(value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let options = load_options(&cli.global)?;

    match cli.command {
        Some(Command::Report(args)) => run_report(options, &args, cli.global.format).await,
        Some(Command::List(args)) => run_list(options, &args, cli.global.format),
        Some(Command::Versions) => run_versions(options, cli.global.format).await,
        Some(Command::Connection) => run_connection(options, cli.global.format),
        None => {
            let args = ReportArgs {
                dir: PathBuf::from("."),
                sort: None,
                ttl: None,
                no_cache: false,
            };
            run_report(options, &args, cli.global.format).await
        }
    }
}

/// Reads the options file, if any, and applies global overrides
fn load_options(global: &GlobalArgs) -> anyhow::Result<LandingOptions> {
    let mut options = match &global.config {
        Some(path) => {
            info!("Loading options from {}", path.display());
            LandingOptions::load(path)
                .with_context(|| format!("invalid options file {}", path.display()))?
        }
        None => LandingOptions::default(),
    };
    if global.no_exec {
        options.allow_exec = false;
    }
    Ok(options)
}

fn store_for(no_cache: bool) -> Arc<dyn CacheStore> {
    if no_cache {
        Arc::new(MemoryCacheStore::new())
    } else {
        let store = FileCacheStore::default_location();
        debug!("Listing cache at {}", store.dir().display());
        Arc::new(store)
    }
}

/// Prints the full landing report
async fn run_report(
    mut options: LandingOptions,
    args: &ReportArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if let Some(sort) = args.sort {
        options.sort = sort;
    }
    if let Some(ttl) = args.ttl {
        options.cache_ttl_secs = ttl;
    }

    let landing = Landing::new(options, store_for(args.no_cache));
    let report = landing.build(&args.dir).await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }

    if let Some(error) = report.error {
        bail!(error);
    }
    Ok(())
}

/// Prints the sorted listing only
fn run_list(mut options: LandingOptions, args: &ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(sort) = args.sort {
        options.sort = sort;
    }

    let landing = Landing::new(options, store_for(false));
    let listing = landing.listing(&args.dir)?;
    info!(
        "Listed {} entries (cached: {})",
        listing.entries.len(),
        listing.from_cache
    );

    match format {
        OutputFormat::Json => print_json(&listing.entries)?,
        OutputFormat::Text => print_entries(&listing.root, &listing.entries),
    }
    Ok(())
}

/// Prints the detected runtime versions
async fn run_versions(options: LandingOptions, format: OutputFormat) -> anyhow::Result<()> {
    let landing = Landing::new(options, store_for(true));
    let versions = landing.versions().await;

    match format {
        OutputFormat::Json => print_json(&versions)?,
        OutputFormat::Text => print_versions(&versions),
    }
    Ok(())
}

/// Prints the resolved database connection
fn run_connection(options: LandingOptions, format: OutputFormat) -> anyhow::Result<()> {
    let landing = Landing::new(options, store_for(true));
    let summary = landing.connection().summary();

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            println!("Connection: {}", summary.url);
            if let Some(socket) = &summary.socket {
                println!("  Socket:   {}", socket.display());
            }
            println!("  User:     {}", summary.user.as_deref().unwrap_or("-"));
            println!(
                "  Password: {}",
                if summary.password_set { "set" } else { "not set" }
            );
            println!("  Database: {}", summary.database.as_deref().unwrap_or("-"));
            println!("  Timeout:  {}s", summary.timeout_secs);
            println!(
                "  Live probe: {}",
                if summary.attemptable {
                    "attempted"
                } else {
                    "skipped (no user or socket)"
                }
            );
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_report(report: &LandingReport) {
    print_entries(&report.root, &report.entries);
    println!();
    print_stats(&report.stats);
    println!();
    print_versions(&report.versions);
    if report.from_cache {
        println!();
        println!("(listing served from cache)");
    }
}

fn print_entries(root: &Path, entries: &[DirectoryEntry]) {
    println!("{}", root.display());
    if entries.is_empty() {
        println!("  (empty)");
        return;
    }

    let now = chrono::Utc::now();
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in entries {
        let name = if entry.kind.is_dir() {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let size = entry.size_bytes.map_or_else(
            || "-".to_string(),
            |bytes| human_file_size(i64::try_from(bytes).unwrap_or(i64::MAX)),
        );
        println!(
            "  {:<width$}  {:>9}  {}",
            name,
            size,
            relative_time(entry.modified_at, now),
            width = width + 1
        );
    }
}

fn print_stats(stats: &StatsSnapshot) {
    println!(
        "Directories: {}  Files: {}",
        group_thousands(stats.directories as u64),
        group_thousands(stats.files as u64)
    );
    if let Some(latest) = &stats.latest {
        println!("Latest: {} ({}, {})", latest.name, latest.kind, latest.relative);
    }
    if !stats.recent.is_empty() {
        println!("Recently modified:");
        for entry in &stats.recent {
            println!("  {} ({}, {})", entry.name, entry.relative, entry.absolute);
        }
    }
    if let Some(disk) = &stats.disk {
        println!(
            "Disk: {} free of {} ({}%)",
            human_size(disk.free_bytes),
            human_size(disk.total_bytes),
            disk.free_percent
        );
    }
    if let (Some(available), Some(total)) = (
        stats.host.available_memory_bytes,
        stats.host.total_memory_bytes,
    ) {
        println!(
            "Memory: {} available of {}",
            human_size(available),
            human_size(total)
        );
    }
    if let Some(cores) = stats.host.cpu_cores {
        println!("CPU cores: {}", cores);
    }
    if let Some(uptime) = stats.host.uptime_secs {
        println!("Uptime: {}", format_uptime(uptime));
    }
    if let Some(os) = &stats.host.os_name {
        println!("OS: {}", os);
    }
}

fn print_versions(versions: &[ProbeResult]) {
    println!("Runtimes:");
    for result in versions {
        match result.source {
            Some(source) => println!(
                "  {:<8} {} (via {})",
                result.runtime,
                result.display_version(),
                source
            ),
            None => println!("  {:<8} {}", result.runtime, result.display_version()),
        }
    }
}

fn human_size(bytes: u64) -> String {
    human_file_size(i64::try_from(bytes).unwrap_or(i64::MAX))
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
