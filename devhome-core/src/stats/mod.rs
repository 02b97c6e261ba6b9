//! Statistics derived from a listing plus host metrics.
//!
//! Nothing here is persisted; a [`StatsSnapshot`] is recomputed for every
//! request from the (possibly cached) entries and fresh host queries.

mod format;
mod host;


pub use format::{
    format_absolute, format_relative_time, group_thousands, human_file_size, relative_time,
};
pub use host::{HostQueries, SysinfoHost};

use crate::models::{
    DirectoryEntry, DiskUsage, HostMetrics, LatestEntry, RecentEntry, StatsSnapshot,
};
use chrono::{DateTime, Local, Utc};
use std::path::Path;

/// Maximum number of entries in [`StatsSnapshot::recent`]
pub const RECENT_LIMIT: usize = 5;

/// Computes the snapshot for `entries` scanned from `root`.
///
/// Entries stamped at or before the Unix epoch are counted but never
/// considered for the latest/recent lists.
pub fn summarize(
    entries: &[DirectoryEntry],
    host: &dyn HostQueries,
    root: &Path,
    now: DateTime<Utc>,
) -> StatsSnapshot {
    let directories = entries.iter().filter(|e| e.kind.is_dir()).count();
    let files = entries.len() - directories;

    let mut dated: Vec<&DirectoryEntry> = entries
        .iter()
        .filter(|e| e.modified_at.timestamp() > 0)
        .collect();

    // Strictly newer replaces, so ties keep the first entry encountered.
    let latest = dated
        .iter()
        .fold(None::<&DirectoryEntry>, |best, entry| match best {
            Some(b) if entry.modified_at <= b.modified_at => Some(b),
            _ => Some(entry),
        })
        .map(|entry| LatestEntry {
            name: entry.name.clone(),
            kind: entry.kind,
            modified_at: entry.modified_at,
            relative: relative_time(entry.modified_at, now),
        });

    dated.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    let recent = dated
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|entry| RecentEntry {
            name: entry.name.clone(),
            kind: entry.kind,
            modified_at: entry.modified_at,
            relative: relative_time(entry.modified_at, now),
            absolute: format_absolute(&entry.modified_at.with_timezone(&Local)),
        })
        .collect();

    StatsSnapshot {
        directories,
        files,
        latest,
        recent,
        disk: disk_usage(host, root),
        host: HostMetrics {
            total_memory_bytes: host.total_memory(),
            available_memory_bytes: host.available_memory(),
            cpu_cores: host.cpu_cores(),
            uptime_secs: host.uptime(),
            os_name: host.os_name(),
        },
    }
}

/// Disk usage for `root`; `None` unless the total is known and non-zero.
pub fn disk_usage(host: &dyn HostQueries, root: &Path) -> Option<DiskUsage> {
    let (free, total) = host.disk_space(root)?;
    if total == 0 {
        return None;
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let free_percent = ((free as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8;
    Some(DiskUsage {
        free_bytes: free,
        total_bytes: total,
        free_percent,
    })
}
