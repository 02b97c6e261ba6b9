//! Host metric queries.

use std::path::{Path, PathBuf};
use sysinfo::{DiskExt, System, SystemExt};
use tracing::debug;

/// Source of host-level metrics. Every query is independently optional.
pub trait HostQueries: Send + Sync {
    /// `(free, total)` bytes of the filesystem holding `path`.
    fn disk_space(&self, path: &Path) -> Option<(u64, u64)>;

    /// Installed memory in bytes
    fn total_memory(&self) -> Option<u64>;

    /// Memory available to new processes, in bytes
    fn available_memory(&self) -> Option<u64>;

    /// Logical CPU count
    fn cpu_cores(&self) -> Option<usize>;

    /// Seconds since boot
    fn uptime(&self) -> Option<u64>;

    /// Operating system name and version
    fn os_name(&self) -> Option<String>;
}

/// Mounted filesystem as seen at collection time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountInfo {
    mount_point: PathBuf,
    available: u64,
    total: u64,
}

/// [`HostQueries`] backed by a one-shot `sysinfo` collection.
#[derive(Debug, Clone, Default)]
pub struct SysinfoHost {
    total_memory: Option<u64>,
    available_memory: Option<u64>,
    cpu_cores: Option<usize>,
    uptime: Option<u64>,
    os_name: Option<String>,
    mounts: Vec<MountInfo>,
}

impl SysinfoHost {
    /// Collects memory, CPU, uptime, OS and disk information once.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();
        sys.refresh_disks_list();
        sys.refresh_disks();

        let mounts: Vec<MountInfo> = sys
            .disks()
            .iter()
            .map(|disk| MountInfo {
                mount_point: disk.mount_point().to_path_buf(),
                available: disk.available_space(),
                total: disk.total_space(),
            })
            .collect();
        debug!(mounts = mounts.len(), "collected host metrics");

        Self {
            total_memory: non_zero(sys.total_memory()),
            available_memory: non_zero(sys.available_memory()),
            cpu_cores: Some(sys.cpus().len())
                .filter(|n| *n > 0)
                .or_else(|| sys.physical_core_count()),
            uptime: non_zero(sys.uptime()),
            os_name: sys.long_os_version().or_else(|| sys.name()),
            mounts,
        }
    }
}

impl HostQueries for SysinfoHost {
    fn disk_space(&self, path: &Path) -> Option<(u64, u64)> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.mounts
            .iter()
            .filter(|m| path.starts_with(&m.mount_point))
            .max_by_key(|m| m.mount_point.components().count())
            .map(|m| (m.available, m.total))
    }

    fn total_memory(&self) -> Option<u64> {
        self.total_memory
    }

    fn available_memory(&self) -> Option<u64> {
        self.available_memory
    }

    fn cpu_cores(&self) -> Option<usize> {
        self.cpu_cores
    }

    fn uptime(&self) -> Option<u64> {
        self.uptime
    }

    fn os_name(&self) -> Option<String> {
        self.os_name.clone()
    }
}

fn non_zero(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}
