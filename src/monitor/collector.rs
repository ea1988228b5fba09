use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};

use crate::errors::SnapshotError;
use crate::models::{bytes_to_gb, DiskUsage, MemoryInfo};

use super::SnapshotProvider;

/// Reads CPU, memory, and filesystem usage through `sysinfo`.
/// Single Responsibility: only gathers data, no caching or policy.
pub struct SystemCollector {
    sys: System,
    disks: Disks,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        // First CPU sample is a baseline; usage becomes meaningful on the next refresh.
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotProvider for SystemCollector {
    fn cpu_usage_pct(&mut self) -> Result<f32, SnapshotError> {
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Err(SnapshotError::Unavailable("no CPUs reported".into()));
        }
        Ok(self.sys.global_cpu_usage().clamp(0.0, 100.0))
    }

    fn memory_info(&mut self) -> Result<MemoryInfo, SnapshotError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SnapshotError::Unavailable("total memory is zero".into()));
        }
        Ok(MemoryInfo {
            used_gb: bytes_to_gb(self.sys.used_memory()),
            total_gb: bytes_to_gb(total),
        })
    }

    fn disk_info(&mut self, path: &Path) -> Result<DiskUsage, SnapshotError> {
        self.disks.refresh();
        let target = resolve(path);
        self.disks
            .list()
            .iter()
            .filter(|d| target.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| DiskUsage::from_bytes(d.available_space(), d.total_space()))
            .ok_or_else(|| {
                SnapshotError::Unavailable(format!("no filesystem found for {}", path.display()))
            })
    }

    fn uptime_seconds(&mut self) -> Result<u64, SnapshotError> {
        Ok(System::uptime())
    }
}

/// Absolute form of `path`; the directory may not exist yet, so fall back
/// to joining with the working directory.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_uptime_is_reported() {
        let mut collector = SystemCollector::new();
        assert!(collector.uptime_seconds().unwrap() > 0);
    }

    #[test]
    fn resolve_relative_is_absolute() {
        let p = resolve(Path::new("definitely-not-a-dir-xyz"));
        assert!(p.is_absolute());
        assert!(p.ends_with("definitely-not-a-dir-xyz"));
    }

    #[test]
    fn resolve_existing_canonicalizes() {
        let dir = tempfile::tempdir().unwrap();
        let p = resolve(dir.path());
        assert!(p.is_absolute());
    }
}
