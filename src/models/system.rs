/// System-wide resource snapshot shown in the header.
/// Recomputed on each poll; never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub cpu_pct: f32,
    pub mem_used_gb: f64,
    pub mem_total_gb: f64,
    pub disk_free_gb: f64,
    pub disk_total_gb: f64,
    /// Seconds since the host booted.
    pub uptime_seconds: u64,
}

/// Memory reading from the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub used_gb: f64,
    pub total_gb: f64,
}

/// Filesystem reading for the volume holding a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub free_gb: f64,
    pub total_gb: f64,
    pub used_gb: f64,
    pub used_pct: f64,
}

impl SystemSnapshot {
    pub fn memory_percent(&self) -> f32 {
        if self.mem_total_gb <= 0.0 {
            return 0.0;
        }
        (self.mem_used_gb / self.mem_total_gb * 100.0) as f32
    }

    pub fn disk_used_percent(&self) -> f32 {
        if self.disk_total_gb <= 0.0 {
            return 0.0;
        }
        ((self.disk_total_gb - self.disk_free_gb) / self.disk_total_gb * 100.0) as f32
    }
}

impl DiskUsage {
    pub fn from_bytes(available: u64, total: u64) -> Self {
        let free_gb = bytes_to_gb(available);
        let total_gb = bytes_to_gb(total);
        let used_gb = (total_gb - free_gb).max(0.0);
        let used_pct = if total_gb > 0.0 {
            used_gb / total_gb * 100.0
        } else {
            0.0
        };
        Self {
            free_gb,
            total_gb,
            used_gb,
            used_pct,
        }
    }
}

/// Bytes to GiB.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}
