//! System snapshot collection.
//!
//! `SnapshotProvider` is the pollable source; `SnapshotPoller` composes its
//! readings into immutable `SystemSnapshot` values and keeps the last good
//! one when a poll fails.

mod collector;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::errors::SnapshotError;
use crate::models::{DiskUsage, MemoryInfo, SystemSnapshot};

pub use collector::SystemCollector;

/// Source of raw system readings.
pub trait SnapshotProvider: Send {
    fn cpu_usage_pct(&mut self) -> Result<f32, SnapshotError>;
    fn memory_info(&mut self) -> Result<MemoryInfo, SnapshotError>;
    fn disk_info(&mut self, path: &Path) -> Result<DiskUsage, SnapshotError>;
    /// Seconds since the host booted.
    fn uptime_seconds(&mut self) -> Result<u64, SnapshotError>;
}

/// Polls a provider on its own interval and caches the latest snapshot.
pub struct SnapshotPoller {
    provider: Box<dyn SnapshotProvider>,
    disk_path: PathBuf,
    interval: Duration,
    last_poll: Option<Instant>,
    latest: Option<SystemSnapshot>,
}

impl SnapshotPoller {
    pub fn new(provider: Box<dyn SnapshotProvider>, disk_path: PathBuf, interval: Duration) -> Self {
        Self {
            provider,
            disk_path,
            interval,
            last_poll: None,
            latest: None,
        }
    }

    pub fn latest(&self) -> Option<&SystemSnapshot> {
        self.latest.as_ref()
    }

    /// Whether the polling interval has elapsed since the last poll.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_poll {
            None => true,
            Some(t) => now.duration_since(t) >= self.interval,
        }
    }

    /// Poll if due. Returns `Ok(true)` when a new snapshot was stored.
    /// On failure the previous snapshot stays in place.
    pub fn refresh_if_due(&mut self, now: Instant) -> Result<bool, SnapshotError> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.last_poll = Some(now);
        let snapshot = self.poll()?;
        self.latest = Some(snapshot);
        Ok(true)
    }

    fn poll(&mut self) -> Result<SystemSnapshot, SnapshotError> {
        let cpu_pct = self.provider.cpu_usage_pct()?;
        let mem = self.provider.memory_info()?;
        let disk = self.provider.disk_info(&self.disk_path)?;
        Ok(SystemSnapshot {
            cpu_pct,
            mem_used_gb: mem.used_gb,
            mem_total_gb: mem.total_gb,
            disk_free_gb: disk.free_gb,
            disk_total_gb: disk.total_gb,
            uptime_seconds: self.provider.uptime_seconds()?,
        })
    }
}
