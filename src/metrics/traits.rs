//! Traits for host information sources.
//!
//! Collectors read through these traits so the OS can be replaced with a
//! fake in tests. Each method is one OS query and fills one field group.

use crate::error::Result;
use crate::metrics::procfs::{CpuTimes, ProcessMemory};
use std::path::{Path, PathBuf};

/// Physical memory totals for the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemMemory {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Space figures for one mounted volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpace {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Source of memory statistics.
pub trait MemoryProbe {
    /// Host-wide physical memory.
    fn system_memory(&mut self) -> Result<SystemMemory>;

    /// Counters for the calling process.
    fn process_memory(&mut self) -> Result<ProcessMemory>;

    /// Open handles held by the calling process.
    fn handle_count(&mut self) -> Result<u64>;
}

/// Source of CPU statistics other than usage.
pub trait CpuProbe {
    /// Number of logical processors.
    fn logical_cores(&mut self) -> Result<u64>;

    /// Processors the calling process may run on.
    fn available_processors(&mut self) -> Result<u64>;

    /// Threads in the calling process.
    fn thread_count(&mut self) -> Result<u64>;

    /// CPU time accumulated since boot.
    fn cpu_times(&mut self) -> Result<CpuTimes>;
}

/// Source of volume space figures.
pub trait DiskProbe {
    /// Every mounted volume.
    fn volumes(&mut self) -> Result<Vec<VolumeSpace>>;

    /// The volume holding `path`.
    ///
    /// The default implementation picks the mount point that is the longest
    /// prefix of `path`.
    fn volume_space(&mut self, path: &Path) -> Result<VolumeSpace> {
        let volumes = self.volumes()?;
        resolve_volume(&volumes, path)
            .cloned()
            .ok_or_else(|| crate::TelemetryError::VolumeNotFound(path.display().to_string()))
    }
}

/// Find the volume whose mount point is the longest prefix of `path`.
pub fn resolve_volume<'a>(volumes: &'a [VolumeSpace], path: &Path) -> Option<&'a VolumeSpace> {
    volumes
        .iter()
        .filter(|v| path.starts_with(&v.mount_point))
        .max_by_key(|v| v.mount_point.components().count())
}

/// Handle-based CPU usage counter API.
///
/// Mirrors the open query / add counter / collect / format sequence that
/// differential CPU usage needs.
pub trait CounterBackend {
    type Query;

    /// Open a new query context.
    fn open_query(&mut self) -> Result<Self::Query>;

    /// Register a counter path against an open query.
    fn add_counter(&mut self, query: &mut Self::Query, path: &str) -> Result<()>;

    /// Take a new sample for every counter on the query.
    fn collect(&mut self, query: &mut Self::Query) -> Result<()>;

    /// Latest collected value of the registered counter.
    fn formatted_value(&mut self, query: &Self::Query) -> Result<f64>;

    /// Release a query context.
    fn close_query(&mut self, query: Self::Query);
}
