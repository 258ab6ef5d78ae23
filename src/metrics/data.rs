//! Data structures for host telemetry.
//!
//! The three snapshot records are `#[repr(C)]` so they can be handed across
//! the C ABI unchanged. Placeholder fields are part of the output shape and
//! are always written as zero.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory statistics for the host and the calling process.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Total physical memory in bytes
    pub total_physical: u64,
    /// Available physical memory in bytes
    pub available_physical: u64,
    /// Percentage of physical memory in use (0.0 to 100.0)
    pub memory_load: f64,
    /// Page faults taken by the calling process
    pub page_fault_count: u64,
    /// Peak resident set of the calling process in bytes
    pub peak_working_set: u64,
    /// Private (anonymous plus swapped) bytes of the calling process
    pub private_usage: u64,
    /// Placeholder, always zero
    pub paged_pool: u64,
    /// Placeholder, always zero
    pub non_paged_pool: u64,
    /// Placeholder, always zero
    pub cache_memory: u64,
    /// Open handles held by the calling process
    pub handle_count: u64,
}

/// CPU statistics for the host and the calling process.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    /// System-wide CPU usage percentage (0.0 to 100.0)
    pub cpu_usage: f64,
    /// Placeholder, always zero
    pub frequency: u64,
    /// Number of logical processors
    pub core_count: u64,
    /// Processors this process is allowed to run on
    pub available_processors: u64,
    /// Threads in the calling process
    pub thread_count: u64,
    /// Time spent in kernel mode since boot, in milliseconds
    pub system_time: u64,
    /// Time spent in user mode since boot, in milliseconds
    pub user_time: u64,
    /// Idle time since boot, in milliseconds
    pub idle_time: u64,
    /// Placeholder, always zero
    pub interrupt_time: u64,
    /// Placeholder, always zero
    pub dpc_time: u64,
    /// Placeholder, always zero
    pub context_switches: u64,
}

/// Space usage for a single volume.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    /// Total space in bytes
    pub total_space: u64,
    /// Used space in bytes
    pub used_space: u64,
    /// Free space in bytes available to unprivileged users; blocks reserved
    /// for root are counted in `used_space`
    pub free_space: u64,
    /// Placeholder, always zero
    pub read_speed: f64,
    /// Placeholder, always zero
    pub write_speed: f64,
    /// Placeholder, always zero
    pub read_bytes: u64,
    /// Placeholder, always zero
    pub write_bytes: u64,
    /// Placeholder, always zero
    pub queue_length: u64,
    /// Placeholder, always zero
    pub response_time: f64,
    /// Placeholder, always zero
    pub active_time: u64,
}

impl DiskSnapshot {
    /// Build a snapshot from total and free bytes.
    ///
    /// `free` is clamped to `total`, so `total_space == used_space + free_space`
    /// holds for every snapshot.
    pub fn from_space(total: u64, free: u64) -> Self {
        let free_space = free.min(total);
        Self {
            total_space: total,
            used_space: total - free_space,
            free_space,
            ..Self::default()
        }
    }

    /// Usage percentage (0.0 to 100.0).
    pub fn usage_percent(&self) -> f64 {
        if self.total_space > 0 {
            self.used_space as f64 / self.total_space as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// The set of snapshot fields filled by one OS query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    /// total_physical, available_physical, memory_load
    SystemMemory,
    /// page_fault_count, peak_working_set, private_usage
    ProcessMemory,
    /// handle_count
    Handles,
    /// cpu_usage
    CpuUsage,
    /// core_count
    CoreCount,
    /// available_processors
    Affinity,
    /// thread_count
    Threads,
    /// system_time, user_time, idle_time
    CpuTimes,
    /// total_space, used_space, free_space
    DiskSpace,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldGroup::SystemMemory => "system memory",
            FieldGroup::ProcessMemory => "process memory",
            FieldGroup::Handles => "handles",
            FieldGroup::CpuUsage => "cpu usage",
            FieldGroup::CoreCount => "core count",
            FieldGroup::Affinity => "affinity",
            FieldGroup::Threads => "threads",
            FieldGroup::CpuTimes => "cpu times",
            FieldGroup::DiskSpace => "disk space",
        };
        f.write_str(name)
    }
}

/// A field group that could not be read, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub group: FieldGroup,
    pub reason: String,
}

/// The outcome of one collector call.
///
/// Fields belonging to a group listed in `failures` are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collected<S> {
    /// Timestamp when this snapshot was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    pub snapshot: S,
    pub failures: Vec<FieldFailure>,
}

impl<S: Default> Collected<S> {
    /// Start an empty collection stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            snapshot: S::default(),
            failures: Vec::new(),
        }
    }
}

impl<S: Default> Default for Collected<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Collected<S> {
    /// Whether every field group was read successfully.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the given field group failed.
    pub fn failed(&self, group: FieldGroup) -> bool {
        self.failures.iter().any(|f| f.group == group)
    }

    /// Run `read` and store its value with `apply`, or record the failure.
    pub(crate) fn fill<T>(
        &mut self,
        group: FieldGroup,
        read: crate::Result<T>,
        apply: impl FnOnce(&mut S, T),
    ) {
        match read {
            Ok(value) => apply(&mut self.snapshot, value),
            Err(err) => {
                tracing::warn!(%group, error = %err, "field group unavailable");
                self.failures.push(FieldFailure {
                    group,
                    reason: err.to_string(),
                });
            }
        }
    }
}
