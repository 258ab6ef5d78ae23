//! Host metrics collection and data structures.
//!
//! This module provides the CPU usage sampler, the memory, CPU and disk
//! collectors, and the probe traits they read through.

pub mod collector;
pub mod data;
pub mod probe;
pub mod procfs;
pub mod sampler;
pub mod traits;

// Re-export commonly used items
pub use collector::{collect_all_disks, collect_cpu, collect_disk, collect_memory};
pub use data::{Collected, CpuSnapshot, DiskSnapshot, FieldFailure, FieldGroup, MemorySnapshot};
pub use probe::SystemProbe;
pub use sampler::{Sampler, SamplerState, SysinfoCounters, TOTAL_PROCESSOR_TIME};
pub use traits::{CounterBackend, CpuProbe, DiskProbe, MemoryProbe};
