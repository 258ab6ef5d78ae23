//! # Host Telemetry
//!
//! Memory, CPU and disk statistics for the host and the calling process,
//! available as a Rust API and as a flat C ABI for embedding in other
//! programs.
//!
//! ## Features
//!
//! - **CPU sampler**: one open usage query, cheap repeated samples
//! - **Collectors**: memory, CPU and per-volume disk snapshots
//! - **Explicit failures**: every snapshot lists the field groups it could not read
//! - **C ABI**: `#[repr(C)]` records and `extern "C"` exports from the `cdylib`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use host_telemetry::{collect_cpu, collect_disk, Sampler, SysinfoCounters, SystemProbe};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sampler = Sampler::new(SysinfoCounters);
//!     sampler.initialize()?;
//!
//!     let mut probe = SystemProbe::new();
//!     let cpu = collect_cpu(&mut probe, &mut sampler);
//!     let disk = collect_disk(&mut probe, Path::new("/"));
//!
//!     println!("cpu {:.1}%, disk {} bytes free", cpu.snapshot.cpu_usage, disk.snapshot.free_space);
//!     sampler.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ffi;
pub mod metrics;

// Re-export public API
pub use config::{TelemetryConfig, DEFAULT_VOLUME};
pub use error::{Result, TelemetryError};
pub use ffi::TelemetryStatus;
pub use metrics::{
    collector::{collect_all_disks, collect_cpu, collect_disk, collect_memory},
    data::{Collected, CpuSnapshot, DiskSnapshot, FieldFailure, FieldGroup, MemorySnapshot},
    probe::SystemProbe,
    sampler::{Sampler, SamplerState, SysinfoCounters, TOTAL_PROCESSOR_TIME},
    traits::{CounterBackend, CpuProbe, DiskProbe, MemoryProbe},
};
