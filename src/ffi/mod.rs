//! Flat C ABI over the collectors.
//!
//! The exported functions write `#[repr(C)]` records into caller-owned
//! memory. CPU usage comes from one process-wide [`Sampler`] behind a mutex,
//! so concurrent `read_cpu` calls are serialized. The host calls
//! [`initialize_sampler`] after loading the library and [`shutdown_sampler`]
//! before unloading it.

pub mod status;

pub use status::TelemetryStatus;

use crate::config::TelemetryConfig;
use crate::metrics::{
    collect_cpu, collect_disk, collect_memory, Collected, CpuSnapshot, DiskSnapshot,
    MemorySnapshot, Sampler, SamplerState, SysinfoCounters, SystemProbe,
};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

lazy_static! {
    static ref SAMPLER: Mutex<Sampler<SysinfoCounters>> =
        Mutex::new(Sampler::new(SysinfoCounters));
}

/// Run `collect` and write its snapshot to `out`.
///
/// # Safety
///
/// `out` must be null or valid for writing one `S`.
unsafe fn write_collected<S: Default>(
    out: *mut S,
    collect: impl FnOnce() -> Collected<S>,
) -> TelemetryStatus {
    if out.is_null() {
        return TelemetryStatus::NullPointer;
    }

    match panic::catch_unwind(AssertUnwindSafe(collect)) {
        Ok(collected) => {
            let status = TelemetryStatus::from_collected(&collected);
            out.write(collected.snapshot);
            status
        }
        Err(_) => {
            error!("collector panicked");
            out.write(S::default());
            TelemetryStatus::Panicked
        }
    }
}

/// Open the CPU usage query and take a priming sample.
///
/// Returns `true` when the sampler is ready, including when it already was.
#[no_mangle]
pub extern "C" fn initialize_sampler() -> bool {
    let result = panic::catch_unwind(|| SAMPLER.lock().initialize());
    match result {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "sampler initialization failed");
            false
        }
        Err(_) => {
            error!("sampler initialization panicked");
            false
        }
    }
}

/// Release the CPU usage query. Further CPU reads report usage as failed.
#[no_mangle]
pub extern "C" fn shutdown_sampler() {
    if panic::catch_unwind(|| SAMPLER.lock().shutdown()).is_err() {
        error!("sampler shutdown panicked");
    }
}

/// Whether the process-wide sampler is ready.
#[no_mangle]
pub extern "C" fn sampler_ready() -> bool {
    match panic::catch_unwind(|| SAMPLER.lock().state()) {
        Ok(state) => state == SamplerState::Ready,
        Err(_) => {
            error!("sampler state query panicked");
            false
        }
    }
}

/// Fill `out` with memory statistics.
///
/// # Safety
///
/// `out` must be null or point to writable memory for one `MemorySnapshot`.
#[no_mangle]
pub unsafe extern "C" fn read_memory(out: *mut MemorySnapshot) -> TelemetryStatus {
    write_collected(out, || collect_memory(&mut SystemProbe::new()))
}

/// Fill `out` with CPU statistics.
///
/// # Safety
///
/// `out` must be null or point to writable memory for one `CpuSnapshot`.
#[no_mangle]
pub unsafe extern "C" fn read_cpu(out: *mut CpuSnapshot) -> TelemetryStatus {
    write_collected(out, || {
        let mut sampler = SAMPLER.lock();
        collect_cpu(&mut SystemProbe::new(), &mut *sampler)
    })
}

/// Fill `out` with space figures for the default volume.
///
/// # Safety
///
/// `out` must be null or point to writable memory for one `DiskSnapshot`.
#[no_mangle]
pub unsafe extern "C" fn read_disk(out: *mut DiskSnapshot) -> TelemetryStatus {
    let volume = configured_volume();
    write_collected(out, || collect_disk(&mut SystemProbe::new(), &volume))
}

/// Default volume from the environment, or the built-in one if that is invalid.
pub(crate) fn configured_volume() -> PathBuf {
    TelemetryConfig::from_env()
        .unwrap_or_else(|err| {
            warn!(error = %err, "ignoring invalid configuration");
            TelemetryConfig::default()
        })
        .default_volume
}

/// Fill `out` with space figures for the volume holding `volume`.
///
/// # Safety
///
/// `volume` must be null or a valid NUL-terminated string, and `out` must be
/// null or point to writable memory for one `DiskSnapshot`.
#[no_mangle]
pub unsafe extern "C" fn read_disk_volume(
    volume: *const c_char,
    out: *mut DiskSnapshot,
) -> TelemetryStatus {
    if out.is_null() || volume.is_null() {
        return TelemetryStatus::NullPointer;
    }

    let volume = match CStr::from_ptr(volume).to_str() {
        Ok(path) if !path.is_empty() => path,
        _ => {
            debug!("rejecting volume argument that is empty or not UTF-8");
            out.write(DiskSnapshot::default());
            return TelemetryStatus::InvalidArgument;
        }
    };

    write_collected(out, || collect_disk(&mut SystemProbe::new(), Path::new(volume)))
}
