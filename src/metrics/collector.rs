//! Collectors that turn probe reads into snapshots.
//!
//! Every collector is a free function: it reads each field group through the
//! probe, writes the fields it got, and records a [`FieldFailure`] for the
//! ones it did not. Placeholder fields are never touched, so they stay zero.
//!
//! [`FieldFailure`]: crate::metrics::data::FieldFailure

use crate::metrics::{
    data::*,
    sampler::Sampler,
    traits::{CounterBackend, CpuProbe, DiskProbe, MemoryProbe},
};
use std::collections::BTreeMap;
use std::path::Path;

/// Read memory statistics into a [`MemorySnapshot`].
pub fn collect_memory<P: MemoryProbe>(probe: &mut P) -> Collected<MemorySnapshot> {
    let mut collected = Collected::<MemorySnapshot>::new();

    collected.fill(FieldGroup::SystemMemory, probe.system_memory(), |s, mem| {
        let available = mem.available_bytes.min(mem.total_bytes);
        s.total_physical = mem.total_bytes;
        s.available_physical = available;
        s.memory_load = if mem.total_bytes > 0 {
            (mem.total_bytes - available) as f64 / mem.total_bytes as f64 * 100.0
        } else {
            0.0
        };
    });

    collected.fill(FieldGroup::ProcessMemory, probe.process_memory(), |s, process| {
        s.page_fault_count = process.page_faults;
        s.peak_working_set = process.peak_resident_bytes;
        s.private_usage = process.private_bytes;
    });

    collected.fill(FieldGroup::Handles, probe.handle_count(), |s, count| {
        s.handle_count = count;
    });

    collected
}

/// Read CPU statistics into a [`CpuSnapshot`].
///
/// Usage comes from `sampler`, which must already be initialized; otherwise
/// the usage group is reported as failed and `cpu_usage` is zero.
pub fn collect_cpu<P: CpuProbe, B: CounterBackend>(
    probe: &mut P,
    sampler: &mut Sampler<B>,
) -> Collected<CpuSnapshot> {
    let mut collected = Collected::<CpuSnapshot>::new();

    collected.fill(FieldGroup::CpuUsage, sampler.sample(), |s, usage| {
        s.cpu_usage = usage;
    });
    collected.fill(FieldGroup::CoreCount, probe.logical_cores(), |s, cores| {
        s.core_count = cores;
    });
    collected.fill(FieldGroup::Affinity, probe.available_processors(), |s, count| {
        s.available_processors = count;
    });
    collected.fill(FieldGroup::Threads, probe.thread_count(), |s, count| {
        s.thread_count = count;
    });
    collected.fill(FieldGroup::CpuTimes, probe.cpu_times(), |s, times| {
        s.system_time = times.system_ms;
        s.user_time = times.user_ms;
        s.idle_time = times.idle_ms;
    });

    collected
}

/// Read space figures for the volume holding `volume`.
pub fn collect_disk<P: DiskProbe>(probe: &mut P, volume: &Path) -> Collected<DiskSnapshot> {
    let mut collected = Collected::<DiskSnapshot>::new();

    collected.fill(FieldGroup::DiskSpace, probe.volume_space(volume), |s, space| {
        *s = DiskSnapshot::from_space(space.total_bytes, space.free_bytes);
    });

    collected
}

/// Read space figures for every mounted volume, keyed by mount point.
pub fn collect_all_disks<P: DiskProbe>(
    probe: &mut P,
) -> crate::Result<BTreeMap<String, DiskSnapshot>> {
    let volumes = probe.volumes()?;
    Ok(volumes
        .into_iter()
        .map(|v| {
            (
                v.mount_point.to_string_lossy().to_string(),
                DiskSnapshot::from_space(v.total_bytes, v.free_bytes),
            )
        })
        .collect())
}
