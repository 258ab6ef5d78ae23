//! Host probe backed by sysinfo and, on Linux, direct /proc access.

use crate::error::{Result, TelemetryError};
use crate::metrics::procfs::{self, CpuTimes, ProcessMemory};
use crate::metrics::traits::{CpuProbe, DiskProbe, MemoryProbe, SystemMemory, VolumeSpace};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

#[cfg(target_os = "linux")]
use std::fs;

/// Reads host information from the operating system.
///
/// Each call performs a fresh read; nothing is cached between calls.
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    /// Create a new probe.
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn read_proc(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(TelemetryError::from)
}

/// Kernel clock ticks per second, used to scale /proc/stat.
#[cfg(target_os = "linux")]
fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads a constant
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}

impl MemoryProbe for SystemProbe {
    fn system_memory(&mut self) -> Result<SystemMemory> {
        self.system.refresh_memory_specifics(MemoryRefreshKind::new().with_ram());
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(TelemetryError::system_error("no physical memory information available"));
        }
        Ok(SystemMemory {
            total_bytes,
            available_bytes: self.system.available_memory(),
        })
    }

    #[cfg(target_os = "linux")]
    fn process_memory(&mut self) -> Result<ProcessMemory> {
        let page_faults = procfs::parse_page_faults(&read_proc("/proc/self/stat")?)?;
        let (peak_resident_bytes, private_bytes) =
            procfs::parse_status_memory(&read_proc("/proc/self/status")?)?;
        debug!(page_faults, peak_resident_bytes, private_bytes, "read process memory");
        Ok(ProcessMemory {
            page_faults,
            peak_resident_bytes,
            private_bytes,
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn process_memory(&mut self) -> Result<ProcessMemory> {
        Err(TelemetryError::Unsupported("process memory counters"))
    }

    #[cfg(target_os = "linux")]
    fn handle_count(&mut self) -> Result<u64> {
        // the listing includes the descriptor read_dir holds open
        let entries = fs::read_dir("/proc/self/fd")?.count();
        Ok(entries.saturating_sub(1) as u64)
    }

    #[cfg(not(target_os = "linux"))]
    fn handle_count(&mut self) -> Result<u64> {
        Err(TelemetryError::Unsupported("process handle count"))
    }
}

impl CpuProbe for SystemProbe {
    fn logical_cores(&mut self) -> Result<u64> {
        self.system
            .refresh_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
        match self.system.cpus().len() {
            0 => Err(TelemetryError::system_error("no CPU information available")),
            n => Ok(n as u64),
        }
    }

    #[cfg(target_os = "linux")]
    fn available_processors(&mut self) -> Result<u64> {
        procfs::parse_allowed_cpus(&read_proc("/proc/self/status")?)
    }

    #[cfg(not(target_os = "linux"))]
    fn available_processors(&mut self) -> Result<u64> {
        Ok(std::thread::available_parallelism()?.get() as u64)
    }

    #[cfg(target_os = "linux")]
    fn thread_count(&mut self) -> Result<u64> {
        procfs::parse_thread_count(&read_proc("/proc/self/status")?)
    }

    #[cfg(not(target_os = "linux"))]
    fn thread_count(&mut self) -> Result<u64> {
        Err(TelemetryError::Unsupported("process thread count"))
    }

    #[cfg(target_os = "linux")]
    fn cpu_times(&mut self) -> Result<CpuTimes> {
        procfs::parse_cpu_times(&read_proc("/proc/stat")?, clock_ticks_per_second())
    }

    #[cfg(not(target_os = "linux"))]
    fn cpu_times(&mut self) -> Result<CpuTimes> {
        Err(TelemetryError::Unsupported("system CPU times"))
    }
}

impl DiskProbe for SystemProbe {
    fn volumes(&mut self) -> Result<Vec<VolumeSpace>> {
        let disks = Disks::new_with_refreshed_list();
        let volumes: Vec<VolumeSpace> = disks
            .iter()
            .map(|disk| VolumeSpace {
                mount_point: disk.mount_point().to_path_buf(),
                total_bytes: disk.total_space(),
                free_bytes: disk.available_space(),
            })
            .collect();
        debug!(count = volumes.len(), "listed mounted volumes");
        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_memory_is_consistent() {
        let mut probe = SystemProbe::new();
        let memory = probe.system_memory().unwrap();
        assert!(memory.total_bytes > 0);
    }

    #[test]
    fn test_logical_cores_matches_parallelism() {
        let mut probe = SystemProbe::new();
        let cores = probe.logical_cores().unwrap();
        assert!(cores > 0);
        // the affinity set never exceeds the host's processors
        let available = probe.available_processors().unwrap();
        assert!(available >= 1 && available <= cores);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_process_counters() {
        let mut probe = SystemProbe::new();
        let memory = probe.process_memory().unwrap();
        assert!(memory.peak_resident_bytes > 0);
        assert!(probe.thread_count().unwrap() >= 1);
        assert!(probe.handle_count().unwrap() >= 3);

        let times = probe.cpu_times().unwrap();
        assert!(times.user_ms + times.system_ms + times.idle_ms > 0);
    }

    #[cfg(target_os = "linux")]
    fn open_descriptors() -> u64 {
        // SAFETY: F_GETFD only queries the descriptor table
        (0..4096)
            .filter(|&fd| unsafe { libc::fcntl(fd, libc::F_GETFD) } != -1)
            .count() as u64
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_handle_count_matches_open_descriptors() {
        let mut probe = SystemProbe::new();
        // other tests open files concurrently, so wait for a quiet window
        for attempt in 0..50 {
            let before = open_descriptors();
            let count = probe.handle_count().unwrap();
            let after = open_descriptors();
            if before == after || attempt == 49 {
                assert_eq!(count, before);
                return;
            }
        }
    }
}
