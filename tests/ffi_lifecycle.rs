//! Full lifecycle of the exported C functions.
//!
//! Kept in its own test binary because it shuts the process-wide sampler down.

use host_telemetry::ffi::{initialize_sampler, read_cpu, read_disk, sampler_ready, shutdown_sampler};
use host_telemetry::{CpuSnapshot, DiskSnapshot, TelemetryStatus};

#[test]
fn test_load_sample_unload() {
    let mut cpu = CpuSnapshot::default();

    // reading before initialize is a checked, partial result
    assert!(!sampler_ready());
    assert_eq!(unsafe { read_cpu(&mut cpu) }, TelemetryStatus::Partial);
    assert_eq!(cpu.cpu_usage, 0.0);
    assert!(cpu.core_count > 0);

    assert!(initialize_sampler());
    assert!(sampler_ready());

    for _ in 0..3 {
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let status = unsafe { read_cpu(&mut cpu) };
        assert!(status.is_written());
        assert!((0.0..=100.0).contains(&cpu.cpu_usage));
    }

    let mut disk = DiskSnapshot::default();
    assert!(unsafe { read_disk(&mut disk) }.is_written());
    assert_eq!(disk.total_space, disk.used_space + disk.free_space);

    shutdown_sampler();
    shutdown_sampler();
    assert!(!sampler_ready());
    assert!(!initialize_sampler(), "closed sampler must not reopen");

    cpu.cpu_usage = 42.0;
    assert_eq!(unsafe { read_cpu(&mut cpu) }, TelemetryStatus::Partial);
    assert_eq!(cpu.cpu_usage, 0.0);
}
