//! Parsers for the Linux `/proc` files the probes read.
//!
//! Parsing is kept separate from file access so the layouts can be tested
//! with captured text.

use crate::error::{Result, TelemetryError};

/// Per-process memory counters read from `/proc/self/stat` and `/proc/self/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub page_faults: u64,
    pub peak_resident_bytes: u64,
    pub private_bytes: u64,
}

/// Aggregate CPU time since boot, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub system_ms: u64,
    pub user_ms: u64,
    pub idle_ms: u64,
}

/// Sum of minor and major page faults from a `/proc/<pid>/stat` line.
pub fn parse_page_faults(stat: &str) -> Result<u64> {
    // comm may contain spaces and parentheses, so split after the last ')'
    let rest = stat
        .rfind(')')
        .map(|idx| &stat[idx + 1..])
        .ok_or_else(|| TelemetryError::parse_error("stat line has no command field"))?;

    // fields after comm start at `state` (field 3); minflt is 10, majflt is 12
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let field = |index: usize, name: &str| -> Result<u64> {
        fields
            .get(index)
            .ok_or_else(|| TelemetryError::parse_error(format!("stat line missing {}", name)))?
            .parse::<u64>()
            .map_err(|e| TelemetryError::parse_error(format!("invalid {}: {}", name, e)))
    };

    Ok(field(7, "minflt")? + field(9, "majflt")?)
}

/// Look up a `Key:   value` line in `/proc/<pid>/status` and parse the first token.
fn status_value(status: &str, key: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name != key {
            return None;
        }
        value.split_whitespace().next()?.parse().ok()
    })
}

/// Peak resident set and private bytes from `/proc/<pid>/status`.
pub fn parse_status_memory(status: &str) -> Result<(u64, u64)> {
    let peak_kb = status_value(status, "VmHWM")
        .ok_or_else(|| TelemetryError::parse_error("status missing VmHWM"))?;
    let anon_kb = status_value(status, "RssAnon")
        .ok_or_else(|| TelemetryError::parse_error("status missing RssAnon"))?;
    // VmSwap is absent on kernels without swap accounting
    let swap_kb = status_value(status, "VmSwap").unwrap_or(0);

    Ok((peak_kb * 1024, (anon_kb + swap_kb) * 1024))
}

/// Thread count from `/proc/<pid>/status`.
pub fn parse_thread_count(status: &str) -> Result<u64> {
    status_value(status, "Threads").ok_or_else(|| TelemetryError::parse_error("status missing Threads"))
}

/// Number of CPUs in a `Cpus_allowed_list` value such as `0-3,6,8-9`.
pub fn parse_cpu_list(list: &str) -> Result<u64> {
    let mut count = 0u64;
    for range in list.trim().split(',').filter(|r| !r.is_empty()) {
        let parse = |s: &str| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| TelemetryError::parse_error(format!("invalid cpu '{}': {}", s, e)))
        };
        match range.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if end < start {
                    return Err(TelemetryError::parse_error(format!("invalid cpu range '{}'", range)));
                }
                count += end - start + 1;
            }
            None => {
                parse(range)?;
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Allowed CPU count from the `Cpus_allowed_list` line of `/proc/<pid>/status`.
pub fn parse_allowed_cpus(status: &str) -> Result<u64> {
    let list = status
        .lines()
        .find_map(|line| line.strip_prefix("Cpus_allowed_list:"))
        .ok_or_else(|| TelemetryError::parse_error("status missing Cpus_allowed_list"))?;
    parse_cpu_list(list)
}

/// Aggregate CPU times from the first line of `/proc/stat`.
///
/// `ticks_per_second` is the kernel's USER_HZ.
pub fn parse_cpu_times(stat: &str, ticks_per_second: u64) -> Result<CpuTimes> {
    if ticks_per_second == 0 {
        return Err(TelemetryError::parse_error("clock tick rate is zero"));
    }

    let line = stat
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| TelemetryError::parse_error("/proc/stat missing aggregate cpu line"))?;

    let ticks: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|value| value.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| TelemetryError::parse_error(format!("invalid cpu tick value: {}", e)))?;

    if ticks.len() < 5 {
        return Err(TelemetryError::parse_error("aggregate cpu line is too short"));
    }

    // user nice system idle iowait ...
    let to_ms = |t: u64| t.saturating_mul(1000) / ticks_per_second;
    Ok(CpuTimes {
        system_ms: to_ms(ticks[2]),
        user_ms: to_ms(ticks[0] + ticks[1]),
        idle_ms: to_ms(ticks[3] + ticks[4]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_LINE: &str = "4242 (my proc (x)) S 1 4242 4242 0 -1 4194304 1530 0 12 0 3 1 0 0 20 0 4 0 123456 2273280 411 18446744073709551615";

    const STATUS: &str = "Name:\thost_telemetry\n\
        Umask:\t0022\n\
        State:\tS (sleeping)\n\
        VmPeak:\t  123456 kB\n\
        VmHWM:\t    8192 kB\n\
        VmRSS:\t    7000 kB\n\
        RssAnon:\t    3000 kB\n\
        RssFile:\t    4000 kB\n\
        VmSwap:\t      24 kB\n\
        Threads:\t7\n\
        Cpus_allowed:\tff\n\
        Cpus_allowed_list:\t0-3,6\n";

    #[test]
    fn test_page_faults_with_spaces_in_comm() {
        assert_eq!(parse_page_faults(STAT_LINE).unwrap(), 1530 + 12);
    }

    #[test]
    fn test_page_faults_truncated_line() {
        assert!(parse_page_faults("1 (init) S 1 1").is_err());
        assert!(parse_page_faults("garbage").is_err());
    }

    #[test]
    fn test_status_memory() {
        let (peak, private) = parse_status_memory(STATUS).unwrap();
        assert_eq!(peak, 8192 * 1024);
        assert_eq!(private, (3000 + 24) * 1024);
    }

    #[test]
    fn test_status_memory_without_swap_line() {
        let status = "VmHWM:\t100 kB\nRssAnon:\t10 kB\n";
        assert_eq!(parse_status_memory(status).unwrap(), (100 * 1024, 10 * 1024));
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(parse_thread_count(STATUS).unwrap(), 7);
        assert!(parse_thread_count("Name:\tx\n").is_err());
    }

    #[test]
    fn test_cpu_list() {
        assert_eq!(parse_cpu_list("0-3,6").unwrap(), 5);
        assert_eq!(parse_cpu_list("0").unwrap(), 1);
        assert_eq!(parse_cpu_list("0-63\n").unwrap(), 64);
        assert!(parse_cpu_list("3-1").is_err());
        assert!(parse_cpu_list("a-b").is_err());
        assert_eq!(parse_allowed_cpus(STATUS).unwrap(), 5);
    }

    #[test]
    fn test_cpu_times() {
        let stat = "cpu  100 20 50 1000 30 5 5 0 0 0\ncpu0 50 10 25 500 15 2 3 0 0 0\nintr 1 2 3\n";
        let times = parse_cpu_times(stat, 100).unwrap();
        assert_eq!(times.user_ms, 1200);
        assert_eq!(times.system_ms, 500);
        assert_eq!(times.idle_ms, 10300);
    }

    #[test]
    fn test_cpu_times_rejects_bad_input() {
        assert!(parse_cpu_times("cpu0 1 2 3 4 5\n", 100).is_err());
        assert!(parse_cpu_times("cpu  1 2 3\n", 100).is_err());
        assert!(parse_cpu_times("cpu  1 2 3 4 5\n", 0).is_err());
    }
}
