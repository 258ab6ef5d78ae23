//! Host Telemetry command line tool
//!
//! Prints one memory, CPU and disk snapshot, or the space on every volume.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use host_telemetry::{
    collect_all_disks, collect_cpu, collect_disk, collect_memory, Collected, CpuSnapshot,
    DiskSnapshot, MemorySnapshot, Sampler, SysinfoCounters, SystemProbe, TelemetryConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "host_telemetry")]
#[command(about = "Host memory, CPU and disk telemetry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Reads memory, CPU and disk statistics for this host and prints them")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Volume to report disk space for
    #[arg(long)]
    volume: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a single memory, CPU and disk snapshot (default)
    Snapshot(FormatArgs),

    /// Show space on every mounted volume
    Disks(FormatArgs),
}

#[derive(Args)]
struct FormatArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

/// Everything one snapshot run collects.
#[derive(Serialize)]
struct Report {
    memory: Collected<MemorySnapshot>,
    cpu: Collected<CpuSnapshot>,
    disk: Collected<DiskSnapshot>,
    volume: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let mut config = TelemetryConfig::from_env().context("invalid environment configuration")?;
    if let Some(volume) = &cli.volume {
        config = config.with_volume(volume).validated()?;
    }
    debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&config, args),
        Some(Commands::Disks(args)) => disks_command(args),
        None => snapshot_command(
            &config,
            &FormatArgs {
                format: "pretty".to_string(),
            },
        ),
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn check_format(format: &str) -> anyhow::Result<()> {
    match format {
        "json" | "pretty" => Ok(()),
        other => bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }
}

fn snapshot_command(config: &TelemetryConfig, args: &FormatArgs) -> anyhow::Result<()> {
    check_format(&args.format)?;

    let mut sampler = Sampler::with_counter_path(SysinfoCounters, config.counter_path.clone());
    sampler.initialize().context("failed to initialize CPU sampler")?;
    info!("CPU sampler initialized");

    // usage needs two collections at least this far apart
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

    let mut probe = SystemProbe::new();
    let report = Report {
        memory: collect_memory(&mut probe),
        cpu: collect_cpu(&mut probe, &mut sampler),
        disk: collect_disk(&mut probe, &config.default_volume),
        volume: config.default_volume.clone(),
    };
    sampler.shutdown();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_pretty_report(&report);
    }

    Ok(())
}

fn disks_command(args: &FormatArgs) -> anyhow::Result<()> {
    check_format(&args.format)?;

    let disks = collect_all_disks(&mut SystemProbe::new())?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&disks)?);
        return Ok(());
    }

    println!("Volumes:");
    for (mount_point, disk) in &disks {
        println!(
            "  {}: {:.1} GB total, {:.1} GB free, {:.1}% used",
            mount_point,
            gib(disk.total_space),
            gib(disk.free_space),
            disk.usage_percent()
        );
    }

    Ok(())
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0 / 1024.0
}

fn print_failures<S>(collected: &Collected<S>) {
    for failure in &collected.failures {
        println!("  ({} unavailable: {})", failure.group, failure.reason);
    }
}

fn print_pretty_report(report: &Report) {
    println!(
        "System Snapshot ({})",
        chrono::DateTime::from_timestamp_millis(report.memory.timestamp as i64)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!();

    let memory = &report.memory.snapshot;
    println!("Memory:");
    println!("  Total: {:.1} GB", gib(memory.total_physical));
    println!("  Available: {:.1} GB", gib(memory.available_physical));
    println!("  Load: {:.1}%", memory.memory_load);
    println!("  Page faults: {}", memory.page_fault_count);
    println!("  Peak working set: {:.1} MB", memory.peak_working_set as f64 / 1024.0 / 1024.0);
    println!("  Private bytes: {:.1} MB", memory.private_usage as f64 / 1024.0 / 1024.0);
    println!("  Handles: {}", memory.handle_count);
    print_failures(&report.memory);
    println!();

    let cpu = &report.cpu.snapshot;
    println!("CPU:");
    println!("  Usage: {:.1}%", cpu.cpu_usage);
    println!("  Logical cores: {}", cpu.core_count);
    println!("  Available to process: {}", cpu.available_processors);
    println!("  Threads: {}", cpu.thread_count);
    println!(
        "  Time (user/system/idle): {} / {} / {} ms",
        cpu.user_time, cpu.system_time, cpu.idle_time
    );
    print_failures(&report.cpu);
    println!();

    let disk = &report.disk.snapshot;
    println!("Disk ({}):", report.volume.display());
    println!("  Total: {:.1} GB", gib(disk.total_space));
    println!("  Used: {:.1} GB", gib(disk.used_space));
    println!("  Free: {:.1} GB", gib(disk.free_space));
    print_failures(&report.disk);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["host_telemetry", "--volume", "/data", "disks", "-f", "json"])
            .unwrap();
        assert_eq!(cli.volume, Some(PathBuf::from("/data")));
        match cli.command {
            Some(Commands::Disks(args)) => assert_eq!(args.format, "json"),
            _ => panic!("expected disks subcommand"),
        }
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["host_telemetry"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.volume.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(check_format("yaml").is_err());
        assert!(check_format("json").is_ok());
    }
}
