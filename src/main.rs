use std::fs::OpenOptions;

use anyhow::{Context, Result};
use log::{error, warn, LevelFilter};
use simplelog::{Config, WriteLogger};

use sysmetrics::format::{elapsed_time, percent};
use sysmetrics::procfs::reader::SystemMetricsReader;
use sysmetrics::procfs::Pid;

const PLACEHOLDER: &str = "-";

fn main() {
    setup_panic_logging();

    if let Err(e) = init_logging().and_then(|_| print_snapshot()) {
        error!("{:?}", e);
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

fn setup_panic_logging() {
    // As panics are erased by the application exiting, log the panic as an error
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        error!("Panic occured: {:?}", info);
        default_hook(info);
    }))
}

fn init_logging() -> Result<()> {
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("sysmetrics.log")
        .context("Could not open log file")?;

    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file).context("Could not initialize logging")
}

/// Renders a metric, or a placeholder if it could not be read
fn or_placeholder<T>(metric: std::result::Result<T, sysmetrics::procfs::ProcfsError>, name: &str) -> String
where
    T: ToString,
{
    match metric {
        Ok(value) => value.to_string(),
        Err(e) => {
            warn!("Could not read {}: {}", name, e);
            PLACEHOLDER.to_string()
        }
    }
}

fn print_snapshot() -> Result<()> {
    let reader = SystemMetricsReader::new().context("Could not create metrics reader")?;

    println!("OS:        {}", reader.operating_system());
    println!("Kernel:    {}", reader.kernel());
    println!(
        "Memory:    {}",
        reader
            .memory_utilization()
            .map(percent)
            .unwrap_or_else(|e| or_placeholder::<String>(Err(e), "memory utilization"))
    );
    println!("Uptime:    {}", elapsed_time(reader.uptime()));
    println!(
        "Jiffies:   {} total, {} active, {} idle",
        or_placeholder(reader.jiffies(), "jiffies"),
        or_placeholder(reader.active_jiffies(), "active jiffies"),
        or_placeholder(reader.idle_jiffies(), "idle jiffies")
    );
    println!(
        "Processes: {} total, {} running",
        or_placeholder(reader.total_processes(), "total processes"),
        or_placeholder(reader.running_processes(), "running processes")
    );
    println!();

    let mut pids: Vec<Pid> = reader.pids();
    pids.sort_unstable();

    println!("{:>8} {:<12} {:>8} {:>10} COMMAND", "PID", "USER", "RAM[MB]", "TIME+");
    for pid in pids {
        let command = reader.command(pid).replace('\0', " ");

        println!(
            "{:>8} {:<12} {:>8} {:>10} {}",
            pid,
            reader.user(pid),
            or_placeholder(reader.ram(pid), "process RAM"),
            reader
                .pid_uptime(pid)
                .map(elapsed_time)
                .unwrap_or_else(|e| or_placeholder::<String>(Err(e), "process uptime")),
            command.trim_end()
        );
    }

    Ok(())
}
