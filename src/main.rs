use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use procwatch::metrics::system::SystemSnapshot;
use procwatch::{
    Monitor, MonitorApp, MonitorConfig, ProcessSnapshot, SortKey, SortSpec, SysinfoSource,
};
use std::thread;

#[derive(Parser)]
#[command(name = "procwatch")]
#[command(about = "Samples process and system metrics and prints the busiest processes")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Number of refreshes to print before exiting, 0 runs until killed
    #[arg(short = 'n', long, default_value_t = 0)]
    iterations: u64,

    /// Print JSON documents instead of a table
    #[arg(long)]
    json: bool,

    /// Sort column: pid, name, cpu or memory
    #[arg(short, long)]
    sort: Option<SortKey>,

    /// Sort ascending instead of descending
    #[arg(long)]
    ascending: bool,

    /// Only show processes whose name or pid contains this text (`pid:<n>` for an exact pid)
    #[arg(short, long)]
    filter: Option<String>,

    /// Rows to print per refresh
    #[arg(long, default_value_t = 25)]
    rows: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => MonitorConfig::default(),
    };
    if let Some(key) = cli.sort {
        config.sort = SortSpec::new(key, !cli.ascending);
    } else if cli.ascending {
        config.sort.descending = false;
    }
    config.validate()?;

    let render_interval = config.render_interval();
    let app =
        MonitorApp::start(config, SysinfoSource::new()).context("starting sampling threads")?;
    let monitor = app.monitor();
    let query = cli.filter.as_deref().unwrap_or("");

    let mut printed = 0;
    while cli.iterations == 0 || printed < cli.iterations {
        thread::sleep(render_interval);
        if cli.json {
            print_json(&monitor, query, cli.rows)?;
        } else {
            print_table(&monitor, query, cli.rows);
        }
        printed += 1;
    }

    info!("shutting down after {printed} refreshes");
    app.shutdown();
    Ok(())
}

fn print_json(monitor: &Monitor, query: &str, rows: usize) -> Result<()> {
    let mut processes = monitor.search_processes(query);
    processes.truncate(rows);
    let document = serde_json::json!({
        "system": monitor.system_snapshot(),
        "processes": processes,
    });
    println!("{}", serde_json::to_string(&document)?);
    Ok(())
}

fn print_table(monitor: &Monitor, query: &str, rows: usize) {
    match monitor.system_snapshot() {
        Some(SystemSnapshot {
            cpu_percent,
            memory_percent,
            total_memory_mb,
            used_memory_mb,
            ..
        }) => println!(
            "CPU {cpu_percent:5.1}%  MEM {memory_percent:5.1}% ({used_memory_mb:.0}/{total_memory_mb:.0} MB)"
        ),
        None => println!("CPU   -    MEM   -"),
    }

    println!(
        "{:>8} {:<24} {:>7} {:>10} {:>6} {:>11} {:>11}",
        "PID", "NAME", "CPU%", "MEM MB", "MEM%", "READ KB/s", "WRITE KB/s"
    );
    for process in monitor.search_processes(query).iter().take(rows) {
        print_row(process);
    }
    println!();
}

fn print_row(p: &ProcessSnapshot) {
    let name: String = p.name.chars().take(24).collect();
    println!(
        "{:>8} {:<24} {:>7.1} {:>10.1} {:>6.1} {:>11.1} {:>11.1}",
        p.pid.as_u32(),
        name,
        p.cpu_percent,
        p.memory_mb,
        p.memory_percent,
        p.disk_read_rate,
        p.disk_write_rate
    );
}
