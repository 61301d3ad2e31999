use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::Config;
use crate::core::process_monitor::{MonitorRuntime, ProcessRecord, SortKey};
use crate::ui::formatters::{format_clock, format_mb, truncate};

/// Apply the list filter flags on top of the configured filter.
pub fn apply_filter_args(matches: &ArgMatches, config: &mut Config) -> Result<()> {
    let filter = &mut config.filter;
    let flags = [
        ("filter", &mut filter.text),
        ("pid", &mut filter.pid_prefix),
        ("min-threads", &mut filter.min_threads),
        ("max-threads", &mut filter.max_threads),
        ("min-mem", &mut filter.min_memory_mb),
        ("max-mem", &mut filter.max_memory_mb),
    ];
    for (id, field) in flags {
        if let Some(value) = matches.get_one::<String>(id) {
            *field = value.clone();
        }
    }

    if let Some(sort) = matches.get_one::<String>("sort") {
        config.sort = sort
            .parse::<SortKey>()
            .map_err(anyhow::Error::msg)?;
    }
    Ok(())
}

pub fn execute(matches: &ArgMatches, mut config: Config) -> Result<()> {
    apply_filter_args(matches, &mut config)?;
    config.auto_refresh = false;

    let (monitor, _updates) = MonitorRuntime::new(&config).context("Failed to start monitor")?;
    let outcome = monitor
        .refresh_now()
        .context("A refresh was already in progress")?;

    let records: Vec<ProcessRecord> = outcome.view.iter().map(|r| r.read().clone()).collect();
    monitor.shutdown();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    print_table(&records, config.sort);
    Ok(())
}

fn print_table(records: &[ProcessRecord], sort: SortKey) {
    println!(
        "{}",
        format!(
            "{:>8}  {:<28}  {:>7}  {:>9}  {:>4}  {:>8}",
            "PID", "NAME", "THREADS", "MEMORY", "PRIO", "STARTED"
        )
        .bold()
    );

    for record in records {
        println!(
            "{}  {:<28}  {:>7}  {}  {:>4}  {}",
            format!("{:>8}", record.pid).cyan(),
            truncate(&record.name, 28),
            record.thread_count,
            format!("{:>9}", format_mb(record.working_set_bytes)).yellow(),
            record.priority,
            format!("{:>8}", format_clock(record.start_time)).dimmed()
        );
    }

    println!();
    println!(
        "{}",
        format!("{} processes, sorted by {}", records.len(), sort).dimmed()
    );
}
