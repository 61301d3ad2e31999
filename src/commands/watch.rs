use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;
use tokio::sync::broadcast::error::TryRecvError;

use crate::core::config::Config;
use crate::core::process_monitor::{
    format_memory_mb, MonitorRuntime, MonitoredProcessState, MonitoringEvent,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn execute(matches: &ArgMatches, mut config: Config) -> Result<()> {
    let pids: Vec<u32> = matches
        .get_many::<u32>("pids")
        .context("At least one PID is required")?
        .copied()
        .collect();

    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.sampling_interval_ms = interval;
    }
    let deadline = matches
        .get_one::<u64>("duration")
        .map(|&secs| Instant::now() + Duration::from_secs(secs));
    config.auto_refresh = false;

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();
    ctrlc::set_handler(move || {
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let (monitor, _updates) = MonitorRuntime::new(&config).context("Failed to start monitor")?;
    let mut events = monitor.subscribe_monitoring();

    let mut started = 0;
    for &pid in &pids {
        if monitor.start_monitoring(pid) {
            started += 1;
        } else {
            println!("{}", format!("Process {} not found, skipping", pid).yellow());
        }
    }

    if started == 0 {
        monitor.shutdown();
        anyhow::bail!("None of the given processes could be monitored");
    }

    println!(
        "{}",
        format!(
            "Monitoring {} process(es) every {}ms. Press Ctrl+C to stop.",
            started,
            config.sampling_interval().as_millis()
        )
        .cyan()
        .bold()
    );

    loop {
        loop {
            match events.try_recv() {
                Ok(MonitoringEvent::Updated(state)) => print_update(&state),
                Ok(MonitoringEvent::Stopped(state)) => {
                    println!("{}", format!("{} ended", state).dimmed());
                }
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        let any_active = pids.iter().any(|&pid| monitor.registry().is_monitored(pid));
        let timed_out = deadline.is_some_and(|d| Instant::now() >= d);
        if !any_active || timed_out || cancel_flag.load(Ordering::Relaxed) {
            break;
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    for &pid in &pids {
        monitor.registry().stop_monitoring(pid);
    }

    let states = monitor.registry().states();
    monitor.shutdown();

    print_summary(&states);
    Ok(())
}

fn print_update(state: &MonitoredProcessState) {
    println!(
        "{}  max {}  avg {}  samples {}  {}",
        format!("{:<32}", state.to_string()).cyan(),
        format!("{:>9}", format_memory_mb(state.max_memory_bytes)).yellow(),
        format!("{:>9}", format_memory_mb(state.average_memory_bytes)).yellow(),
        state.sample_count,
        state.duration_text.dimmed()
    );
}

fn print_summary(states: &[MonitoredProcessState]) {
    println!();
    println!("{}", "Summary".bold());
    println!("{}", "─".repeat(72).dimmed());

    for state in states {
        println!(
            "{:<32}  max {:>9}  avg {:>9}  samples {:>5}  {}",
            state.to_string(),
            format_memory_mb(state.max_memory_bytes),
            format_memory_mb(state.average_memory_bytes),
            state.sample_count,
            state.duration_text
        );
    }
}
