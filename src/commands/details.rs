use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::process_monitor::{ProcessSource, SysinfoSource};
use crate::ui::formatters::format_size;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let pid = *matches.get_one::<u32>("pid").context("PID is required")?;

    let source = SysinfoSource::new();
    let details = source
        .details_for(pid)
        .with_context(|| format!("Process {} not found", pid))?;

    println!("{}", format!("Threads ({})", details.threads.len()).bold());
    for thread in &details.threads {
        println!(
            "  {}  {:<12}  priority {}",
            format!("{:>8}", thread.id).cyan(),
            thread.state,
            thread.priority
        );
    }

    println!();
    println!("{}", format!("Modules ({})", details.modules.len()).bold());
    for module in &details.modules {
        println!(
            "  {:<32}  {}  {}",
            module.name,
            format!("{:>10}", format_size(module.memory_size)).yellow(),
            module.path.display().to_string().dimmed()
        );
    }

    Ok(())
}
