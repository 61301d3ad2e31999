use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::process_monitor::{PriorityClass, ProcessSource, SysinfoSource};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let pid = *matches.get_one::<u32>("pid").context("PID is required")?;
    let class_text = matches
        .get_one::<String>("class")
        .context("Priority class is required")?;

    // Unknown class names are a no-op.
    let Ok(class) = class_text.parse::<PriorityClass>() else {
        println!(
            "{}",
            format!("Unknown priority class '{}', nothing changed", class_text).yellow()
        );
        return Ok(());
    };

    if SysinfoSource::new().set_priority(pid, class) {
        println!("{}", format!("Priority of {} set to {}", pid, class).green());
        Ok(())
    } else {
        anyhow::bail!("Could not set priority of process {} to {}", pid, class)
    }
}
