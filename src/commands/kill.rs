use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::process_monitor::{ProcessSource, SysinfoSource};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let pid = *matches.get_one::<u32>("pid").context("PID is required")?;

    if SysinfoSource::new().terminate(pid) {
        println!("{}", format!("Process {} terminated", pid).green());
        Ok(())
    } else {
        anyhow::bail!("Could not terminate process {}", pid)
    }
}
