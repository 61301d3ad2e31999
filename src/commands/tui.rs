//! Interactive monitor command handler.

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::config::Config;
use crate::ui::monitor_tui::run_monitor_app;

pub fn execute(matches: Option<&ArgMatches>, mut config: Config) -> Result<()> {
    if let Some(matches) = matches {
        if let Some(&interval) = matches.get_one::<u64>("interval") {
            config.refresh_interval_ms = interval;
        }
        if matches.get_flag("auto-refresh") {
            config.auto_refresh = true;
        }
    }

    run_monitor_app(config).context("Failed to run process monitor")
}
