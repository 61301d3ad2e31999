// UI and formatting module

pub mod formatters;
pub mod monitor_tui;

pub use formatters::{format_clock, format_mb, format_size, format_time, truncate};
