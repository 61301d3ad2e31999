//! Terminal user interface for the process monitor.
//!
//! Shows the filtered process list, the monitored sessions and details of
//! the selected process using ratatui.

mod app;
mod event_handler;
mod render;
mod widgets;

pub use app::{run_monitor_app, MonitorApp, Panel};
pub use event_handler::{map_key, FilterField, MonitorEvent};
