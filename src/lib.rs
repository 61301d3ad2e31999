// procwatch library - public API

// Re-export error types
pub mod error;
pub use error::{ProcwatchError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::config::Config;
pub use core::process_monitor::{MonitorRuntime, ProcessSource};

// Initialize logging. Defaults to warnings so the TUI stays clean;
// RUST_LOG overrides.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
