// Command handlers module
pub mod details;
pub mod kill;
pub mod list;
pub mod priority;
pub mod tui;
pub mod watch;
