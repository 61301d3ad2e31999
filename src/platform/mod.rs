// Platform-specific code module

pub mod priority;
pub mod procfs;

pub use priority::set_priority;
