//! Process monitoring core.
//!
//! Enumerates processes into a filtered, sorted list that is republished as
//! minimal diffs, and runs one sampling task per monitored process to keep
//! running memory statistics.

pub mod aggregation;
mod collector;
pub mod filter;
mod model;
pub mod pipeline;
pub mod published;
pub mod registry;
mod runtime;
pub mod scheduler;
mod source;

pub use aggregation::{format_duration, format_memory_mb, MonitoredProcessState};
pub use collector::SysinfoSource;
pub use filter::{FilterInputs, ProcessFilter, SortKey};
pub use model::{
    bytes_to_mb, ModuleInfo, PriorityClass, ProcessDetails, ProcessRecord, ProcessSample,
    ThreadInfo,
};
pub use pipeline::{AutoRefresh, RefreshOutcome, RefreshPipeline};
pub use published::{ListUpdate, PublishedList, SelectionChange, SharedRecord};
pub use registry::{MonitoringEvent, MonitoringMark, MonitoringRegistry};
pub use runtime::MonitorRuntime;
pub use scheduler::SamplingScheduler;
pub use source::ProcessSource;
