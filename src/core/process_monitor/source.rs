use super::model::{PriorityClass, ProcessDetails, ProcessRecord, ProcessSample};

/// Access to the operating system's process table.
///
/// Implementations never fail as a whole: per-process failures are folded
/// into sentinels, omitted entries, `None`, or `false`.
pub trait ProcessSource: Send + Sync {
    /// Every process that could be read, in discovery order.
    fn list_processes(&self) -> Vec<ProcessRecord>;

    /// Current memory reading for `pid`, or `None` once the process is gone
    /// or no longer accessible.
    fn snapshot(&self, pid: u32) -> Option<ProcessSample>;

    fn set_priority(&self, pid: u32, class: PriorityClass) -> bool;

    fn terminate(&self, pid: u32) -> bool;

    /// Threads and modules of `pid`. Sections that cannot be read come back
    /// empty; `None` only when the process itself is gone.
    fn details_for(&self, pid: u32) -> Option<ProcessDetails>;
}
