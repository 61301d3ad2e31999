use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

use crate::platform::{priority, procfs};

use super::filter::SortKey;
use super::model::{PriorityClass, ProcessDetails, ProcessRecord, ProcessSample, ThreadInfo};
use super::source::ProcessSource;

/// How long `terminate` waits for a killed process to disappear.
const TERMINATE_WAIT: Duration = Duration::from_secs(2);
const TERMINATE_POLL: Duration = Duration::from_millis(50);

/// `ProcessSource` backed by `sysinfo`, with procfs/libc for the pieces
/// sysinfo does not expose.
pub struct SysinfoSource {
    system: Mutex<System>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn listing_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing()
            .with_memory()
            .with_exe(UpdateKind::OnlyIfNotSet)
            .with_tasks()
    }

    fn sample_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_memory()
    }

    /// Refresh a single pid and report whether it is still alive.
    fn refresh_one(system: &mut System, pid: Pid, kind: ProcessRefreshKind) -> bool {
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
        system.process(pid).is_some_and(is_alive)
    }

    fn wait_for_exit(&self, pid: Pid, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let alive = {
                let mut system = self.system.lock();
                Self::refresh_one(&mut system, pid, ProcessRefreshKind::nothing())
            };
            if !alive {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(TERMINATE_POLL);
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn is_alive(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

fn start_time(process: &Process) -> Option<DateTime<Local>> {
    match process.start_time() {
        0 => None,
        secs => DateTime::from_timestamp(secs as i64, 0).map(|t| t.with_timezone(&Local)),
    }
}

fn to_record(process: &Process) -> ProcessRecord {
    let pid = process.pid().as_u32();
    let thread_count = procfs::thread_count(pid)
        .or_else(|| process.tasks().map(|tasks| tasks.len() as u32))
        .unwrap_or(0);

    ProcessRecord {
        pid,
        name: process.name().to_string_lossy().into_owned(),
        exe_path: process.exe().map(Path::to_path_buf),
        thread_count,
        working_set_bytes: process.memory(),
        start_time: start_time(process),
        priority: procfs::nice(pid).unwrap_or(0),
        monitored: false,
        monitoring_started: None,
    }
}

impl ProcessSource for SysinfoSource {
    fn list_processes(&self) -> Vec<ProcessRecord> {
        let mut records: Vec<ProcessRecord> = {
            let mut system = self.system.lock();
            system.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                Self::listing_refresh_kind(),
            );

            system
                .processes()
                .values()
                // Linux reports threads as processes too.
                .filter(|p| p.thread_kind().is_none() && is_alive(p))
                .map(to_record)
                .collect()
        };

        records.sort_by(|a, b| SortKey::Name.compare(a, b).then(a.pid.cmp(&b.pid)));
        log::trace!("Listed {} processes", records.len());
        records
    }

    fn snapshot(&self, pid: u32) -> Option<ProcessSample> {
        let sys_pid = Pid::from_u32(pid);
        let mut system = self.system.lock();
        if !Self::refresh_one(&mut system, sys_pid, Self::sample_refresh_kind()) {
            log::debug!("Snapshot: pid {} is gone", pid);
            return None;
        }

        let process = system.process(sys_pid)?;
        Some(ProcessSample {
            pid,
            name: process.name().to_string_lossy().into_owned(),
            memory_bytes: process.memory(),
            sampled_at: Local::now(),
        })
    }

    fn set_priority(&self, pid: u32, class: PriorityClass) -> bool {
        match priority::set_priority(pid, class) {
            Ok(()) => {
                log::info!("Priority of pid {} set to {}", pid, class);
                true
            }
            Err(e) => {
                log::debug!("Failed to set priority of pid {}: {}", pid, e);
                false
            }
        }
    }

    fn terminate(&self, pid: u32) -> bool {
        let sys_pid = Pid::from_u32(pid);
        let signalled = {
            let mut system = self.system.lock();
            Self::refresh_one(&mut system, sys_pid, ProcessRefreshKind::nothing())
                && system.process(sys_pid).is_some_and(Process::kill)
        };

        if !signalled {
            log::debug!("Failed to terminate pid {}", pid);
            return false;
        }

        if !self.wait_for_exit(sys_pid, TERMINATE_WAIT) {
            log::debug!("Pid {} still running after terminate", pid);
        }
        true
    }

    fn details_for(&self, pid: u32) -> Option<ProcessDetails> {
        let sys_pid = Pid::from_u32(pid);
        let task_ids: Vec<u32> = {
            let mut system = self.system.lock();
            let refresh_kind = ProcessRefreshKind::nothing().with_tasks();
            if !Self::refresh_one(&mut system, sys_pid, refresh_kind) {
                return None;
            }
            let process = system.process(sys_pid)?;
            process
                .tasks()
                .map(|tasks| tasks.iter().map(|t| t.as_u32()).collect())
                .unwrap_or_default()
        };

        let threads = procfs::threads(pid).unwrap_or_else(|| {
            let mut ids = task_ids;
            ids.sort_unstable();
            ids.into_iter()
                .map(|id| ThreadInfo {
                    id,
                    state: "Unknown".to_string(),
                    priority: 0,
                })
                .collect()
        });

        let modules = procfs::modules(pid).unwrap_or_default();

        Some(ProcessDetails { threads, modules })
    }
}
