//! In-memory process table shared by the integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use procwatch::core::process_monitor::{
    PriorityClass, ProcessDetails, ProcessRecord, ProcessSample, ProcessSource, ThreadInfo,
};

pub const MB: u64 = 1024 * 1024;

pub fn record(pid: u32, name: &str, threads: u32, memory_mb: u64) -> ProcessRecord {
    ProcessRecord {
        thread_count: threads,
        working_set_bytes: memory_mb * MB,
        ..ProcessRecord::new(pid, name)
    }
}

/// A fake process table. Pids with a memory script answer snapshots from the
/// script only and count as gone once it runs out; other pids answer from
/// the table.
#[derive(Default)]
pub struct FakeSource {
    table: Mutex<Vec<ProcessRecord>>,
    scripts: Mutex<HashMap<u32, Vec<u64>>>,
}

impl FakeSource {
    pub fn new(records: Vec<ProcessRecord>) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(records),
            scripts: Mutex::new(HashMap::new()),
        })
    }

    pub fn script(&self, pid: u32, readings_mb: &[u64]) {
        let readings = readings_mb.iter().rev().map(|mb| mb * MB).collect();
        self.scripts.lock().insert(pid, readings);
    }

    pub fn set_records(&self, records: Vec<ProcessRecord>) {
        *self.table.lock() = records;
    }

    pub fn update(&self, pid: u32, f: impl FnOnce(&mut ProcessRecord)) {
        if let Some(record) = self.table.lock().iter_mut().find(|r| r.pid == pid) {
            f(record);
        }
    }

    pub fn remove(&self, pid: u32) {
        self.table.lock().retain(|r| r.pid != pid);
    }

    pub fn priority_of(&self, pid: u32) -> Option<i32> {
        self.table
            .lock()
            .iter()
            .find(|r| r.pid == pid)
            .map(|r| r.priority)
    }
}

impl ProcessSource for FakeSource {
    fn list_processes(&self) -> Vec<ProcessRecord> {
        self.table.lock().clone()
    }

    fn snapshot(&self, pid: u32) -> Option<ProcessSample> {
        if let Some(script) = self.scripts.lock().get_mut(&pid) {
            let memory_bytes = script.pop()?;
            return Some(ProcessSample {
                pid,
                name: format!("scripted-{}", pid),
                memory_bytes,
                sampled_at: Local::now(),
            });
        }

        let table = self.table.lock();
        let record = table.iter().find(|r| r.pid == pid)?;
        Some(ProcessSample {
            pid,
            name: record.name.clone(),
            memory_bytes: record.working_set_bytes,
            sampled_at: Local::now(),
        })
    }

    fn set_priority(&self, pid: u32, class: PriorityClass) -> bool {
        let mut table = self.table.lock();
        match table.iter_mut().find(|r| r.pid == pid) {
            Some(record) => {
                record.priority = class.nice_value();
                true
            }
            None => false,
        }
    }

    fn terminate(&self, pid: u32) -> bool {
        let mut table = self.table.lock();
        let before = table.len();
        table.retain(|r| r.pid != pid);
        table.len() != before
    }

    fn details_for(&self, pid: u32) -> Option<ProcessDetails> {
        let table = self.table.lock();
        let record = table.iter().find(|r| r.pid == pid)?;
        Some(ProcessDetails {
            threads: (0..record.thread_count)
                .map(|i| ThreadInfo {
                    id: pid * 100 + i,
                    state: "Sleeping".to_string(),
                    priority: record.priority,
                })
                .collect(),
            modules: Vec::new(),
        })
    }
}
