use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Whole megabytes, truncated (never rounded).
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / BYTES_PER_MB
}

/// One entry of the process table as seen by the list pipeline.
///
/// Records are merged in place across refreshes, so the monitoring fields are
/// owned by the pipeline rather than the data source (which always leaves them
/// unset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub exe_path: Option<PathBuf>,
    pub thread_count: u32,
    pub working_set_bytes: u64,
    pub start_time: Option<DateTime<Local>>,
    pub priority: i32,
    pub monitored: bool,
    pub monitoring_started: Option<DateTime<Local>>,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            exe_path: None,
            thread_count: 0,
            working_set_bytes: 0,
            start_time: None,
            priority: 0,
            monitored: false,
            monitoring_started: None,
        }
    }

    pub fn working_set_mb(&self) -> u64 {
        bytes_to_mb(self.working_set_bytes)
    }

    pub fn exe_display(&self) -> String {
        self.exe_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Copy the OS-provided fields of a fresh poll into this record.
    pub(crate) fn update_from(&mut self, fresh: &ProcessRecord) {
        self.name.clone_from(&fresh.name);
        self.exe_path.clone_from(&fresh.exe_path);
        self.thread_count = fresh.thread_count;
        self.working_set_bytes = fresh.working_set_bytes;
        self.start_time = fresh.start_time;
        self.priority = fresh.priority;
    }
}

/// A single memory reading for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub memory_bytes: u64,
    pub sampled_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u32,
    pub state: String,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub memory_size: u64,
}

/// Threads and loaded modules of one process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub threads: Vec<ThreadInfo>,
    pub modules: Vec<ModuleInfo>,
}

/// Scheduling priority classes accepted by `ProcessSource::set_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityClass {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    RealTime,
}

impl PriorityClass {
    pub const ALL: [PriorityClass; 6] = [
        PriorityClass::Idle,
        PriorityClass::BelowNormal,
        PriorityClass::Normal,
        PriorityClass::AboveNormal,
        PriorityClass::High,
        PriorityClass::RealTime,
    ];

    /// Unix nice value used for this class.
    pub fn nice_value(self) -> i32 {
        match self {
            PriorityClass::Idle => 19,
            PriorityClass::BelowNormal => 10,
            PriorityClass::Normal => 0,
            PriorityClass::AboveNormal => -5,
            PriorityClass::High => -10,
            PriorityClass::RealTime => -20,
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriorityClass::Idle => "Idle",
            PriorityClass::BelowNormal => "BelowNormal",
            PriorityClass::Normal => "Normal",
            PriorityClass::AboveNormal => "AboveNormal",
            PriorityClass::High => "High",
            PriorityClass::RealTime => "RealTime",
        };
        f.write_str(name)
    }
}

impl FromStr for PriorityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "idle" => Ok(PriorityClass::Idle),
            "belownormal" => Ok(PriorityClass::BelowNormal),
            "normal" => Ok(PriorityClass::Normal),
            "abovenormal" => Ok(PriorityClass::AboveNormal),
            "high" => Ok(PriorityClass::High),
            "realtime" => Ok(PriorityClass::RealTime),
            _ => Err(format!("unknown priority class: {}", s)),
        }
    }
}
