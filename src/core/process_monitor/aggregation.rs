//! Running memory statistics for one monitored process.
//!
//! The fold is driven from the sampler's delivery callback, one sample at a
//! time, so it never needs to synchronize with itself.

use std::fmt;

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

use super::model::{bytes_to_mb, ProcessSample};

/// Aggregated state of one sampling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredProcessState {
    pub pid: u32,
    pub name: String,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    pub max_memory_bytes: u64,
    pub total_memory_bytes: u64,
    pub sample_count: u64,
    pub average_memory_bytes: u64,
    pub duration_text: String,
    pub active: bool,
}

impl MonitoredProcessState {
    pub fn new(pid: u32, name: impl Into<String>, now: DateTime<Local>) -> Self {
        Self {
            pid,
            name: name.into(),
            started_at: now,
            ended_at: None,
            max_memory_bytes: 0,
            total_memory_bytes: 0,
            sample_count: 0,
            average_memory_bytes: 0,
            duration_text: format_duration(TimeDelta::zero()),
            active: true,
        }
    }

    /// Fold one delivery from the sampler. `None` is the terminal delivery.
    pub fn record(&mut self, sample: Option<&ProcessSample>, now: DateTime<Local>) {
        match sample {
            Some(sample) => self.apply_sample(sample, now),
            None => {
                self.finish(now);
            }
        }
    }

    pub fn apply_sample(&mut self, sample: &ProcessSample, now: DateTime<Local>) {
        self.max_memory_bytes = self.max_memory_bytes.max(sample.memory_bytes);
        self.total_memory_bytes = self.total_memory_bytes.saturating_add(sample.memory_bytes);
        self.sample_count += 1;
        self.average_memory_bytes = self.total_memory_bytes / self.sample_count.max(1);
        self.duration_text = format_duration(self.elapsed(now));
    }

    /// Close the session. Returns `false` (and changes nothing) if it was
    /// already closed, so the first end time always wins.
    pub fn finish(&mut self, now: DateTime<Local>) -> bool {
        if !self.active {
            return false;
        }

        self.active = false;
        self.ended_at = Some(now);
        self.duration_text = format_duration(self.elapsed(now));
        true
    }

    /// Session length: frozen at the end time once closed, live otherwise.
    pub fn elapsed(&self, now: DateTime<Local>) -> TimeDelta {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    pub fn max_memory_mb(&self) -> u64 {
        bytes_to_mb(self.max_memory_bytes)
    }

    pub fn average_memory_mb(&self) -> u64 {
        bytes_to_mb(self.average_memory_bytes)
    }
}

impl fmt::Display for MonitoredProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID: {})", self.name, self.pid)
    }
}

/// `HH:MM:SS` of the time-of-day components. Whole days drop out, so the
/// hour field wraps at 24.
pub fn format_duration(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Whole megabytes for display, e.g. `"20 MB"`.
pub fn format_memory_mb(bytes: u64) -> String {
    format!("{} MB", bytes_to_mb(bytes))
}
