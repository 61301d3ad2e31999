//! Filter predicates and sort orders for the process list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::ProcessRecord;

/// Raw filter text as typed by the user. Bounds that do not parse are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterInputs {
    pub text: String,
    pub pid_prefix: String,
    pub min_threads: String,
    pub max_threads: String,
    pub min_memory_mb: String,
    pub max_memory_mb: String,
}

impl FilterInputs {
    pub fn parse(&self) -> ProcessFilter {
        ProcessFilter {
            text: (!self.text.is_empty()).then(|| self.text.clone()),
            pid_prefix: non_empty(&self.pid_prefix),
            min_threads: parse_bound(&self.min_threads),
            max_threads: parse_bound(&self.max_threads),
            min_memory_mb: parse_bound(&self.min_memory_mb),
            max_memory_mb: parse_bound(&self.max_memory_mb),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parse() == ProcessFilter::default()
    }
}

/// Trimmed, or `None` if nothing but whitespace.
fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bound<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Parsed filter criteria. Every criterion is optional and they combine
/// conjunctively; numeric bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilter {
    /// Substring of the name (case-insensitive), or of the pid, thread count
    /// or memory-in-MB written as decimal.
    pub text: Option<String>,
    pub pid_prefix: Option<String>,
    pub min_threads: Option<u32>,
    pub max_threads: Option<u32>,
    pub min_memory_mb: Option<u64>,
    pub max_memory_mb: Option<u64>,
}

impl ProcessFilter {
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        let memory_mb = record.working_set_mb();

        self.matches_text(record, memory_mb)
            && self
                .pid_prefix
                .as_deref()
                .is_none_or(|prefix| record.pid.to_string().starts_with(prefix))
            && self.min_threads.is_none_or(|min| record.thread_count >= min)
            && self.max_threads.is_none_or(|max| record.thread_count <= max)
            && self.min_memory_mb.is_none_or(|min| memory_mb >= min)
            && self.max_memory_mb.is_none_or(|max| memory_mb <= max)
    }

    fn matches_text(&self, record: &ProcessRecord, memory_mb: u64) -> bool {
        let Some(text) = self.text.as_deref() else {
            return true;
        };

        record.name.to_lowercase().contains(&text.to_lowercase())
            || record.pid.to_string().contains(text)
            || record.thread_count.to_string().contains(text)
            || memory_mb.to_string().contains(text)
    }
}

/// Sort orders offered by the process list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Name ascending, case-insensitive.
    #[default]
    Name,
    /// Working set descending.
    Memory,
    /// Pid ascending.
    Pid,
    /// Thread count descending.
    Threads,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [SortKey::Name, SortKey::Memory, SortKey::Pid, SortKey::Threads];

    pub fn compare(self, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
        match self {
            SortKey::Name => a
                .name
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.name.chars().flat_map(char::to_lowercase)),
            SortKey::Memory => b.working_set_bytes.cmp(&a.working_set_bytes),
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::Threads => b.thread_count.cmp(&a.thread_count),
        }
    }

    /// Next key in display order, wrapping around.
    pub fn next(self) -> SortKey {
        match self {
            SortKey::Name => SortKey::Memory,
            SortKey::Memory => SortKey::Pid,
            SortKey::Pid => SortKey::Threads,
            SortKey::Threads => SortKey::Name,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Name => "Name",
            SortKey::Memory => "Memory",
            SortKey::Pid => "PID",
            SortKey::Threads => "Threads",
        };
        f.write_str(label)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "memory" | "mem" => Ok(SortKey::Memory),
            "pid" => Ok(SortKey::Pid),
            "threads" => Ok(SortKey::Threads),
            other => Err(format!(
                "unknown sort key '{}' (expected name, memory, pid or threads)",
                other
            )),
        }
    }
}
