//! Linux `/proc` readers for process details sysinfo does not expose.
//!
//! Every reader returns `None` when the data cannot be read (including on
//! other platforms), so callers fall back to sentinels.

#![cfg_attr(not(target_os = "linux"), allow(dead_code, unused_variables))]

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::process_monitor::{ModuleInfo, ThreadInfo};

/// Fields of `/proc/<pid>/stat` after the `(comm)` field.
/// Index 0 is the state (field 3 in proc(5)).
const STAT_STATE: usize = 0;
const STAT_NICE: usize = 16;

/// Thread count from `/proc/<pid>/status`.
pub fn thread_count(pid: u32) -> Option<u32> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
        parse_status_threads(&status)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Nice value from `/proc/<pid>/stat`.
pub fn nice(pid: u32) -> Option<i32> {
    #[cfg(target_os = "linux")]
    {
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        stat_fields(&stat)?.get(STAT_NICE)?.parse().ok()
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Every thread listed under `/proc/<pid>/task`, ordered by id. Threads that
/// exit while being read are skipped.
pub fn threads(pid: u32) -> Option<Vec<ThreadInfo>> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir(format!("/proc/{}/task", pid)).ok()?;

        let mut threads: Vec<ThreadInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter_map(|tid| {
                let stat = std::fs::read_to_string(format!("/proc/{}/task/{}/stat", pid, tid)).ok()?;
                parse_thread_stat(tid, &stat)
            })
            .collect();

        threads.sort_by_key(|t| t.id);
        Some(threads)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// File-backed mappings from `/proc/<pid>/maps`, one entry per file.
pub fn modules(pid: u32) -> Option<Vec<ModuleInfo>> {
    #[cfg(target_os = "linux")]
    {
        let maps = std::fs::read_to_string(format!("/proc/{}/maps", pid)).ok()?;
        Some(parse_maps(&maps))
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn parse_status_threads(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Split a stat line after the command name, which may itself contain
/// spaces and parentheses.
fn stat_fields(stat: &str) -> Option<Vec<&str>> {
    let close = stat.rfind(')')?;
    Some(stat[close + 1..].split_whitespace().collect())
}

fn parse_thread_stat(tid: u32, stat: &str) -> Option<ThreadInfo> {
    let fields = stat_fields(stat)?;
    let state = fields.get(STAT_STATE)?;
    let priority = fields.get(STAT_NICE).and_then(|n| n.parse().ok()).unwrap_or(0);

    Some(ThreadInfo {
        id: tid,
        state: thread_state_name(state).to_string(),
        priority,
    })
}

fn thread_state_name(code: &str) -> &'static str {
    match code {
        "R" => "Running",
        "S" => "Sleeping",
        "D" => "Waiting",
        "Z" => "Zombie",
        "T" => "Stopped",
        "t" => "Tracing",
        "X" | "x" => "Dead",
        "I" => "Idle",
        "W" => "Paging",
        "P" => "Parked",
        _ => "Unknown",
    }
}

fn parse_maps(maps: &str) -> Vec<ModuleInfo> {
    let mut order: Vec<PathBuf> = Vec::new();
    let mut sizes: HashMap<PathBuf, u64> = HashMap::new();

    for line in maps.lines() {
        let mut parts = line.splitn(6, char::is_whitespace);
        let Some(range) = parts.next() else {
            continue;
        };
        // perms, offset, dev, inode
        let Some(path) = parts.nth(4).map(str::trim) else {
            continue;
        };
        if !path.starts_with('/') {
            continue;
        }

        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16)) else {
            continue;
        };

        let path = PathBuf::from(path);
        let size = sizes.entry(path.clone()).or_insert_with(|| {
            order.push(path);
            0
        });
        *size += end.saturating_sub(start);
    }

    order
        .into_iter()
        .map(|path| ModuleInfo {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            memory_size: sizes.get(&path).copied().unwrap_or(0),
            path,
        })
        .collect()
}
