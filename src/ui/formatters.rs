use chrono::{DateTime, Local};
use humansize::{format_size as human_format_size, BINARY};

use crate::core::process_monitor::bytes_to_mb;

/// Format a byte count in human-readable binary units (KiB, MiB, GiB)
pub fn format_size(bytes: u64) -> String {
    human_format_size(bytes, BINARY)
}

/// Whole megabytes, truncated, e.g. `"80 MB"`
pub fn format_mb(bytes: u64) -> String {
    format!("{} MB", bytes_to_mb(bytes))
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`, or `unknown`
pub fn format_time(time: Option<DateTime<Local>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format a timestamp as `HH:MM:SS`, or `-`
pub fn format_clock(time: Option<DateTime<Local>>) -> String {
    time.map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate to `width` characters, marking the cut with `…`
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}
