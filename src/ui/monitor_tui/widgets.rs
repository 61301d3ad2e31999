use ratatui::prelude::*;

use crate::core::process_monitor::bytes_to_mb;

/// Border style for a panel, highlighted when it has focus
pub fn panel_border(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

pub fn selected_row() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

pub fn header_cell() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Color for a working set size in bytes
pub fn memory_color(bytes: u64) -> Color {
    match bytes_to_mb(bytes) {
        mb if mb < 100 => Color::Cyan,
        mb if mb < 500 => Color::LightYellow,
        mb if mb < 2048 => Color::LightRed,
        _ => Color::Red,
    }
}
