use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
};

use super::app::{MonitorApp, Panel};
use super::widgets::{header_cell, memory_color, panel_border, selected_row};
use crate::core::process_monitor::{format_duration, format_memory_mb};
use crate::ui::formatters::{format_clock, format_mb, format_size, format_time, truncate};

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &MonitorApp) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Body
            Constraint::Length(1), // Input line or status
            Constraint::Length(1), // Footer
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[1]);

    render_header(frame, chunks[0], app);
    render_process_table(frame, body[0], app);
    render_monitored_panel(frame, side[0], app);
    render_details_panel(frame, side[1], app);
    render_status_line(frame, chunks[2], app);
    render_footer(frame, chunks[3]);

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let auto = if app.monitor.is_auto_refreshing() {
        format!(
            "every {}ms",
            app.monitor.pipeline().refresh_interval().as_millis()
        )
    } else {
        "off".to_string()
    };

    let filter = app.filter.parse();
    let mut active = Vec::new();
    if let Some(text) = &filter.text {
        active.push(format!("text={}", text));
    }
    if let Some(prefix) = &filter.pid_prefix {
        active.push(format!("pid^={}", prefix));
    }
    if filter.min_threads.is_some() || filter.max_threads.is_some() {
        active.push(format!(
            "threads {}-{}",
            app.filter.min_threads, app.filter.max_threads
        ));
    }
    if filter.min_memory_mb.is_some() || filter.max_memory_mb.is_some() {
        active.push(format!(
            "mem {}-{} MB",
            app.filter.min_memory_mb, app.filter.max_memory_mb
        ));
    }
    let filter_str = if active.is_empty() {
        "none".to_string()
    } else {
        active.join(", ")
    };

    let title = format!(
        " procwatch │ {} processes │ Sort: {} │ Auto-refresh: {} │ Filter: {} ",
        app.list.len(),
        app.sort,
        auto,
        filter_str
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(block, area);
}

fn render_process_table(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let block = Block::default()
        .title(" Processes [m:monitor K:kill 1-6:priority] ")
        .borders(Borders::ALL)
        .border_style(panel_border(app.focus == Panel::Processes));

    let header = Row::new(vec![
        Cell::from("PID").style(header_cell()),
        Cell::from("Name").style(header_cell()),
        Cell::from("Threads").style(header_cell()),
        Cell::from("Memory").style(header_cell()),
        Cell::from("Prio").style(header_cell()),
        Cell::from("Started").style(header_cell()),
        Cell::from("Mon").style(header_cell()),
    ])
    .height(1);

    let rows: Vec<Row> = app
        .list
        .items()
        .iter()
        .map(|record| {
            let record = record.read();
            let marker = if record.monitored { "●" } else { "" };
            Row::new(vec![
                Cell::from(record.pid.to_string()),
                Cell::from(truncate(&record.name, 24)),
                Cell::from(record.thread_count.to_string()),
                Cell::from(format_mb(record.working_set_bytes))
                    .style(Style::default().fg(memory_color(record.working_set_bytes))),
                Cell::from(record.priority.to_string()),
                Cell::from(format_clock(record.start_time)),
                Cell::from(marker).style(Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(4),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(selected_row());

    let mut state = TableState::default().with_selected(app.list.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_monitored_panel(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let block = Block::default()
        .title(format!(" Monitored ({}) [x:remove] ", app.monitored.len()))
        .borders(Borders::ALL)
        .border_style(panel_border(app.focus == Panel::Monitored));

    if app.monitored.is_empty() {
        let hint = Paragraph::new("No monitored processes. Press m on a process to start.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Process").style(header_cell()),
        Cell::from("Max").style(header_cell()),
        Cell::from("Avg").style(header_cell()),
        Cell::from("Samples").style(header_cell()),
        Cell::from("Duration").style(header_cell()),
    ]);

    let now = Local::now();
    let rows: Vec<Row> = app
        .monitored
        .iter()
        .map(|state| {
            // Active sessions tick between samples; ended ones show their frozen text.
            let duration = if state.active {
                format_duration(state.elapsed(now))
            } else {
                state.duration_text.clone()
            };
            let style = if state.active {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Row::new(vec![
                Cell::from(truncate(&state.to_string(), 28)),
                Cell::from(format_memory_mb(state.max_memory_bytes)),
                Cell::from(format_memory_mb(state.average_memory_bytes)),
                Cell::from(state.sample_count.to_string()),
                Cell::from(duration),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(selected_row());

    let selected = (app.focus == Panel::Monitored).then_some(app.monitored_index);
    let mut state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_details_panel(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let block = Block::default().title(" Details ").borders(Borders::ALL);

    let Some(selected) = app.list.selected() else {
        let hint = Paragraph::new("Select a process to see its details.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let record = selected.read().clone();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Name:    ", header_cell()),
            Span::raw(record.name.clone()),
        ]),
        Line::from(vec![
            Span::styled("PID:     ", header_cell()),
            Span::raw(record.pid.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Path:    ", header_cell()),
            Span::raw(record.exe_display()),
        ]),
        Line::from(vec![
            Span::styled("Memory:  ", header_cell()),
            Span::raw(format_size(record.working_set_bytes)),
        ]),
        Line::from(vec![
            Span::styled("Started: ", header_cell()),
            Span::raw(format_time(record.start_time)),
        ]),
    ];

    if let Some(started) = record.monitoring_started {
        lines.push(Line::from(vec![
            Span::styled("Watched: ", header_cell()),
            Span::raw(format_time(Some(started))),
        ]));
    }

    match &app.details {
        Some((pid, details)) if *pid == record.pid => {
            lines.push(Line::from(""));
            lines.push(Line::styled(
                format!("Threads ({})", details.threads.len()),
                header_cell(),
            ));
            for thread in details.threads.iter().take(8) {
                lines.push(Line::from(format!(
                    "  {:>7}  {:<10} prio {}",
                    thread.id, thread.state, thread.priority
                )));
            }
            lines.push(Line::styled(
                format!("Modules ({})", details.modules.len()),
                header_cell(),
            ));
            for module in details.modules.iter().take(8) {
                lines.push(Line::from(format!(
                    "  {:<24} {}",
                    truncate(&module.name, 24),
                    format_size(module.memory_size)
                )));
            }
        }
        _ => {
            lines.push(Line::from(""));
            lines.push(Line::styled(
                "Loading threads and modules...",
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_line(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let para = match (&app.input, &app.status) {
        (Some(input), _) => Paragraph::new(format!(" {}: {}▏", input.field.label(), input.buffer))
            .style(Style::default().fg(Color::Yellow)),
        (None, Some(status)) => {
            Paragraph::new(format!(" {}", status)).style(Style::default().fg(Color::Green))
        }
        (None, None) => Paragraph::new(""),
    };
    frame.render_widget(para, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let help = " q: Quit │ ?: Help │ r: Refresh │ a: Auto │ s: Sort │ /: Filter │ Tab: Panel ";
    let para = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = r#"
    procwatch - Help

    Keyboard Shortcuts:
    ─────────────────────────────────────
    q / Esc     Quit the application
    ? / h       Toggle this help screen
    r / F5      Refresh the process list
    a           Toggle auto-refresh
    s           Cycle sort (Name/Memory/PID/Threads)
    Tab         Switch process list / monitored panel
    ↑↓ / k j    Move selection
    m / Enter   Start or stop monitoring
    x / Del     Remove a monitored process
    K           Terminate the selected process
    1-6         Priority: Idle .. RealTime
    /  p        Filter by text / PID prefix
    t  M        Filter threads / memory MB (min-max)
    c           Clear all filters

    Press any key to close this help
    "#;

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::DarkGray));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
