use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::process_monitor::PriorityClass;

/// Filter field being edited in the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Text,
    PidPrefix,
    /// `min-max` thread count
    Threads,
    /// `min-max` memory in MB
    Memory,
}

impl FilterField {
    pub fn label(self) -> &'static str {
        match self {
            FilterField::Text => "Filter",
            FilterField::PidPrefix => "PID prefix",
            FilterField::Threads => "Threads (min-max)",
            FilterField::Memory => "Memory MB (min-max)",
        }
    }
}

/// Events that can occur in the monitor TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Quit the application
    Quit,
    /// Toggle help overlay
    ToggleHelp,
    /// Refresh the process list now
    Refresh,
    ToggleAutoRefresh,
    /// Cycle the process sort key
    CycleSort,
    /// Switch focus between process list and monitored panel
    SwitchPanel,
    Up,
    Down,
    /// Start or stop monitoring the selected process
    ToggleMonitoring,
    /// Forget the selected monitored process
    RemoveMonitoring,
    Terminate,
    SetPriority(PriorityClass),
    EditFilter(FilterField),
    ClearFilters,
    // Input line editing
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    /// No action
    None,
}

/// Map a key press to an event. `editing` switches to input-line keys.
pub fn map_key(key: KeyEvent, editing: bool) -> MonitorEvent {
    if editing {
        return match key.code {
            KeyCode::Enter => MonitorEvent::InputSubmit,
            KeyCode::Esc => MonitorEvent::InputCancel,
            KeyCode::Backspace => MonitorEvent::InputBackspace,
            KeyCode::Char(c) => MonitorEvent::InputChar(c),
            _ => MonitorEvent::None,
        };
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return MonitorEvent::Quit;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => MonitorEvent::Quit,
        KeyCode::Char('?') | KeyCode::Char('h') => MonitorEvent::ToggleHelp,
        KeyCode::Char('r') | KeyCode::F(5) => MonitorEvent::Refresh,
        KeyCode::Char('a') => MonitorEvent::ToggleAutoRefresh,
        KeyCode::Char('s') => MonitorEvent::CycleSort,
        KeyCode::Tab | KeyCode::BackTab => MonitorEvent::SwitchPanel,
        KeyCode::Up | KeyCode::Char('k') => MonitorEvent::Up,
        KeyCode::Down | KeyCode::Char('j') => MonitorEvent::Down,
        KeyCode::Char('m') | KeyCode::Enter => MonitorEvent::ToggleMonitoring,
        KeyCode::Char('x') | KeyCode::Delete => MonitorEvent::RemoveMonitoring,
        KeyCode::Char('K') => MonitorEvent::Terminate,
        KeyCode::Char('/') => MonitorEvent::EditFilter(FilterField::Text),
        KeyCode::Char('p') => MonitorEvent::EditFilter(FilterField::PidPrefix),
        KeyCode::Char('t') => MonitorEvent::EditFilter(FilterField::Threads),
        KeyCode::Char('M') => MonitorEvent::EditFilter(FilterField::Memory),
        KeyCode::Char('c') => MonitorEvent::ClearFilters,
        KeyCode::Char(c @ '1'..='6') => {
            let index = (c as u8 - b'1') as usize;
            MonitorEvent::SetPriority(PriorityClass::ALL[index])
        }
        _ => MonitorEvent::None,
    }
}
