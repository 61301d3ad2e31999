use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::core::config::Config;
use crate::core::process_monitor::{
    FilterInputs, ListUpdate, MonitorRuntime, MonitoredProcessState, MonitoringEvent,
    ProcessDetails, PublishedList, SelectionChange, SortKey,
};

use super::event_handler::{map_key, FilterField, MonitorEvent};
use super::render::render_ui;

/// How often the UI redraws and drains updates.
const UI_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Processes,
    Monitored,
}

/// An in-progress edit of one filter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub field: FilterField,
    pub buffer: String,
}

/// Monitor application state
pub struct MonitorApp {
    pub monitor: MonitorRuntime,
    updates: mpsc::UnboundedReceiver<ListUpdate>,
    events: broadcast::Receiver<MonitoringEvent>,
    pub list: PublishedList,
    pub monitored: Vec<MonitoredProcessState>,
    pub monitored_index: usize,
    pub details: Option<(u32, ProcessDetails)>,
    pending_details: Option<(u32, JoinHandle<Option<ProcessDetails>>)>,
    pub focus: Panel,
    pub input: Option<InputLine>,
    pub filter: FilterInputs,
    pub sort: SortKey,
    pub status: Option<String>,
    pub should_quit: bool,
    pub show_help: bool,
}

impl MonitorApp {
    pub fn new(
        monitor: MonitorRuntime,
        updates: mpsc::UnboundedReceiver<ListUpdate>,
        config: &Config,
    ) -> Self {
        let events = monitor.subscribe_monitoring();
        Self {
            monitor,
            updates,
            events,
            list: PublishedList::new(),
            monitored: Vec::new(),
            monitored_index: 0,
            details: None,
            pending_details: None,
            focus: Panel::Processes,
            input: None,
            filter: config.filter.clone(),
            sort: config.sort,
            status: None,
            should_quit: false,
            show_help: false,
        }
    }

    /// Apply everything that arrived from background tasks since the last tick.
    pub fn pump(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            match self.list.apply(update) {
                SelectionChange::Cleared(pid) => {
                    log::debug!("Selected pid {} left the list", pid);
                    self.details = None;
                }
                SelectionChange::Reaffirmed(_) | SelectionChange::None => {}
            }
        }

        self.drain_monitoring_events();
        self.poll_details();
    }

    fn drain_monitoring_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(MonitoringEvent::Started(state))
                | Ok(MonitoringEvent::Updated(state))
                | Ok(MonitoringEvent::Stopped(state)) => self.upsert_monitored(state),
                Ok(MonitoringEvent::Removed(pid)) => {
                    self.monitored.retain(|s| s.pid != pid);
                }
                Err(TryRecvError::Lagged(_)) => {
                    self.monitored = self.monitor.registry().states();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        self.monitored_index = self
            .monitored_index
            .min(self.monitored.len().saturating_sub(1));
    }

    fn upsert_monitored(&mut self, state: MonitoredProcessState) {
        match self.monitored.iter_mut().find(|s| s.pid == state.pid) {
            Some(existing) => *existing = state,
            None => self.monitored.push(state),
        }
    }

    fn poll_details(&mut self) {
        let finished = self
            .pending_details
            .as_ref()
            .is_some_and(|(_, task)| task.is_finished());
        if !finished {
            return;
        }

        if let Some((pid, task)) = self.pending_details.take() {
            match self.monitor.handle().block_on(task) {
                Ok(Some(details)) if self.list.selected_pid() == Some(pid) => {
                    self.details = Some((pid, details));
                }
                Ok(_) => {}
                Err(e) => log::warn!("Details task for pid {} failed: {}", pid, e),
            }
        }
    }

    fn request_details(&mut self) {
        self.details = None;
        if let Some(pid) = self.list.selected_pid() {
            self.pending_details = Some((pid, self.monitor.request_details(pid)));
        }
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Quit => self.should_quit = true,
            MonitorEvent::ToggleHelp => self.show_help = !self.show_help,
            MonitorEvent::Refresh => {
                self.monitor.request_refresh();
            }
            MonitorEvent::ToggleAutoRefresh => {
                let enabled = !self.monitor.is_auto_refreshing();
                self.monitor.set_auto_refresh(enabled);
                self.status = Some(format!(
                    "Auto-refresh {}",
                    if enabled { "on" } else { "off" }
                ));
            }
            MonitorEvent::CycleSort => {
                self.sort = self.sort.next();
                self.monitor.set_sort(self.sort);
            }
            MonitorEvent::SwitchPanel => {
                self.focus = match self.focus {
                    Panel::Processes => Panel::Monitored,
                    Panel::Monitored => Panel::Processes,
                };
            }
            MonitorEvent::Up => self.move_selection(-1),
            MonitorEvent::Down => self.move_selection(1),
            MonitorEvent::ToggleMonitoring => self.toggle_monitoring(),
            MonitorEvent::RemoveMonitoring => self.remove_monitoring(),
            MonitorEvent::Terminate => {
                if let Some(pid) = self.list.selected_pid() {
                    let ok = self.monitor.terminate(pid);
                    self.status = Some(if ok {
                        format!("Terminated pid {}", pid)
                    } else {
                        format!("Could not terminate pid {}", pid)
                    });
                }
            }
            MonitorEvent::SetPriority(class) => {
                if let Some(pid) = self.list.selected_pid() {
                    let ok = self.monitor.set_priority(pid, class);
                    self.status = Some(if ok {
                        format!("Priority of pid {} set to {}", pid, class)
                    } else {
                        format!("Could not set priority of pid {}", pid)
                    });
                }
            }
            MonitorEvent::EditFilter(field) => {
                self.input = Some(InputLine {
                    field,
                    buffer: self.filter_text(field),
                });
            }
            MonitorEvent::ClearFilters => {
                self.filter = FilterInputs::default();
                self.monitor.set_filter(self.filter.clone());
            }
            MonitorEvent::InputChar(c) => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.push(c);
                }
            }
            MonitorEvent::InputBackspace => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.pop();
                }
            }
            MonitorEvent::InputSubmit => {
                if let Some(input) = self.input.take() {
                    apply_filter_input(&mut self.filter, input.field, &input.buffer);
                    self.monitor.set_filter(self.filter.clone());
                }
            }
            MonitorEvent::InputCancel => self.input = None,
            MonitorEvent::None => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Panel::Processes => {
                if self.list.is_empty() {
                    return;
                }
                let next = match self.list.selected_index() {
                    Some(current) => step(current, delta, self.list.len()),
                    None => 0,
                };
                if self.list.selected_index() != Some(next) {
                    self.list.select_index(next);
                    self.request_details();
                }
            }
            Panel::Monitored => {
                if !self.monitored.is_empty() {
                    self.monitored_index = step(self.monitored_index, delta, self.monitored.len());
                }
            }
        }
    }

    fn toggle_monitoring(&mut self) {
        let pid = match self.focus {
            Panel::Processes => self.list.selected_pid(),
            Panel::Monitored => self.monitored.get(self.monitored_index).map(|s| s.pid),
        };
        let Some(pid) = pid else {
            return;
        };

        let registry = self.monitor.registry();
        if registry.is_monitored(pid) {
            self.monitor.stop_monitoring(pid);
            self.status = Some(format!("Stopped monitoring pid {}", pid));
        } else if registry.contains(pid) {
            self.status = Some(format!("Pid {} already has a session; remove it with x", pid));
        } else if self.monitor.start_monitoring(pid) {
            self.status = Some(format!("Monitoring pid {}", pid));
        } else {
            self.status = Some(format!("Pid {} is no longer running", pid));
        }
    }

    fn remove_monitoring(&mut self) {
        let pid = match self.focus {
            Panel::Monitored => self.monitored.get(self.monitored_index).map(|s| s.pid),
            Panel::Processes => self.list.selected_pid(),
        };
        if let Some(pid) = pid {
            if self.monitor.remove_monitoring(pid) {
                self.status = Some(format!("Removed monitoring of pid {}", pid));
            }
        }
    }

    fn filter_text(&self, field: FilterField) -> String {
        match field {
            FilterField::Text => self.filter.text.clone(),
            FilterField::PidPrefix => self.filter.pid_prefix.clone(),
            FilterField::Threads => join_range(&self.filter.min_threads, &self.filter.max_threads),
            FilterField::Memory => join_range(&self.filter.min_memory_mb, &self.filter.max_memory_mb),
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

fn join_range(min: &str, max: &str) -> String {
    if min.is_empty() && max.is_empty() {
        String::new()
    } else {
        format!("{}-{}", min, max)
    }
}

/// Split `min-max` input. A single value sets only the minimum.
fn split_range(input: &str) -> (String, String) {
    match input.split_once('-') {
        Some((min, max)) => (min.trim().to_string(), max.trim().to_string()),
        None => (input.trim().to_string(), String::new()),
    }
}

pub(crate) fn apply_filter_input(filter: &mut FilterInputs, field: FilterField, input: &str) {
    match field {
        FilterField::Text => filter.text = input.to_string(),
        FilterField::PidPrefix => filter.pid_prefix = input.trim().to_string(),
        FilterField::Threads => (filter.min_threads, filter.max_threads) = split_range(input),
        FilterField::Memory => (filter.min_memory_mb, filter.max_memory_mb) = split_range(input),
    }
}

/// Run the monitor TUI application
pub fn run_monitor_app(config: Config) -> Result<()> {
    let (monitor, updates) = MonitorRuntime::new(&config).context("Failed to start monitor")?;
    let mut app = MonitorApp::new(monitor, updates, &config);
    app.monitor.request_refresh();

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    app.monitor.shutdown();
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut MonitorApp,
) -> Result<()> {
    loop {
        app.pump();
        terminal.draw(|frame| render_ui(frame, app))?;

        if event::poll(UI_TICK).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                if key.kind == KeyEventKind::Press {
                    if app.show_help {
                        app.show_help = false;
                        continue;
                    }
                    let monitor_event = map_key(key, app.input.is_some());
                    app.handle_event(monitor_event);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
