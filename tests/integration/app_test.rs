use std::time::{Duration, Instant};

use procwatch::core::config::Config;
use procwatch::core::process_monitor::{FilterInputs, MonitorRuntime, SortKey};
use procwatch::ui::monitor_tui::{FilterField, MonitorApp, MonitorEvent, Panel};

use super::support::{record, FakeSource};

fn app_with(fake: std::sync::Arc<FakeSource>, runtime: &tokio::runtime::Runtime) -> MonitorApp {
    let config = Config {
        sampling_interval_ms: 10,
        ..Default::default()
    };
    let (monitor, updates) = MonitorRuntime::with_source(fake, runtime.handle().clone(), &config);
    MonitorApp::new(monitor, updates, &config)
}

/// Pump the app until `done` holds and no refresh is in flight, or a few
/// seconds pass.
fn pump_until(app: &mut MonitorApp, mut done: impl FnMut(&MonitorApp) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        app.pump();
        if done(app) && !app.monitor.pipeline().is_refreshing() {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_refresh_and_selection_with_details() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fake = FakeSource::new(vec![record(1, "bash", 2, 5), record(2, "code", 4, 300)]);
    let mut app = app_with(fake.clone(), &runtime);

    app.handle_event(MonitorEvent::Refresh);
    pump_until(&mut app, |app| app.list.len() == 2);

    app.handle_event(MonitorEvent::Down);
    assert_eq!(app.list.selected_pid(), Some(1));
    pump_until(&mut app, |app| app.details.is_some());
    let (pid, details) = app.details.clone().unwrap();
    assert_eq!(pid, 1);
    assert_eq!(details.threads.len(), 2);

    fake.remove(1);
    app.handle_event(MonitorEvent::Refresh);
    pump_until(&mut app, |app| app.list.len() == 1);
    assert_eq!(app.list.selected_pid(), None);
    assert!(app.details.is_none());
}

#[test]
fn test_filter_input_applies_on_submit() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fake = FakeSource::new(vec![record(1, "bash", 2, 5), record(2, "code", 4, 300)]);
    let mut app = app_with(fake, &runtime);

    app.handle_event(MonitorEvent::EditFilter(FilterField::Memory));
    for c in "100-".chars() {
        app.handle_event(MonitorEvent::InputChar(c));
    }
    app.handle_event(MonitorEvent::InputSubmit);
    assert!(app.input.is_none());
    assert_eq!(app.filter.min_memory_mb, "100");

    pump_until(&mut app, |app| app.list.pids() == vec![2]);

    app.handle_event(MonitorEvent::ClearFilters);
    assert_eq!(app.filter, FilterInputs::default());
    pump_until(&mut app, |app| app.list.len() == 2);
}

#[test]
fn test_toggle_monitoring_updates_panel() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fake = FakeSource::new(vec![record(9, "worker", 1, 64)]);
    let mut app = app_with(fake, &runtime);

    app.handle_event(MonitorEvent::Refresh);
    pump_until(&mut app, |app| app.list.len() == 1);
    app.handle_event(MonitorEvent::Down);

    app.handle_event(MonitorEvent::ToggleMonitoring);
    pump_until(&mut app, |app| {
        app.monitored.first().is_some_and(|s| s.sample_count > 0)
    });
    assert!(app.monitor.registry().is_monitored(9));

    app.handle_event(MonitorEvent::ToggleMonitoring);
    pump_until(&mut app, |app| app.monitored.first().is_some_and(|s| !s.active));

    app.handle_event(MonitorEvent::SwitchPanel);
    assert_eq!(app.focus, Panel::Monitored);
    app.handle_event(MonitorEvent::RemoveMonitoring);
    pump_until(&mut app, |app| app.monitored.is_empty());
}

#[test]
fn test_sort_cycle_and_quit() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut app = app_with(FakeSource::new(Vec::new()), &runtime);

    app.handle_event(MonitorEvent::CycleSort);
    assert_eq!(app.sort, SortKey::Memory);
    assert_eq!(app.monitor.pipeline().sort(), SortKey::Memory);

    app.handle_event(MonitorEvent::ToggleHelp);
    assert!(app.show_help);

    app.handle_event(MonitorEvent::Quit);
    assert!(app.should_quit);
}
