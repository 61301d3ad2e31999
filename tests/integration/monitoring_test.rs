use std::time::Duration;

use procwatch::core::config::Config;
use procwatch::core::process_monitor::{
    FilterInputs, MonitorRuntime, MonitoredProcessState, MonitoringEvent, PriorityClass,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::timeout;

use super::support::{record, FakeSource, MB};

fn fast_config() -> Config {
    Config {
        sampling_interval_ms: 10,
        refresh_interval_ms: 10,
        ..Default::default()
    }
}

async fn wait_for<F>(rx: &mut broadcast::Receiver<MonitoringEvent>, mut pick: F) -> MonitoredProcessState
where
    F: FnMut(MonitoringEvent) -> Option<MonitoredProcessState>,
{
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(event) = rx.recv().await {
                if let Some(state) = pick(event) {
                    return state;
                }
            }
        }
    })
    .await
    .expect("expected monitoring event")
}

fn stopped(event: MonitoringEvent) -> Option<MonitoredProcessState> {
    match event {
        MonitoringEvent::Stopped(state) => Some(state),
        _ => None,
    }
}

#[tokio::test]
async fn test_session_aggregates_until_process_exits() {
    let fake = FakeSource::new(vec![record(100, "alpha", 3, 10)]);
    fake.script(100, &[10, 30, 20]);
    let (monitor, _updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());
    let mut events = monitor.subscribe_monitoring();

    monitor.refresh_now().unwrap();
    assert!(monitor.start_monitoring(100));

    let state = wait_for(&mut events, stopped).await;
    assert_eq!(state.to_string(), "alpha (PID: 100)");
    assert_eq!(state.max_memory_bytes, 30 * MB);
    assert_eq!(state.average_memory_bytes, 20 * MB);
    assert_eq!(state.sample_count, 3);
    assert!(!state.active);
    assert!(state.ended_at.is_some());

    let registry = monitor.registry();
    assert!(registry.contains(100));
    assert!(!registry.is_monitored(100));
    assert_eq!(registry.get(100).unwrap(), state);
}

#[tokio::test]
async fn test_stop_keeps_statistics_and_blocks_restart_until_removed() {
    let fake = FakeSource::new(vec![record(7, "daemon", 2, 42)]);
    let (monitor, _updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());
    let mut events = monitor.subscribe_monitoring();

    assert!(monitor.start_monitoring(7));
    assert!(!monitor.start_monitoring(7));

    let updated = wait_for(&mut events, |event| match event {
        MonitoringEvent::Updated(state) => Some(state),
        _ => None,
    })
    .await;
    assert_eq!(updated.max_memory_bytes, 42 * MB);
    assert!(updated.active);

    monitor.stop_monitoring(7);
    let state = wait_for(&mut events, stopped).await;
    assert!(!state.active);
    assert!(state.sample_count >= 1);

    // Stopping again is silent.
    monitor.stop_monitoring(7);
    assert!(!monitor.start_monitoring(7));

    assert!(monitor.remove_monitoring(7));
    assert!(!monitor.remove_monitoring(7));
    assert!(!monitor.registry().contains(7));

    assert!(monitor.start_monitoring(7));
    assert!(monitor.registry().is_monitored(7));
    monitor.stop_monitoring(7);
}

#[tokio::test]
async fn test_start_monitoring_unknown_pid_fails() {
    let fake = FakeSource::new(Vec::new());
    let (monitor, _updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());

    assert!(!monitor.start_monitoring(4242));
    assert!(monitor.registry().is_empty());
}

#[tokio::test]
async fn test_sampling_interval_applies_to_new_sessions() {
    let fake = FakeSource::new(vec![record(1, "a", 1, 1)]);
    let (monitor, _updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());

    assert_eq!(monitor.registry().sampling_interval(), Duration::from_millis(10));
    monitor.set_sampling_interval(Duration::from_millis(250));
    assert_eq!(monitor.registry().sampling_interval(), Duration::from_millis(250));
}

#[tokio::test]
async fn test_set_priority_and_terminate() {
    let fake = FakeSource::new(vec![record(5, "victim", 1, 1), record(6, "other", 1, 1)]);
    let (monitor, mut updates) =
        MonitorRuntime::with_source(fake.clone(), Handle::current(), &fast_config());

    assert!(monitor.set_priority(5, PriorityClass::High));
    assert_eq!(fake.priority_of(5), Some(-10));
    assert!(!monitor.set_priority(99, PriorityClass::Idle));

    monitor.refresh_now().unwrap();
    updates.try_recv().unwrap();

    assert!(monitor.terminate(5));
    let update = timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.removed, vec![5]);
    assert!(!monitor.terminate(5));
}

#[tokio::test]
async fn test_details_on_blocking_pool() {
    let fake = FakeSource::new(vec![record(11, "threads", 3, 1)]);
    let (monitor, _updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());

    let details = monitor.request_details(11).await.unwrap().unwrap();
    assert_eq!(details.threads.len(), 3);
    assert!(monitor.details(12).is_none());
}

#[tokio::test]
async fn test_filter_change_triggers_refresh() {
    let fake = FakeSource::new(vec![record(1, "bash", 1, 5), record(2, "code", 30, 300)]);
    let (monitor, mut updates) = MonitorRuntime::with_source(fake, Handle::current(), &fast_config());

    monitor.refresh_now().unwrap();
    updates.try_recv().unwrap();

    monitor.set_filter(FilterInputs {
        text: "code".to_string(),
        ..Default::default()
    });
    let update = timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.removed, vec![1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disabled_auto_refresh_stops_publishing() {
    let fake = FakeSource::new(vec![record(1, "a", 1, 1)]);
    let config = Config {
        auto_refresh: true,
        ..fast_config()
    };
    let (monitor, mut updates) =
        MonitorRuntime::with_source(fake.clone(), Handle::current(), &config);
    assert!(monitor.is_auto_refreshing());

    let first = timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.added_pids(), vec![1]);

    monitor.set_auto_refresh(false);
    assert!(!monitor.is_auto_refreshing());
    monitor.set_auto_refresh(false);
    assert!(!monitor.is_auto_refreshing());

    // A cycle that was already running sees an unchanged table and stays quiet.
    tokio::time::sleep(Duration::from_millis(30)).await;
    fake.set_records(vec![record(1, "a", 1, 1), record(2, "b", 1, 1)]);
    assert!(timeout(Duration::from_millis(200), updates.recv())
        .await
        .is_err());

    monitor.refresh_now().unwrap();
    let manual = updates.try_recv().unwrap();
    assert_eq!(manual.added_pids(), vec![2]);
}
