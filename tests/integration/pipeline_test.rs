use std::sync::{Arc, Barrier};
use std::time::Duration;

use procwatch::core::process_monitor::{
    FilterInputs, ListUpdate, MonitoringRegistry, PriorityClass, ProcessDetails, ProcessRecord,
    ProcessSample, ProcessSource, PublishedList, RefreshPipeline, SamplingScheduler,
    SelectionChange, SortKey,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::support::{record, FakeSource, MB};

fn build(
    source: Arc<dyn ProcessSource>,
    handle: Handle,
) -> (
    RefreshPipeline,
    Arc<MonitoringRegistry>,
    mpsc::UnboundedReceiver<ListUpdate>,
) {
    let scheduler = SamplingScheduler::new(Arc::clone(&source), handle);
    let registry = Arc::new(MonitoringRegistry::new(scheduler, Duration::from_millis(10)));
    let (pipeline, updates) = RefreshPipeline::new(source, Arc::clone(&registry));
    (pipeline, registry, updates)
}

fn sample_table() -> Vec<ProcessRecord> {
    vec![
        record(3, "code", 40, 300),
        record(1, "bash", 1, 5),
        record(2, "Alacritty", 12, 60),
    ]
}

#[tokio::test]
async fn test_first_refresh_publishes_sorted_view() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake, Handle::current());

    let outcome = pipeline.refresh().unwrap();
    assert_eq!(outcome.view_pids(), vec![2, 1, 3]);
    assert!(outcome.update.removed.is_empty());
    assert_eq!(outcome.update.added_pids(), vec![2, 1, 3]);

    let sent = updates.try_recv().unwrap();
    assert_eq!(sent.added_pids(), vec![2, 1, 3]);
    assert_eq!(pipeline.published_pids(), vec![2, 1, 3]);
}

#[tokio::test]
async fn test_unchanged_refresh_publishes_nothing() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake, Handle::current());

    pipeline.refresh().unwrap();
    updates.try_recv().unwrap();

    let outcome = pipeline.refresh().unwrap();
    assert!(outcome.update.is_empty());
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn test_exited_process_leaves_cache_and_clears_selection() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake.clone(), Handle::current());
    let mut list = PublishedList::new();

    pipeline.refresh().unwrap();
    list.apply(updates.try_recv().unwrap());
    assert!(list.select(1));

    fake.remove(1);
    pipeline.refresh().unwrap();
    let update = updates.try_recv().unwrap();
    assert_eq!(update.removed, vec![1]);
    assert!(update.added.is_empty());

    assert_eq!(list.apply(update), SelectionChange::Cleared(1));
    assert_eq!(list.selected_pid(), None);
    assert_eq!(list.pids(), vec![2, 3]);
    assert_eq!(pipeline.cache_len(), 2);
    assert!(pipeline.cached(1).is_none());
}

#[tokio::test]
async fn test_selection_survives_unrelated_changes() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake.clone(), Handle::current());
    let mut list = PublishedList::new();

    pipeline.refresh().unwrap();
    list.apply(updates.try_recv().unwrap());
    list.select(3);

    fake.remove(2);
    pipeline.refresh().unwrap();
    assert_eq!(
        list.apply(updates.try_recv().unwrap()),
        SelectionChange::Reaffirmed(3)
    );
    assert_eq!(list.selected_pid(), Some(3));
    assert_eq!(list.selected_index(), Some(1));
}

#[tokio::test]
async fn test_records_are_updated_in_place() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake.clone(), Handle::current());
    let mut list = PublishedList::new();

    pipeline.refresh().unwrap();
    list.apply(updates.try_recv().unwrap());
    let before = pipeline.cached(3).unwrap();

    fake.update(3, |r| {
        r.working_set_bytes = 320 * MB;
        r.thread_count = 41;
    });
    let outcome = pipeline.refresh().unwrap();
    assert!(outcome.update.is_empty());

    let after = pipeline.cached(3).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.read().working_set_mb(), 320);

    let shown = &list.items()[list.position(3).unwrap()];
    assert!(Arc::ptr_eq(shown, &after));
    assert_eq!(shown.read().thread_count, 41);
}

#[tokio::test]
async fn test_text_filter_matches_any_numeric_column() {
    let fake = FakeSource::new(vec![
        record(80, "init", 1, 1),
        record(1, "svc80", 2, 3),
        record(2, "cache", 4, 80),
        record(3, "worker", 80, 7),
        record(4, "idle", 5, 9),
    ]);
    let (pipeline, _registry, _updates) = build(fake, Handle::current());

    pipeline.set_filter(FilterInputs {
        text: "80".to_string(),
        ..Default::default()
    });
    pipeline.set_sort(SortKey::Pid);

    let outcome = pipeline.refresh().unwrap();
    assert_eq!(outcome.view_pids(), vec![1, 2, 3, 80]);
}

#[tokio::test]
async fn test_memory_sort_is_descending() {
    let fake = FakeSource::new(vec![
        record(1, "a", 1, 10),
        record(2, "b", 1, 50),
        record(3, "c", 1, 30),
    ]);
    let (pipeline, _registry, _updates) = build(fake, Handle::current());
    pipeline.set_sort(SortKey::Memory);

    let outcome = pipeline.refresh().unwrap();
    let memory: Vec<u64> = outcome
        .view
        .iter()
        .map(|r| r.read().working_set_mb())
        .collect();
    assert_eq!(memory, vec![50, 30, 10]);
}

#[tokio::test]
async fn test_narrowing_filter_keeps_survivor_positions() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake, Handle::current());
    let mut list = PublishedList::new();

    pipeline.refresh().unwrap();
    list.apply(updates.try_recv().unwrap());

    pipeline.set_filter(FilterInputs {
        min_memory_mb: "50".to_string(),
        ..Default::default()
    });
    pipeline.refresh().unwrap();
    let update = updates.try_recv().unwrap();
    assert_eq!(update.removed, vec![1]);
    assert!(update.added.is_empty());

    list.apply(update);
    assert_eq!(list.pids(), vec![2, 3]);
}

#[tokio::test]
async fn test_sort_change_only_orders_new_entries() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake.clone(), Handle::current());

    pipeline.refresh().unwrap();
    updates.try_recv().unwrap();

    pipeline.set_sort(SortKey::Memory);
    let outcome = pipeline.refresh().unwrap();
    assert!(outcome.update.is_empty());
    assert_eq!(outcome.view_pids(), vec![3, 2, 1]);
    assert_eq!(pipeline.published_pids(), vec![2, 1, 3]);

    let mut table = sample_table();
    table.push(record(9, "small", 1, 2));
    table.push(record(8, "big", 1, 900));
    fake.set_records(table);

    let update = pipeline.refresh().unwrap().update;
    assert_eq!(update.added_pids(), vec![8, 9]);
    assert_eq!(pipeline.published_pids(), vec![2, 1, 3, 8, 9]);
}

#[tokio::test]
async fn test_monitoring_annotation_follows_registry() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, registry, _updates) = build(fake, Handle::current());

    assert!(registry.start_monitoring(3, "code"));
    pipeline.refresh().unwrap();
    let code = pipeline.cached(3).unwrap();
    assert!(code.read().monitored);
    let started = code.read().monitoring_started;
    assert!(started.is_some());
    assert!(!pipeline.cached(1).unwrap().read().monitored);

    registry.stop_monitoring(3);
    pipeline.refresh().unwrap();
    assert!(!code.read().monitored);
    assert_eq!(code.read().monitoring_started, started);

    registry.remove_monitoring(3);
    pipeline.refresh().unwrap();
    assert!(!code.read().monitored);
    assert_eq!(code.read().monitoring_started, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_refresh_picks_up_new_processes() {
    let fake = FakeSource::new(sample_table());
    let (pipeline, _registry, mut updates) = build(fake.clone(), Handle::current());
    let pipeline = Arc::new(pipeline);
    pipeline.set_refresh_interval(Duration::from_millis(20));

    let auto = pipeline.start_auto_refresh(&Handle::current());
    let first = timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.added.len(), 3);

    fake.set_records(vec![record(42, "late", 1, 1)]);
    let next = timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.added_pids(), vec![42]);
    assert_eq!(next.removed.len(), 3);

    auto.shutdown().await;
}

/// Every listing waits until the test has seen it start and lets it go.
struct GatedSource {
    inner: Arc<FakeSource>,
    entered: Barrier,
    release: Barrier,
}

impl ProcessSource for GatedSource {
    fn list_processes(&self) -> Vec<ProcessRecord> {
        self.entered.wait();
        self.release.wait();
        self.inner.list_processes()
    }

    fn snapshot(&self, pid: u32) -> Option<ProcessSample> {
        self.inner.snapshot(pid)
    }

    fn set_priority(&self, pid: u32, class: PriorityClass) -> bool {
        self.inner.set_priority(pid, class)
    }

    fn terminate(&self, pid: u32) -> bool {
        self.inner.terminate(pid)
    }

    fn details_for(&self, pid: u32) -> Option<ProcessDetails> {
        self.inner.details_for(pid)
    }
}

#[test]
fn test_overlapping_refresh_is_dropped() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let gated = Arc::new(GatedSource {
        inner: FakeSource::new(sample_table()),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let (pipeline, _registry, _updates) = build(gated.clone(), runtime.handle().clone());
    let pipeline = Arc::new(pipeline);

    let worker = Arc::clone(&pipeline);
    let first = std::thread::spawn(move || worker.refresh());

    gated.entered.wait();
    assert!(pipeline.is_refreshing());
    assert!(pipeline.refresh().is_none());
    gated.release.wait();

    let outcome = first.join().unwrap();
    assert_eq!(outcome.unwrap().view.len(), 3);
    assert!(!pipeline.is_refreshing());
}

#[test]
fn test_disabling_auto_refresh_lets_in_flight_refresh_publish() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let gated = Arc::new(GatedSource {
        inner: FakeSource::new(sample_table()),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let (pipeline, _registry, mut updates) = build(gated.clone(), runtime.handle().clone());
    let pipeline = Arc::new(pipeline);
    pipeline.set_refresh_interval(Duration::from_millis(10));

    let auto = pipeline.start_auto_refresh(runtime.handle());
    gated.entered.wait();
    auto.stop();
    gated.release.wait();

    let update = runtime
        .block_on(async { timeout(Duration::from_secs(5), updates.recv()).await })
        .unwrap()
        .unwrap();
    assert_eq!(update.added_pids(), vec![2, 1, 3]);

    runtime.block_on(auto.shutdown());
    assert!(!pipeline.is_refreshing());
    assert!(updates.try_recv().is_err());
}
