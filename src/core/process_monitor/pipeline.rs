//! Process list refresh pipeline.
//!
//! A refresh polls the full process table, merges it into a per-pid cache
//! (mutating persisting records in place), annotates monitoring state from
//! the registry, filters, sorts, and sends the difference against the last
//! published sequence as one `ListUpdate`. At most one refresh runs at a
//! time; overlapping requests are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::filter::{FilterInputs, SortKey};
use super::model::ProcessRecord;
use super::published::{ListUpdate, SharedRecord};
use super::registry::{MonitoringMark, MonitoringRegistry};
use super::source::ProcessSource;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

/// Result of one completed refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// The batch that was sent to the presentation side.
    pub update: ListUpdate,
    /// The full filtered and sorted sequence this refresh computed.
    pub view: Vec<SharedRecord>,
}

impl RefreshOutcome {
    pub fn view_pids(&self) -> Vec<u32> {
        self.view.iter().map(|r| r.read().pid).collect()
    }
}

/// Pipeline state that only a refresh in flight may touch.
#[derive(Default)]
struct MergeState {
    cache: HashMap<u32, SharedRecord>,
    published: Vec<u32>,
}

/// Clears the single-flight flag when the refresh ends, including by panic.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RefreshPipeline {
    source: Arc<dyn ProcessSource>,
    registry: Arc<MonitoringRegistry>,
    refreshing: AtomicBool,
    state: Mutex<MergeState>,
    filter: RwLock<FilterInputs>,
    sort: RwLock<SortKey>,
    refresh_interval_ms: AtomicU64,
    updates: mpsc::UnboundedSender<ListUpdate>,
}

impl RefreshPipeline {
    /// Create the pipeline and the receiving end of its update stream.
    pub fn new(
        source: Arc<dyn ProcessSource>,
        registry: Arc<MonitoringRegistry>,
    ) -> (Self, mpsc::UnboundedReceiver<ListUpdate>) {
        let (updates, updates_rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            source,
            registry,
            refreshing: AtomicBool::new(false),
            state: Mutex::new(MergeState::default()),
            filter: RwLock::new(FilterInputs::default()),
            sort: RwLock::new(SortKey::default()),
            refresh_interval_ms: AtomicU64::new(DEFAULT_REFRESH_INTERVAL.as_millis() as u64),
            updates,
        };
        (pipeline, updates_rx)
    }

    pub fn set_filter(&self, filter: FilterInputs) {
        *self.filter.write() = filter;
    }

    pub fn filter(&self) -> FilterInputs {
        self.filter.read().clone()
    }

    pub fn set_sort(&self, sort: SortKey) {
        *self.sort.write() = sort;
    }

    pub fn sort(&self) -> SortKey {
        *self.sort.read()
    }

    pub fn set_refresh_interval(&self, refresh_interval: Duration) {
        self.refresh_interval_ms
            .store(refresh_interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.load(Ordering::Relaxed)).max(MIN_REFRESH_INTERVAL)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// The cached record for `pid`, if the last refresh saw it.
    pub fn cached(&self, pid: u32) -> Option<SharedRecord> {
        self.state.lock().cache.get(&pid).cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Pids as the presentation side will hold them once every sent update
    /// has been applied.
    pub fn published_pids(&self) -> Vec<u32> {
        self.state.lock().published.clone()
    }

    /// Run one refresh on the calling thread.
    ///
    /// Returns `None` if another refresh was already in progress.
    pub fn refresh(&self) -> Option<RefreshOutcome> {
        let Some(_flight) = FlightGuard::acquire(&self.refreshing) else {
            log::debug!("Refresh already in progress; request dropped");
            return None;
        };

        let listing = self.source.list_processes();
        let marks = self.registry.marks();
        let filter = self.filter.read().parse();
        let sort = self.sort();

        let mut state = self.state.lock();
        let merged = merge_listing(&mut state.cache, listing, &marks);

        let mut view: Vec<(ProcessRecord, SharedRecord)> = merged
            .into_iter()
            .filter(|(record, _)| filter.matches(record))
            .collect();
        view.sort_by(|a, b| sort.compare(&a.0, &b.0));

        let view: Vec<(u32, SharedRecord)> = view
            .into_iter()
            .map(|(record, shared)| (record.pid, shared))
            .collect();

        let (update, published) = diff_published(&state.published, &view);
        state.published = published;
        drop(state);

        log::debug!(
            "Refresh complete: {} shown, {} removed, {} added",
            view.len(),
            update.removed.len(),
            update.added.len()
        );

        if !update.is_empty() && self.updates.send(update.clone()).is_err() {
            log::trace!("No presentation receiver for list update");
        }

        Some(RefreshOutcome {
            update,
            view: view.into_iter().map(|(_, shared)| shared).collect(),
        })
    }

    /// Run a refresh on the blocking pool.
    pub fn spawn_refresh(self: &Arc<Self>, handle: &Handle) -> JoinHandle<Option<RefreshOutcome>> {
        let pipeline = Arc::clone(self);
        handle.spawn_blocking(move || pipeline.refresh())
    }

    /// Refresh now and then every `refresh_interval` until the returned
    /// handle is stopped or dropped.
    pub fn start_auto_refresh(self: &Arc<Self>, handle: &Handle) -> AutoRefresh {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = handle.spawn(auto_refresh_task(Arc::clone(self), stop_rx));
        log::info!(
            "Auto-refresh enabled every {}ms",
            self.refresh_interval().as_millis()
        );
        AutoRefresh {
            stop: stop_tx,
            task: Some(task),
        }
    }
}

/// Merge a fresh listing into the cache and annotate monitoring state.
///
/// Returns `(snapshot, shared)` pairs in listing order, one per distinct pid.
fn merge_listing(
    cache: &mut HashMap<u32, SharedRecord>,
    listing: Vec<ProcessRecord>,
    marks: &HashMap<u32, MonitoringMark>,
) -> Vec<(ProcessRecord, SharedRecord)> {
    let mut seen = HashSet::with_capacity(listing.len());
    let mut merged = Vec::with_capacity(listing.len());

    for fresh in listing {
        let pid = fresh.pid;
        if !seen.insert(pid) {
            continue;
        }

        let mark = marks.get(&pid);
        let (snapshot, shared) = match cache.get(&pid) {
            Some(existing) => {
                let mut record = existing.write();
                record.update_from(&fresh);
                annotate(&mut record, mark);
                (record.clone(), Arc::clone(existing))
            }
            None => {
                let mut record = fresh;
                annotate(&mut record, mark);
                let shared = Arc::new(RwLock::new(record.clone()));
                cache.insert(pid, Arc::clone(&shared));
                (record, shared)
            }
        };

        merged.push((snapshot, shared));
    }

    cache.retain(|pid, _| seen.contains(pid));
    merged
}

fn annotate(record: &mut ProcessRecord, mark: Option<&MonitoringMark>) {
    record.monitored = mark.is_some_and(|m| m.active);
    record.monitoring_started = mark.map(|m| m.started_at);
}

/// Diff the next view against what was published.
///
/// Entries that stay keep their published position; new entries are appended
/// in view order. Returns the update and the resulting published order.
fn diff_published(published: &[u32], view: &[(u32, SharedRecord)]) -> (ListUpdate, Vec<u32>) {
    let next: HashSet<u32> = view.iter().map(|(pid, _)| *pid).collect();
    let previous: HashSet<u32> = published.iter().copied().collect();

    let removed: Vec<u32> = published
        .iter()
        .copied()
        .filter(|pid| !next.contains(pid))
        .collect();

    let added: Vec<(u32, SharedRecord)> = view
        .iter()
        .filter(|(pid, _)| !previous.contains(pid))
        .map(|(pid, shared)| (*pid, Arc::clone(shared)))
        .collect();

    let mut order: Vec<u32> = published
        .iter()
        .copied()
        .filter(|pid| next.contains(pid))
        .collect();
    order.extend(added.iter().map(|(pid, _)| *pid));

    let update = ListUpdate {
        removed,
        added: added.into_iter().map(|(_, shared)| shared).collect(),
    };

    (update, order)
}

/// Handle to a running auto-refresh loop.
pub struct AutoRefresh {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    /// Stop scheduling refreshes. A refresh already running still completes.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn auto_refresh_task(pipeline: Arc<RefreshPipeline>, mut stop: watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            break;
        }

        let worker = Arc::clone(&pipeline);
        if let Err(e) = tokio::task::spawn_blocking(move || worker.refresh()).await {
            log::warn!("Auto-refresh cycle failed: {}", e);
        }

        tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(pipeline.refresh_interval()) => {}
        }
    }

    log::info!("Auto-refresh disabled");
}
