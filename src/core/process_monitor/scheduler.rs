//! Per-process sampling tasks.
//!
//! Each monitored pid owns exactly one tokio task that polls the data source
//! on a fixed interval. The registration table maps pid -> cancellation
//! handle; the task's guard removes its own entry on every exit path.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::model::ProcessSample;
use super::source::ProcessSource;

/// Lower bound applied to every sampling interval.
pub const MIN_SAMPLING_INTERVAL: Duration = Duration::from_millis(10);

struct Registration {
    generation: u64,
    cancel: watch::Sender<bool>,
}

impl Registration {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

type Sessions = Arc<Mutex<HashMap<u32, Registration>>>;

/// Releases a task's registration when the task ends, however it ends.
///
/// A pid that was stopped and restarted before the old task noticed keeps
/// the newer registration: only the matching generation is removed.
struct RegistrationGuard {
    sessions: Sessions,
    pid: u32,
    generation: u64,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let mut sessions = self.sessions.lock();
        if sessions
            .get(&self.pid)
            .is_some_and(|r| r.generation == self.generation)
        {
            sessions.remove(&self.pid);
            log::trace!("Released sampler registration for pid {}", self.pid);
        }
    }
}

/// Owns the background sampling tasks, keyed by pid.
pub struct SamplingScheduler {
    source: Arc<dyn ProcessSource>,
    handle: Handle,
    sessions: Sessions,
    next_generation: AtomicU64,
}

impl SamplingScheduler {
    pub fn new(source: Arc<dyn ProcessSource>, handle: Handle) -> Self {
        Self {
            source,
            handle,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Launch a sampler for `pid` unless one is already running.
    ///
    /// Returns `true` if a new task was spawned. `on_sample` receives every
    /// reading, then a single `None` if the process disappears.
    pub fn start<F>(&self, pid: u32, sampling_interval: Duration, on_sample: F) -> bool
    where
        F: FnMut(Option<ProcessSample>) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let generation = {
            let mut sessions = self.sessions.lock();
            if sessions.get(&pid).is_some_and(|r| !r.is_cancelled()) {
                log::debug!("Sampler for pid {} already running", pid);
                return false;
            }

            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            sessions.insert(
                pid,
                Registration {
                    generation,
                    cancel: cancel_tx,
                },
            );
            generation
        };

        let guard = RegistrationGuard {
            sessions: Arc::clone(&self.sessions),
            pid,
            generation,
        };

        let sampling_interval = sampling_interval.max(MIN_SAMPLING_INTERVAL);
        log::info!(
            "Starting sampler for pid {} every {}ms",
            pid,
            sampling_interval.as_millis()
        );

        self.handle.spawn(sampling_task(
            pid,
            sampling_interval,
            Arc::clone(&self.source),
            on_sample,
            cancel_rx,
            guard,
        ));

        true
    }

    /// Ask the sampler for `pid` to stop at its next tick boundary.
    ///
    /// Returns `false` if no sampler was registered.
    pub fn stop(&self, pid: u32) -> bool {
        let sessions = self.sessions.lock();
        match sessions.get(&pid) {
            Some(registration) => {
                registration.cancel.send_replace(true);
                log::debug!("Stop requested for sampler of pid {}", pid);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let sessions = self.sessions.lock();
        for registration in sessions.values() {
            registration.cancel.send_replace(true);
        }
    }

    /// Whether a sampler for `pid` is registered and has not been asked to stop.
    pub fn is_active(&self, pid: u32) -> bool {
        self.sessions
            .lock()
            .get(&pid)
            .is_some_and(|r| !r.is_cancelled())
    }

    /// Whether any task for `pid` still holds a registration, stopping or not.
    pub fn is_registered(&self, pid: u32) -> bool {
        self.sessions.lock().contains_key(&pid)
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|r| !r.is_cancelled())
            .count()
    }
}

impl Drop for SamplingScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn sampling_task<F>(
    pid: u32,
    sampling_interval: Duration,
    source: Arc<dyn ProcessSource>,
    mut on_sample: F,
    mut cancel: watch::Receiver<bool>,
    _guard: RegistrationGuard,
) where
    F: FnMut(Option<ProcessSample>) + Send + 'static,
{
    // First tick fires immediately; later ticks wait a full interval after a
    // slow poll instead of bursting.
    let mut ticker = interval(sampling_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                // A dropped sender means the registration was replaced or the
                // scheduler is gone; either way this task is done.
                if changed.is_err() || *cancel.borrow() {
                    log::debug!("Sampler for pid {} cancelled", pid);
                    break;
                }
            }
            _ = ticker.tick() => {
                if *cancel.borrow() {
                    break;
                }

                let poll_source = Arc::clone(&source);
                let sample = match tokio::task::spawn_blocking(move || poll_source.snapshot(pid)).await {
                    Ok(sample) => sample,
                    Err(e) => {
                        log::warn!("Snapshot of pid {} failed unexpectedly: {}", pid, e);
                        None
                    }
                };

                let finished = sample.is_none();
                log::trace!("Sampler tick for pid {} (finished: {})", pid, finished);
                deliver(&mut on_sample, pid, sample);

                if finished {
                    log::info!("Process {} exited; sampler finished", pid);
                    break;
                }
            }
        }
    }
}

fn deliver<F>(on_sample: &mut F, pid: u32, sample: Option<ProcessSample>)
where
    F: FnMut(Option<ProcessSample>),
{
    if panic::catch_unwind(AssertUnwindSafe(|| on_sample(sample))).is_err() {
        log::warn!("Sample callback for pid {} panicked", pid);
    }
}
