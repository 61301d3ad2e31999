//! Registry of monitored processes.
//!
//! Holds one `MonitoredProcessState` per pid from `start_monitoring` until
//! `remove_monitoring`, drives the sampler for each, and publishes every
//! state change on a broadcast channel so a presentation layer can follow
//! along without polling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::Duration;

use super::aggregation::MonitoredProcessState;
use super::model::ProcessSample;
use super::scheduler::SamplingScheduler;

const EVENT_CAPACITY: usize = 256;

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(1000);

/// State changes published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitoringEvent {
    Started(MonitoredProcessState),
    Updated(MonitoredProcessState),
    Stopped(MonitoredProcessState),
    Removed(u32),
}

/// What the list pipeline needs to know about a registered pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringMark {
    pub active: bool,
    pub started_at: DateTime<Local>,
}

struct Session {
    id: u64,
    state: MonitoredProcessState,
}

type SessionMap = Arc<RwLock<HashMap<u32, Session>>>;

pub struct MonitoringRegistry {
    scheduler: SamplingScheduler,
    sessions: SessionMap,
    events: broadcast::Sender<MonitoringEvent>,
    sampling_interval_ms: AtomicU64,
    next_session: AtomicU64,
}

impl MonitoringRegistry {
    pub fn new(scheduler: SamplingScheduler, sampling_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scheduler,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            sampling_interval_ms: AtomicU64::new(sampling_interval.as_millis() as u64),
            next_session: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitoringEvent> {
        self.events.subscribe()
    }

    /// Interval used by sessions started from now on.
    pub fn set_sampling_interval(&self, sampling_interval: Duration) {
        self.sampling_interval_ms
            .store(sampling_interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms.load(Ordering::Relaxed))
    }

    /// Begin a sampling session for `pid`. No-op (returns `false`) if the pid
    /// is already registered, active or not.
    pub fn start_monitoring(&self, pid: u32, name: &str) -> bool {
        let session_id = self.next_session.fetch_add(1, Ordering::Relaxed);

        // Lock order: sessions, then the scheduler table. A stop never sees
        // a session whose sampler is not registered yet, and `Started` goes
        // out before the first `Updated`.
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&pid) {
            return false;
        }

        let state = MonitoredProcessState::new(pid, name, Local::now());
        sessions.insert(
            pid,
            Session {
                id: session_id,
                state: state.clone(),
            },
        );
        log::info!("Monitoring started for {}", state);
        let _ = self.events.send(MonitoringEvent::Started(state));

        let shared = Arc::clone(&self.sessions);
        let events = self.events.clone();
        let launched = self
            .scheduler
            .start(pid, self.sampling_interval(), move |sample| {
                on_sample(&shared, &events, pid, session_id, sample);
            });
        if !launched {
            log::warn!("Sampler for pid {} was already running", pid);
        }
        drop(sessions);

        true
    }

    /// End the session for `pid`, keeping its statistics. Idempotent.
    pub fn stop_monitoring(&self, pid: u32) {
        let stopped = {
            let mut sessions = self.sessions.write();
            self.scheduler.stop(pid);
            match sessions.get_mut(&pid) {
                Some(session) => session
                    .state
                    .finish(Local::now())
                    .then(|| session.state.clone()),
                None => None,
            }
        };

        if let Some(state) = stopped {
            log::info!("Monitoring stopped for {}", state);
            let _ = self.events.send(MonitoringEvent::Stopped(state));
        }
    }

    /// Stop and forget `pid`. Returns `false` if it was not registered.
    pub fn remove_monitoring(&self, pid: u32) -> bool {
        self.stop_monitoring(pid);

        let removed = self.sessions.write().remove(&pid).is_some();
        if removed {
            log::info!("Monitoring removed for pid {}", pid);
            let _ = self.events.send(MonitoringEvent::Removed(pid));
        }
        removed
    }

    /// Registered and still sampling.
    pub fn is_monitored(&self, pid: u32) -> bool {
        self.sessions
            .read()
            .get(&pid)
            .is_some_and(|s| s.state.active)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.sessions.read().contains_key(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<MonitoredProcessState> {
        self.sessions.read().get(&pid).map(|s| s.state.clone())
    }

    /// All sessions, oldest first.
    pub fn states(&self) -> Vec<MonitoredProcessState> {
        let mut states: Vec<_> = self
            .sessions
            .read()
            .values()
            .map(|s| s.state.clone())
            .collect();
        states.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.pid.cmp(&b.pid)));
        states
    }

    pub fn marks(&self) -> HashMap<u32, MonitoringMark> {
        self.sessions
            .read()
            .iter()
            .map(|(&pid, s)| {
                (
                    pid,
                    MonitoringMark {
                        active: s.state.active,
                        started_at: s.state.started_at,
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Stop every session, keeping the statistics.
    pub fn stop_all(&self) {
        let pids: Vec<u32> = self.sessions.read().keys().copied().collect();
        for pid in pids {
            self.stop_monitoring(pid);
        }
    }

    pub fn scheduler(&self) -> &SamplingScheduler {
        &self.scheduler
    }
}

/// Sampler callback: fold the sample into the session it was started for.
fn on_sample(
    sessions: &SessionMap,
    events: &broadcast::Sender<MonitoringEvent>,
    pid: u32,
    session_id: u64,
    sample: Option<ProcessSample>,
) {
    let event = {
        let mut sessions = sessions.write();
        let Some(session) = sessions.get_mut(&pid).filter(|s| s.id == session_id) else {
            // Removed, or replaced by a newer session for a reused pid.
            return;
        };

        let now = Local::now();
        match sample {
            Some(sample) => {
                session.state.apply_sample(&sample, now);
                MonitoringEvent::Updated(session.state.clone())
            }
            None => {
                if !session.state.finish(now) {
                    return;
                }
                log::info!("Monitoring ended for {}: process exited", session.state);
                MonitoringEvent::Stopped(session.state.clone())
            }
        }
    };

    let _ = events.send(event);
}
