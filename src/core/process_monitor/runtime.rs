//! Tokio runtime and command surface for process monitoring.
//!
//! `MonitorRuntime` wires the data source, the monitoring registry and the
//! refresh pipeline together and exposes the operations a front end calls.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::core::config::Config;
use crate::error::{ProcwatchError, Result};

use super::collector::SysinfoSource;
use super::filter::{FilterInputs, SortKey};
use super::model::{PriorityClass, ProcessDetails};
use super::pipeline::{AutoRefresh, RefreshOutcome, RefreshPipeline};
use super::published::ListUpdate;
use super::registry::{MonitoringEvent, MonitoringRegistry};
use super::scheduler::SamplingScheduler;
use super::source::ProcessSource;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

pub struct MonitorRuntime {
    source: Arc<dyn ProcessSource>,
    registry: Arc<MonitoringRegistry>,
    pipeline: Arc<RefreshPipeline>,
    auto_refresh: Mutex<Option<AutoRefresh>>,
    handle: Handle,

    /// Present when this runtime created its own Tokio runtime.
    runtime: Option<Runtime>,
}

impl MonitorRuntime {
    /// Build a runtime over the live process table with its own worker pool.
    ///
    /// Returns the receiver the presentation side drains list updates from.
    pub fn new(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<ListUpdate>)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("procwatch-worker")
            .build()
            .map_err(|e| ProcwatchError::runtime(format!("failed to start runtime: {}", e)))?;

        let source: Arc<dyn ProcessSource> = Arc::new(SysinfoSource::new());
        let (mut monitor, updates) = Self::with_source(source, runtime.handle().clone(), config);
        monitor.runtime = Some(runtime);

        log::info!("MonitorRuntime initialized");
        Ok((monitor, updates))
    }

    /// Build a runtime over any data source, spawning onto `handle`.
    pub fn with_source(
        source: Arc<dyn ProcessSource>,
        handle: Handle,
        config: &Config,
    ) -> (Self, mpsc::UnboundedReceiver<ListUpdate>) {
        let scheduler = SamplingScheduler::new(Arc::clone(&source), handle.clone());
        let registry = Arc::new(MonitoringRegistry::new(scheduler, config.sampling_interval()));

        let (pipeline, updates) = RefreshPipeline::new(Arc::clone(&source), Arc::clone(&registry));
        pipeline.set_filter(config.filter.clone());
        pipeline.set_sort(config.sort);
        pipeline.set_refresh_interval(config.refresh_interval());

        let monitor = Self {
            source,
            registry,
            pipeline: Arc::new(pipeline),
            auto_refresh: Mutex::new(None),
            handle,
            runtime: None,
        };

        if config.auto_refresh {
            monitor.set_auto_refresh(true);
        }

        (monitor, updates)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn registry(&self) -> &Arc<MonitoringRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<RefreshPipeline> {
        &self.pipeline
    }

    pub fn subscribe_monitoring(&self) -> broadcast::Receiver<MonitoringEvent> {
        self.registry.subscribe()
    }

    // Process list

    /// Refresh on the calling thread; `None` if a refresh was already running.
    pub fn refresh_now(&self) -> Option<RefreshOutcome> {
        self.pipeline.refresh()
    }

    /// Refresh in the background.
    pub fn request_refresh(&self) -> JoinHandle<Option<RefreshOutcome>> {
        self.pipeline.spawn_refresh(&self.handle)
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        let mut auto_refresh = self.auto_refresh.lock();
        match (enabled, auto_refresh.is_some()) {
            (true, false) => {
                *auto_refresh = Some(self.pipeline.start_auto_refresh(&self.handle));
            }
            (false, true) => {
                if let Some(running) = auto_refresh.take() {
                    running.stop();
                }
            }
            _ => {}
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh.lock().is_some()
    }

    pub fn set_refresh_interval(&self, refresh_interval: Duration) {
        self.pipeline.set_refresh_interval(refresh_interval);
    }

    pub fn set_filter(&self, filter: FilterInputs) {
        self.pipeline.set_filter(filter);
        self.request_refresh();
    }

    pub fn set_sort(&self, sort: SortKey) {
        self.pipeline.set_sort(sort);
        self.request_refresh();
    }

    // Monitoring

    pub fn set_sampling_interval(&self, sampling_interval: Duration) {
        self.registry.set_sampling_interval(sampling_interval);
    }

    /// Start monitoring `pid`, naming it from the last refresh or a fresh
    /// snapshot. Returns `false` if already registered or the process is gone.
    pub fn start_monitoring(&self, pid: u32) -> bool {
        let name = self
            .pipeline
            .cached(pid)
            .map(|record| record.read().name.clone())
            .or_else(|| self.source.snapshot(pid).map(|sample| sample.name));

        match name {
            Some(name) => self.start_monitoring_named(pid, &name),
            None => {
                log::debug!("Cannot monitor pid {}: process not found", pid);
                false
            }
        }
    }

    pub fn start_monitoring_named(&self, pid: u32, name: &str) -> bool {
        let started = self.registry.start_monitoring(pid, name);
        if started {
            self.request_refresh();
        }
        started
    }

    pub fn stop_monitoring(&self, pid: u32) {
        self.registry.stop_monitoring(pid);
        self.request_refresh();
    }

    pub fn remove_monitoring(&self, pid: u32) -> bool {
        let removed = self.registry.remove_monitoring(pid);
        if removed {
            self.request_refresh();
        }
        removed
    }

    // Process control

    pub fn set_priority(&self, pid: u32, class: PriorityClass) -> bool {
        self.source.set_priority(pid, class)
    }

    /// Terminate `pid` and refresh the list afterwards.
    pub fn terminate(&self, pid: u32) -> bool {
        let terminated = self.source.terminate(pid);
        self.request_refresh();
        terminated
    }

    pub fn details(&self, pid: u32) -> Option<ProcessDetails> {
        self.source.details_for(pid)
    }

    /// Fetch details on the blocking pool, off the presentation thread.
    pub fn request_details(&self, pid: u32) -> JoinHandle<Option<ProcessDetails>> {
        let source = Arc::clone(&self.source);
        self.handle.spawn_blocking(move || source.details_for(pid))
    }

    /// Stop auto-refresh and every sampler, then tear down the owned runtime.
    pub fn shutdown(mut self) {
        log::info!("Shutting down MonitorRuntime");
        self.set_auto_refresh(false);
        self.registry.stop_all();

        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        }
    }
}

impl Drop for MonitorRuntime {
    fn drop(&mut self) {
        if let Some(running) = self.auto_refresh.lock().take() {
            running.stop();
        }
        self.registry.scheduler().stop_all();
    }
}
