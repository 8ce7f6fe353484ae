//! Polling task scheduler
//!
//! One background task per device mirror. Each task sleeps for the configured
//! interval, runs a poll cycle, and repeats until its shutdown signal fires.
//! A task never stops on its own: failed cycles are skipped and retried on
//! the next interval.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::PollingError;
use crate::mirror::{DeviceMirror, MirrorState, PollOutcome};

#[derive(Debug, Default)]
struct TaskCounters {
    polls: AtomicU64,
    skipped: AtomicU64,
    recoveries: AtomicU64,
    changes: AtomicU64,
}

impl TaskCounters {
    fn record(&self, outcome: &PollOutcome) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        match outcome {
            PollOutcome::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            PollOutcome::Recovered { changed } => {
                self.recoveries.fetch_add(1, Ordering::Relaxed);
                self.changes.fetch_add(*changed as u64, Ordering::Relaxed);
            }
            PollOutcome::Refreshed { changed } => {
                self.changes.fetch_add(*changed as u64, Ordering::Relaxed);
            }
        }
    }
}

/// A single polling task
#[derive(Debug)]
pub struct PollingTask {
    device_id: String,
    interval: Duration,
    task_handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    started_at: SystemTime,
    counters: Arc<TaskCounters>,
}

impl PollingTask {
    /// Spawn the polling loop for `mirror`
    pub fn start(mirror: Arc<DeviceMirror>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(TaskCounters::default());
        let device_id = mirror.id().to_string();

        let task_counters = Arc::clone(&counters);
        let task_handle = tokio::spawn(async move {
            Self::polling_loop(mirror, interval, shutdown_rx, task_counters).await;
        });

        Self {
            device_id,
            interval,
            task_handle,
            shutdown_tx,
            started_at: SystemTime::now(),
            counters,
        }
    }

    async fn polling_loop(
        mirror: Arc<DeviceMirror>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
        counters: Arc<TaskCounters>,
    ) {
        info!(device_id = %mirror.id(), ?interval, "Starting polling task");
        mirror.set_state(MirrorState::Polling);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                // A dropped sender counts as shutdown
                _ = shutdown_rx.changed() => break,
            }

            let outcome = mirror.poll_once().await;
            counters.record(&outcome);
        }

        mirror.set_state(MirrorState::Stopped);
        info!(device_id = %mirror.id(), "Polling task ended");
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    /// Signal the task and wait for it to exit
    ///
    /// A cycle already in progress runs to completion first.
    pub async fn stop(self) -> Result<(), PollingError> {
        // The receiver is gone if the task already exited
        let _ = self.shutdown_tx.send(true);

        self.task_handle
            .await
            .map_err(|e| PollingError::TaskJoin {
                device_id: self.device_id.clone(),
                reason: e.to_string(),
            })
    }

    pub fn stats(&self) -> PollingTaskStats {
        PollingTaskStats {
            device_id: self.device_id.clone(),
            interval: self.interval,
            started_at: self.started_at,
            poll_count: self.counters.polls.load(Ordering::Relaxed),
            skipped_count: self.counters.skipped.load(Ordering::Relaxed),
            recovery_count: self.counters.recoveries.load(Ordering::Relaxed),
            change_count: self.counters.changes.load(Ordering::Relaxed),
            is_running: self.is_running(),
        }
    }
}

/// Statistics for one polling task
#[derive(Debug, Clone)]
pub struct PollingTaskStats {
    pub device_id: String,
    pub interval: Duration,
    pub started_at: SystemTime,
    /// Cycles run, including skipped ones
    pub poll_count: u64,
    pub skipped_count: u64,
    pub recovery_count: u64,
    /// Property values re-published by polling
    pub change_count: u64,
    pub is_running: bool,
}

/// Manages the polling tasks of all device mirrors
pub struct PollingScheduler {
    tasks: Arc<RwLock<HashMap<String, PollingTask>>>,
    config: PollingConfig,
}

impl PollingScheduler {
    pub fn new(config: PollingConfig) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Start polling a device mirror
    ///
    /// Does nothing if the device is already polled.
    pub async fn start_polling(&self, mirror: Arc<DeviceMirror>) -> Result<(), PollingError> {
        let mut tasks = self.tasks.write().await;

        if tasks.contains_key(mirror.id()) {
            debug!(device_id = %mirror.id(), "Polling already active");
            return Ok(());
        }
        if tasks.len() >= self.config.max_devices {
            return Err(PollingError::TooManyDevices {
                limit: self.config.max_devices,
            });
        }

        let device_id = mirror.id().to_string();
        let task = PollingTask::start(mirror, self.config.poll_interval);
        tasks.insert(device_id, task);
        Ok(())
    }

    /// Stop polling a device; returns whether a task was running
    pub async fn stop_polling(&self, device_id: &str) -> Result<bool, PollingError> {
        let task = self.tasks.write().await.remove(device_id);

        match task {
            Some(task) => {
                task.stop().await?;
                debug!(device_id, "Polling stopped");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn is_polling(&self, device_id: &str) -> bool {
        self.tasks.read().await.contains_key(device_id)
    }

    pub async fn task_stats(&self, device_id: &str) -> Option<PollingTaskStats> {
        self.tasks.read().await.get(device_id).map(PollingTask::stats)
    }

    pub async fn stats(&self) -> PollingSchedulerStats {
        let tasks = self.tasks.read().await;
        let mut task_stats: Vec<PollingTaskStats> =
            tasks.values().map(PollingTask::stats).collect();
        task_stats.sort_by(|a, b| a.device_id.cmp(&b.device_id));

        PollingSchedulerStats {
            total_tasks: task_stats.len(),
            running_tasks: task_stats.iter().filter(|s| s.is_running).count(),
            total_polls: task_stats.iter().map(|s| s.poll_count).sum(),
            total_skipped: task_stats.iter().map(|s| s.skipped_count).sum(),
            total_recoveries: task_stats.iter().map(|s| s.recovery_count).sum(),
            task_stats,
        }
    }

    /// Signal every task and wait for all of them to exit
    ///
    /// Every task is stopped even if one fails to join; the first failure is
    /// returned.
    pub async fn shutdown_all(&self) -> Result<(), PollingError> {
        let tasks: Vec<PollingTask> = self.tasks.write().await.drain().map(|(_, t)| t).collect();
        info!(count = tasks.len(), "Shutting down polling tasks");

        // Signal all first so the tasks wind down concurrently
        for task in &tasks {
            let _ = task.shutdown_tx.send(true);
        }

        let mut first_error = None;
        for task in tasks {
            if let Err(e) = task.stop().await {
                warn!(error = %e, "Polling task did not stop cleanly");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PollingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Aggregate statistics across all polling tasks
#[derive(Debug, Clone)]
pub struct PollingSchedulerStats {
    pub total_tasks: usize,
    pub running_tasks: usize,
    pub total_polls: u64,
    pub total_skipped: u64,
    pub total_recoveries: u64,
    pub task_stats: Vec<PollingTaskStats>,
}

impl fmt::Display for PollingSchedulerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Polling Scheduler Stats:")?;
        writeln!(f, "  Tasks: {} ({} running)", self.total_tasks, self.running_tasks)?;
        writeln!(f, "  Polls: {}", self.total_polls)?;
        writeln!(f, "  Skipped: {}", self.total_skipped)?;
        writeln!(f, "  Recoveries: {}", self.total_recoveries)?;

        for stats in &self.task_stats {
            writeln!(
                f,
                "  {} every {:?}: {} polls, {} skipped, {} recovered, {} changes",
                stats.device_id,
                stats.interval,
                stats.poll_count,
                stats.skipped_count,
                stats.recovery_count,
                stats.change_count,
            )?;
        }
        Ok(())
    }
}
