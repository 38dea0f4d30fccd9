//! Task registry implementation.
//!
//! # Architecture
//!
//! - **Registry**: owns the table, the worker pool and the eviction sweep
//! - **Table**: pure lifecycle state, see [`crate::TaskTable`]
//! - **Worker**: runs one claim through the driver and reports an outcome
//!
//! # Concurrency Model
//!
//! - Workers and the sweep are started once (never resets `runner_started`)
//! - `Notify` for wake-on-work
//! - Lease tokens prevent stale finalize commits
//! - The table lock is never held across generation or file I/O

mod paths;
mod worker;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use voxgate_core::{AudioFormat, GenerationParameters, ServiceSettings, TaskError, TaskSnapshot};
use voxgate_driver::GenerationDriver;

use crate::table::{CancelOutcome, Claim, JobOutcome, TaskTable};

use paths::ResultFiles;

/// Registry tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of worker loops.
    pub workers: usize,
    /// How long a finished task stays queryable.
    pub retention: Duration,
    /// Finished tasks kept at most.
    pub max_tasks: usize,
    /// Period of the eviction sweep.
    pub eviction_interval: Duration,
}

impl From<&ServiceSettings> for RegistryConfig {
    fn from(settings: &ServiceSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            retention: settings.task_retention,
            max_tasks: settings.max_tasks,
            eviction_interval: settings.eviction_interval,
        }
    }
}

/// Audio of a completed task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Keyed registry of background generation tasks.
pub struct TaskRegistry {
    table: Mutex<TaskTable>,
    queue_notify: Notify,
    driver: Arc<GenerationDriver>,
    results: ResultFiles,
    config: RegistryConfig,
    runner_started: AtomicBool,
    shutdown: CancellationToken,
}

impl TaskRegistry {
    pub fn new(
        driver: Arc<GenerationDriver>,
        results_dir: impl Into<PathBuf>,
        settings: &ServiceSettings,
    ) -> Arc<Self> {
        Self::with_config(driver, results_dir, RegistryConfig::from(settings))
    }

    pub fn with_config(
        driver: Arc<GenerationDriver>,
        results_dir: impl Into<PathBuf>,
        config: RegistryConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(TaskTable::new()),
            queue_notify: Notify::new(),
            driver,
            results: ResultFiles::new(results_dir),
            config,
            runner_started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start the worker pool and the eviction sweep.
    ///
    /// This method is idempotent: calling it multiple times has no effect
    /// after the first call.
    pub fn start(self: &Arc<Self>) {
        if self
            .runner_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        for worker in 0..self.config.workers {
            let registry = Arc::clone(self);
            tokio::spawn(async move {
                registry.run_worker(worker).await;
            });
        }

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.run_sweeper().await;
        });

        tracing::info!(
            target: "voxgate.tasks",
            workers = self.config.workers,
            results = %self.results.dir().display(),
            "Task registry started"
        );
    }

    /// Register a pending task under a caller-chosen id.
    pub async fn submit(
        &self,
        id: impl Into<String>,
        parameters: GenerationParameters,
    ) -> Result<TaskSnapshot, TaskError> {
        let id = id.into();
        let snapshot = {
            let mut table = self.table.lock().await;
            table.submit(id, Arc::new(parameters), Utc::now())?
        };
        tracing::info!(target: "voxgate.tasks", step_id = %snapshot.id, "Task queued");
        self.queue_notify.notify_one();
        Ok(snapshot)
    }

    pub async fn status(&self, id: &str) -> Result<TaskSnapshot, TaskError> {
        self.table.lock().await.snapshot(id)
    }

    /// Read the audio of a completed task.
    pub async fn fetch_result(&self, id: &str) -> Result<TaskResult, TaskError> {
        let (path, format) = {
            let table = self.table.lock().await;
            let path = table.result_path(id)?;
            (path, table.snapshot(id)?.parameters.format)
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(TaskResult { bytes, format }),
            // Evicted between the lookup and the read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TaskError::NotFound(id.to_owned())),
            Err(e) => Err(TaskError::Io(e)),
        }
    }

    /// Cancel one task.
    ///
    /// A pending task is cancelled at once. A processing task is signalled
    /// and reaches `cancelled` when its worker observes the signal.
    pub async fn cancel(&self, id: &str) -> Result<CancelOutcome, TaskError> {
        let outcome = self.table.lock().await.cancel(id, Utc::now())?;
        match outcome {
            CancelOutcome::Cancelled => {
                tracing::info!(target: "voxgate.tasks", step_id = %id, "Pending task cancelled");
            }
            CancelOutcome::Signalled => {
                tracing::info!(target: "voxgate.tasks", step_id = %id, "Cancellation requested");
            }
            CancelOutcome::AlreadyFinished(status) => {
                tracing::debug!(
                    target: "voxgate.tasks",
                    step_id = %id,
                    status = %status,
                    "Cancel ignored for finished task"
                );
            }
        }
        Ok(outcome)
    }

    /// Cancel every pending and processing task; returns how many.
    pub async fn cancel_all(&self) -> usize {
        let count = self.table.lock().await.cancel_all(Utc::now());
        tracing::info!(target: "voxgate.tasks", count, "Cancelled all tasks");
        count
    }

    /// Run one eviction pass as of `now`; returns how many tasks were removed.
    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let evicted = {
            let mut table = self.table.lock().await;
            table.evict(now, self.config.retention, self.config.max_tasks)
        };

        for task in &evicted {
            if let Some(path) = &task.result {
                self.results.remove(path).await;
            }
        }

        if !evicted.is_empty() {
            tracing::debug!(target: "voxgate.tasks", count = evicted.len(), "Evicted finished tasks");
        }
        evicted.len()
    }

    /// Shutdown cleanup for process termination.
    ///
    /// Stops the workers and the sweep and signals every processing task.
    pub fn shutdown_cleanup(&self) -> usize {
        self.shutdown.cancel();
        // We can't block on tokio::sync::Mutex here, so use try_lock
        self.table.try_lock().map_or_else(
            |_| {
                tracing::warn!(target: "voxgate.tasks", "Shutdown cleanup: couldn't acquire lock");
                0
            },
            |table| {
                let count = table.signal_active();
                tracing::info!(target: "voxgate.tasks", count, "Shutdown cleanup: cancelled task tokens");
                count
            },
        )
    }

    async fn run_worker(&self, worker: usize) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let (claim, more) = {
                let mut table = self.table.lock().await;
                let claim = table.claim(Utc::now());
                (claim, table.pending_len() > 0)
            };

            if let Some(claim) = claim {
                if more {
                    // Hand the rest of the queue to another worker.
                    self.queue_notify.notify_one();
                }
                self.process(worker, claim).await;
            } else {
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    () = self.queue_notify.notified() => {}
                }
            }
        }
        tracing::debug!(target: "voxgate.tasks", worker, "Worker stopped");
    }

    async fn process(&self, worker: usize, claim: Claim) {
        tracing::info!(target: "voxgate.tasks", step_id = %claim.id, worker, "Task started");

        let outcome = worker::run_job(&self.driver, &self.results, &claim).await;
        // A cancel that raced with the end of the run still wins.
        let outcome = match outcome {
            JobOutcome::Completed(path) if claim.cancel.is_cancelled() => {
                self.results.remove(&path).await;
                JobOutcome::Cancelled
            }
            JobOutcome::Failed(_) if claim.cancel.is_cancelled() => JobOutcome::Cancelled,
            other => other,
        };

        let orphan = match &outcome {
            JobOutcome::Completed(path) => Some(path.clone()),
            _ => None,
        };
        let error = match &outcome {
            JobOutcome::Failed(message) => Some(message.clone()),
            _ => None,
        };

        let finished = self
            .table
            .lock()
            .await
            .finish(&claim.id, claim.lease, outcome, Utc::now());

        match finished {
            Some(status) => {
                if let Some(error) = error {
                    tracing::warn!(
                        target: "voxgate.tasks",
                        step_id = %claim.id,
                        error = %error,
                        "Task failed"
                    );
                } else {
                    tracing::info!(target: "voxgate.tasks", step_id = %claim.id, status = %status, "Task finished");
                }
            }
            None => {
                tracing::debug!(target: "voxgate.tasks", step_id = %claim.id, "Ignoring stale finalize (lease mismatch)");
                if let Some(path) = orphan {
                    self.results.remove(&path).await;
                }
            }
        }
    }

    async fn run_sweeper(&self) {
        let mut ticker = tokio::time::interval(self.config.eviction_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.evict_expired_at(Utc::now()).await;
                }
            }
        }
    }
}
