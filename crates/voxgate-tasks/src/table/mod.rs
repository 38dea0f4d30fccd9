//! Task table.
//!
//! This module provides a pure state machine for task lifecycle state.
//! No I/O is performed here; the registry (`TaskRegistry`) handles I/O.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - The caller supplies `now` to every transition
//! - Timestamps never move backwards within a task, even if `now` does
//! - Pending work is a FIFO; the claim is the only `pending → processing` edge

mod types;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use voxgate_core::{GenerationParameters, TaskError, TaskSnapshot, TaskStatus};

pub use types::{CancelOutcome, Claim, Evicted, JobOutcome, LeaseId};
use types::{ActiveLease, TaskEntry};

/// Lifecycle state of every known task.
///
/// This is a sync type with no internal locking; the caller
/// (`TaskRegistry`) is responsible for synchronization.
#[derive(Debug, Default)]
pub struct TaskTable {
    entries: HashMap<String, TaskEntry>,
    pending: VecDeque<String>,
    next_lease: u64,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks in any state.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tasks waiting for a worker.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Register a new pending task.
    ///
    /// Any task still in the table, whatever its status, occupies its id.
    pub fn submit(
        &mut self,
        id: String,
        parameters: Arc<GenerationParameters>,
        now: DateTime<Utc>,
    ) -> Result<TaskSnapshot, TaskError> {
        if self.entries.contains_key(&id) {
            return Err(TaskError::DuplicateId(id));
        }
        let entry = TaskEntry::new(id.clone(), parameters, now);
        let snapshot = entry.snapshot();
        self.entries.insert(id.clone(), entry);
        self.pending.push_back(id);
        Ok(snapshot)
    }

    /// Move the oldest pending task to `processing` and hand it out.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Option<Claim> {
        while let Some(id) = self.pending.pop_front() {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.status != TaskStatus::Pending {
                continue;
            }

            let lease = LeaseId(self.next_lease);
            self.next_lease += 1;
            let cancel = CancellationToken::new();

            entry.status = TaskStatus::Processing;
            entry.started_at = Some(now.max(entry.latest_stamp()));
            entry.active = Some(ActiveLease {
                lease,
                cancel: cancel.clone(),
            });

            return Some(Claim {
                id,
                lease,
                parameters: Arc::clone(&entry.parameters),
                cancel,
            });
        }
        None
    }

    /// Record how a claimed task ended.
    ///
    /// Returns the terminal status, or `None` if the lease is stale (the
    /// caller then owns any artifact it produced and should discard it).
    pub fn finish(
        &mut self,
        id: &str,
        lease: LeaseId,
        outcome: JobOutcome,
        now: DateTime<Utc>,
    ) -> Option<TaskStatus> {
        let entry = self.entries.get_mut(id)?;
        if entry.status != TaskStatus::Processing
            || entry.active.as_ref().map(|a| a.lease) != Some(lease)
        {
            return None;
        }

        entry.active = None;
        entry.completed_at = Some(now.max(entry.latest_stamp()));
        entry.status = match outcome {
            JobOutcome::Completed(path) => {
                entry.result = Some(path);
                TaskStatus::Completed
            }
            JobOutcome::Failed(message) => {
                entry.error = Some(message);
                TaskStatus::Failed
            }
            JobOutcome::Cancelled => TaskStatus::Cancelled,
        };
        Some(entry.status)
    }

    /// Cancel one task.
    pub fn cancel(&mut self, id: &str, now: DateTime<Utc>) -> Result<CancelOutcome, TaskError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_owned()))?;

        match entry.status {
            TaskStatus::Pending => {
                entry.status = TaskStatus::Cancelled;
                entry.completed_at = Some(now.max(entry.latest_stamp()));
                self.pending.retain(|queued| queued != id);
                Ok(CancelOutcome::Cancelled)
            }
            TaskStatus::Processing => {
                if let Some(active) = &entry.active {
                    active.cancel.cancel();
                }
                Ok(CancelOutcome::Signalled)
            }
            status => Ok(CancelOutcome::AlreadyFinished(status)),
        }
    }

    /// Cancel every pending task and signal every processing one.
    ///
    /// Returns how many tasks were affected.
    pub fn cancel_all(&mut self, now: DateTime<Utc>) -> usize {
        let mut count = 0;
        for entry in self.entries.values_mut() {
            match entry.status {
                TaskStatus::Pending => {
                    entry.status = TaskStatus::Cancelled;
                    entry.completed_at = Some(now.max(entry.latest_stamp()));
                    count += 1;
                }
                TaskStatus::Processing => {
                    if let Some(active) = &entry.active {
                        active.cancel.cancel();
                    }
                    count += 1;
                }
                _ => {}
            }
        }
        self.pending.clear();
        count
    }

    /// Cancel tokens of every processing task, for shutdown.
    pub fn signal_active(&self) -> usize {
        self.entries
            .values()
            .filter_map(|entry| entry.active.as_ref())
            .inspect(|active| active.cancel.cancel())
            .count()
    }

    pub fn snapshot(&self, id: &str) -> Result<TaskSnapshot, TaskError> {
        self.entries
            .get(id)
            .map(TaskEntry::snapshot)
            .ok_or_else(|| TaskError::NotFound(id.to_owned()))
    }

    /// Location of a completed task's artifact.
    pub fn result_path(&self, id: &str) -> Result<PathBuf, TaskError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.to_owned()))?;
        match (entry.status, &entry.result) {
            (TaskStatus::Completed, Some(path)) => Ok(path.clone()),
            (TaskStatus::Cancelled, _) => Err(TaskError::Cancelled(id.to_owned())),
            (status, _) => Err(TaskError::NotReady {
                id: id.to_owned(),
                status,
            }),
        }
    }

    /// Remove terminal tasks that finished before `now - retention`, then the
    /// oldest terminal tasks beyond `max_terminal`.
    pub fn evict(
        &mut self,
        now: DateTime<Utc>,
        retention: Duration,
        max_terminal: usize,
    ) -> Vec<Evicted> {
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|r| now.checked_sub_signed(r));

        let mut terminal: Vec<(DateTime<Utc>, String)> = self
            .entries
            .values()
            .filter(|entry| entry.status.is_terminal())
            .map(|entry| (entry.latest_stamp(), entry.id.clone()))
            .collect();
        terminal.sort();

        let expired = cutoff.map_or(0, |cutoff| {
            terminal.partition_point(|(finished, _)| *finished <= cutoff)
        });
        let over_cap = terminal.len().saturating_sub(max_terminal);
        let remove = expired.max(over_cap);

        terminal
            .into_iter()
            .take(remove)
            .filter_map(|(_, id)| self.entries.remove(&id))
            .map(|entry| Evicted {
                id: entry.id,
                result: entry.result,
            })
            .collect()
    }
}
