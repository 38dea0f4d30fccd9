//! Types owned by the task table.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use voxgate_core::{GenerationParameters, TaskSnapshot, TaskStatus};

/// Identifies one claim of a task by a worker.
///
/// Finishing with a lease that no longer matches is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(pub(crate) u64);

/// Worker-side state of a processing task.
#[derive(Debug, Clone)]
pub(crate) struct ActiveLease {
    pub lease: LeaseId,
    pub cancel: CancellationToken,
}

/// One task as stored in the table.
#[derive(Debug)]
pub(crate) struct TaskEntry {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub parameters: Arc<GenerationParameters>,
    pub result: Option<PathBuf>,
    pub active: Option<ActiveLease>,
}

impl TaskEntry {
    pub fn new(id: String, parameters: Arc<GenerationParameters>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            parameters,
            result: None,
            active: None,
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error: self.error.clone(),
            parameters: Arc::clone(&self.parameters),
        }
    }

    /// Latest timestamp already recorded; new timestamps never go below it.
    pub fn latest_stamp(&self) -> DateTime<Utc> {
        self.completed_at
            .or(self.started_at)
            .unwrap_or(self.created_at)
    }
}

/// Work handed to a worker by a successful claim.
#[derive(Debug, Clone)]
pub struct Claim {
    pub id: String,
    pub lease: LeaseId,
    pub parameters: Arc<GenerationParameters>,
    pub cancel: CancellationToken,
}

/// How a worker's execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(PathBuf),
    Failed(String),
    Cancelled,
}

/// Effect of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The task was pending and is now cancelled.
    Cancelled,
    /// The task is processing; its worker has been told to stop.
    Signalled,
    /// The task had already reached this terminal state; nothing changed.
    AlreadyFinished(TaskStatus),
}

/// A task removed by eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted {
    pub id: String,
    pub result: Option<PathBuf>,
}
