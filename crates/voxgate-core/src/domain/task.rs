//! Asynchronous task lifecycle types.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::GenerationParameters;

/// Lifecycle state of an asynchronous generation task.
///
/// ```text
/// pending ──► processing ──► completed | failed | cancelled
///    └──────────────────────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never change again (short of eviction).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Pending and processing tasks are the ones a cancel can still affect.
    pub const fn is_live(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a task, safe to hand out to readers.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when `status` is `failed`.
    pub error: Option<String>,
    pub parameters: Arc<GenerationParameters>,
}

impl TaskSnapshot {
    pub fn has_result(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
