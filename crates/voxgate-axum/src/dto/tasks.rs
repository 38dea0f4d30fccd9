//! Asynchronous task bodies.

use serde::{Deserialize, Serialize};

use voxgate_core::{TaskSnapshot, TaskStatus};

use super::epoch_seconds;

/// `?step_id=` on the status and download endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StepQuery {
    pub step_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncGenerateResponse {
    pub success: bool,
    pub message: String,
    pub step_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub success: bool,
    pub step_id: String,
    pub status: TaskStatus,
    pub created_at: f64,
    pub started_at: Option<f64>,
    pub completed_at: Option<f64>,
    /// Present only once the task has completed.
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl TaskStatusResponse {
    pub fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        let download_url = snapshot.has_result().then(|| {
            format!(
                "/download_result?step_id={}",
                urlencoding::encode(&snapshot.id)
            )
        });
        Self {
            success: true,
            step_id: snapshot.id.clone(),
            status: snapshot.status,
            created_at: epoch_seconds(snapshot.created_at),
            started_at: snapshot.started_at.map(epoch_seconds),
            completed_at: snapshot.completed_at.map(epoch_seconds),
            download_url,
            error: snapshot.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTaskResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use voxgate_core::GenerationParameters;

    fn snapshot(id: &str, status: TaskStatus) -> TaskSnapshot {
        let now = Utc::now();
        TaskSnapshot {
            id: id.into(),
            status,
            created_at: now,
            started_at: Some(now),
            completed_at: status.is_terminal().then_some(now),
            error: None,
            parameters: Arc::new(GenerationParameters::for_text("hi")),
        }
    }

    #[test]
    fn download_url_only_when_completed() {
        let done = TaskStatusResponse::from_snapshot(&snapshot("my step", TaskStatus::Completed));
        assert_eq!(
            done.download_url.as_deref(),
            Some("/download_result?step_id=my%20step")
        );

        let running = TaskStatusResponse::from_snapshot(&snapshot("t1", TaskStatus::Processing));
        assert!(running.download_url.is_none());
        assert!(running.completed_at.is_none());
    }
}
