//! Asynchronous task endpoints.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use axum::response::Response;

use voxgate_core::{TtsRequest, ValidationError};
use voxgate_tasks::CancelOutcome;

use super::audio_response;
use crate::dto::{AsyncGenerateResponse, StepQuery, StopTaskResponse, TaskStatusResponse};
use crate::error::HttpError;
use crate::negotiate::{Negotiated, Wire, WireBody};
use crate::state::AppState;

/// Read the required `step_id` query parameter.
fn step_id_from(uri: &Uri) -> Result<String, HttpError> {
    Query::<StepQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.step_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HttpError::Validation("step_id query parameter is required".into()))
}

/// Submit a generation task and return at once.
pub async fn submit(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    WireBody(mut req): WireBody<TtsRequest>,
) -> Result<Wire<AsyncGenerateResponse>, HttpError> {
    let step_id = req
        .step_id
        .take()
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::Empty { field: "step_id" })?;

    if req.has_conflicting_references() {
        tracing::warn!(
            target: "voxgate.http",
            step_id = %step_id,
            "Both a saved reference and inline references given; using the saved one"
        );
    }

    // Results are always written whole.
    req.streaming = false;
    let params = req.into_parameters(&state.driver.limits())?;
    let snapshot = state.registry.submit(step_id, params).await?;

    Ok(Wire(
        format,
        AsyncGenerateResponse {
            success: true,
            message: "Task created and started".into(),
            step_id: snapshot.id,
            status: snapshot.status,
        },
    ))
}

/// Current status of one task.
pub async fn status(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    uri: Uri,
) -> Result<Wire<TaskStatusResponse>, HttpError> {
    let step_id = step_id_from(&uri)?;
    let snapshot = state.registry.status(&step_id).await?;
    Ok(Wire(format, TaskStatusResponse::from_snapshot(&snapshot)))
}

/// Audio of a completed task.
pub async fn download(State(state): State<AppState>, uri: Uri) -> Result<Response, HttpError> {
    let step_id = step_id_from(&uri)?;
    let result = state.registry.fetch_result(&step_id).await?;
    Ok(audio_response(
        result.format,
        &format!("audio_{step_id}"),
        Body::from(result.bytes),
    ))
}

/// Cancel every pending and processing task.
pub async fn stop_all(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
) -> Wire<StopTaskResponse> {
    let count = state.registry.cancel_all().await;
    Wire(
        format,
        StopTaskResponse {
            success: true,
            message: format!("Stopped {count} task(s)"),
            step_id: None,
        },
    )
}

/// Cancel one task. Cancelling a finished task succeeds without effect.
pub async fn stop_one(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    Path(step_id): Path<String>,
) -> Result<Wire<StopTaskResponse>, HttpError> {
    let message = match state.registry.cancel(&step_id).await? {
        CancelOutcome::Cancelled | CancelOutcome::Signalled => format!("Task {step_id} stopped"),
        CancelOutcome::AlreadyFinished(status) => {
            format!("Task {step_id} already finished with status {status}")
        }
    };

    Ok(Wire(
        format,
        StopTaskResponse {
            success: true,
            message,
            step_id: Some(step_id),
        },
    ))
}
