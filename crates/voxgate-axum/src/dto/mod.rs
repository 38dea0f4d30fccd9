//! Data Transfer Objects (DTOs) for the HTTP API contract.
//!
//! These types define the wire shape of request and response bodies. They
//! decouple the domain types from their external representation.

pub mod references;
pub mod tasks;
pub mod vqgan;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use references::{
    AddReferenceBody, AddReferenceResponse, DeleteReferenceRequest, DeleteReferenceResponse,
    ListReferencesResponse, UpdateReferenceRequest, UpdateReferenceResponse,
};
pub use tasks::{AsyncGenerateResponse, StepQuery, StopTaskResponse, TaskStatusResponse};
pub use vqgan::{VqganDecodeRequest, VqganDecodeResponse, VqganEncodeRequest, VqganEncodeResponse};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Seconds since the Unix epoch, with sub-second precision.
#[allow(clippy::cast_precision_loss)]
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}
