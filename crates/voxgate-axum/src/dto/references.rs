//! Reference management bodies.

use serde::{Deserialize, Serialize};

use voxgate_core::wire;

/// Non-multipart form of a reference upload.
#[derive(Debug, Clone, Deserialize)]
pub struct AddReferenceBody {
    pub id: String,
    #[serde(with = "wire::bytes")]
    pub audio: Vec<u8>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddReferenceResponse {
    pub success: bool,
    pub message: String,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReferencesResponse {
    pub success: bool,
    pub reference_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteReferenceRequest {
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReferenceResponse {
    pub success: bool,
    pub message: String,
    pub reference_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReferenceRequest {
    pub old_reference_id: String,
    pub new_reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReferenceResponse {
    pub success: bool,
    pub message: String,
    pub old_reference_id: String,
    pub new_reference_id: String,
}
