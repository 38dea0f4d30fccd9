//! Intermediate representation bodies.
//!
//! Token matrices are `[codebook][frame]`; decoded audio is little-endian
//! `f32` PCM at the engine's sample rate.

use serde::{Deserialize, Serialize};

use voxgate_core::wire::Blob;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqganEncodeRequest {
    pub audios: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqganEncodeResponse {
    pub tokens: Vec<Vec<Vec<i32>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqganDecodeRequest {
    pub tokens: Vec<Vec<Vec<i32>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqganDecodeResponse {
    pub audios: Vec<Blob>,
}
