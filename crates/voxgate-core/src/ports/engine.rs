//! Synthesis engine boundary.
//!
//! The engine is an external collaborator: it turns text plus optional voice
//! prompts into audio, one segment at a time. Every method here is blocking
//! and may take a long time; callers run them on the blocking thread pool
//! and never hold async locks across them.
//!
//! A session yields segments lazily so that the caller can check for
//! cancellation between steps and forward audio as soon as it exists.

use std::sync::Arc;

use crate::domain::GenerationParameters;
use crate::error::EngineError;

/// A reference sample already encoded into the engine's token space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptReference {
    /// Codebook-major token matrix (`codebooks × frames`).
    pub tokens: Vec<Vec<i32>>,
    pub text: String,
}

/// Everything the engine needs for one generation.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub prompts: Vec<Arc<PromptReference>>,
    pub chunk_length: u32,
    pub seed: Option<u64>,
    pub top_p: f32,
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub max_new_tokens: u32,
    pub normalize: bool,
}

impl SynthesisRequest {
    pub fn new(parameters: &GenerationParameters, prompts: Vec<Arc<PromptReference>>) -> Self {
        Self {
            text: parameters.text.clone(),
            prompts,
            chunk_length: parameters.chunk_length,
            seed: parameters.seed,
            top_p: parameters.top_p,
            temperature: parameters.temperature,
            repetition_penalty: parameters.repetition_penalty,
            max_new_tokens: parameters.max_new_tokens,
            normalize: parameters.normalize,
        }
    }
}

/// An in-progress generation.
pub trait SynthesisSession: Send {
    /// Run one engine step and return its mono samples in `[-1.0, 1.0]`.
    ///
    /// Returns `Ok(None)` once the text is exhausted.
    fn next_segment(&mut self) -> Result<Option<Vec<f32>>, EngineError>;
}

/// Engine-agnostic synthesis interface.
pub trait SynthesisEngine: Send + Sync {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Encode raw reference audio into the engine's token representation.
    fn encode_reference(&self, audio: &[u8]) -> Result<Vec<Vec<i32>>, EngineError>;

    /// Decode a token matrix back into mono samples.
    fn decode_tokens(&self, tokens: &[Vec<i32>]) -> Result<Vec<f32>, EngineError>;

    /// Begin a generation.
    fn start(&self, request: SynthesisRequest) -> Result<Box<dyn SynthesisSession>, EngineError>;
}
