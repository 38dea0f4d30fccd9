//! Error types for each voxgate component.
//!
//! Every component owns one enum; the HTTP adapter maps them onto status
//! codes and stable `type` discriminants.

use thiserror::Error;

use crate::domain::TaskStatus;

/// A request was rejected before any work started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A numeric field was outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },

    /// Text exceeded the configured maximum length.
    #[error("Text is too long, max length is {max}")]
    TextTooLong { len: usize, max: usize },

    /// The requested output format cannot be produced by this build.
    #[error("Output format '{0}' is not available in this build")]
    UnsupportedFormat(String),

    /// Streaming was requested for a format that cannot be streamed.
    #[error("Streaming only supports WAV format")]
    StreamingRequiresWav,

    /// Free-form validation failure (malformed body, bad field combination).
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    pub(crate) fn out_of_range(
        field: &'static str,
        min: impl ToString,
        max: impl ToString,
        value: impl ToString,
    ) -> Self {
        Self::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        }
    }
}

/// Reference store failures.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The id violates the character set or length rules.
    #[error("Invalid reference id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    /// A reference with this id already exists.
    #[error("Reference ID '{0}' already exists")]
    AlreadyExists(String),

    /// No reference with this id exists.
    #[error("Reference ID '{0}' not found")]
    NotFound(String),

    /// Filesystem failure while reading or writing the store.
    #[error("Reference store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a synthesis engine implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The reference audio could not be decoded or encoded.
    #[error("Invalid reference audio: {0}")]
    InvalidAudio(String),

    /// Token generation or decoding failed.
    #[error("{0}")]
    Synthesis(String),
}

impl EngineError {
    /// Build a synthesis error from any displayable value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }
}

/// Generation driver failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A saved reference id did not resolve.
    #[error("Reference ID '{0}' not found")]
    ReferenceNotFound(String),

    /// Text exceeded the driver's configured maximum length.
    #[error("Text is too long, max length is {max}")]
    TextTooLong { len: usize, max: usize },

    /// The caller's cancellation signal was observed.
    #[error("Generation cancelled")]
    Cancelled,

    /// The engine failed; its message is preserved.
    #[error("Generation failed: {0}")]
    Failed(#[from] EngineError),

    /// Reading a saved reference failed for a reason other than absence.
    #[error("Reference lookup failed: {0}")]
    Reference(String),

    /// Output encoding failed.
    #[error("Audio encoding failed: {0}")]
    Encoding(String),

    /// A blocking engine task panicked or was aborted.
    #[error("Generation worker failed: {0}")]
    Worker(String),
}

impl From<ReferenceError> for GenerationError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::NotFound(id) => Self::ReferenceNotFound(id),
            other => Self::Reference(other.to_string()),
        }
    }
}

/// Task registry failures.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A non-evicted task already occupies this id.
    #[error("Task with step_id '{0}' already exists")]
    DuplicateId(String),

    /// No task with this id exists (never submitted, or evicted).
    #[error("Task with step_id '{0}' not found")]
    NotFound(String),

    /// The task has no result yet, or never will.
    #[error("Task is not completed yet. Current status: {status}")]
    NotReady { id: String, status: TaskStatus },

    /// The task was cancelled before producing a result.
    #[error("Task with step_id '{0}' was cancelled")]
    Cancelled(String),

    /// Reading or writing a result artifact failed.
    #[error("Task result I/O error: {0}")]
    Io(#[from] std::io::Error),
}
