#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use rmp_serde as _;
#[cfg(test)]
use serde_json as _;

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;
pub mod wire;

pub use domain::{
    AudioFormat, GenerationParameters, MemoryCache, ParameterLimits, ReferenceAudio, ReferenceId,
    ReferenceSelector, TaskSnapshot, TaskStatus, TtsRequest,
};
pub use error::{EngineError, GenerationError, ReferenceError, TaskError, ValidationError};
pub use ports::{
    PromptReference, ReferenceRepository, SynthesisEngine, SynthesisRequest, SynthesisSession,
};
pub use settings::{ServiceSettings, SettingsError, validate_settings};
