//! Domain model: generation parameters, reference voices, and tasks.

mod params;
mod reference;
mod task;

pub use params::{
    AudioFormat, CHUNK_LENGTH_RANGE, GenerationParameters, MemoryCache, ParameterLimits,
    REPETITION_PENALTY_RANGE, TEMPERATURE_RANGE, TOP_P_RANGE, TtsRequest,
};
pub use reference::{MAX_REFERENCE_ID_LEN, ReferenceAudio, ReferenceId, ReferenceSelector};
pub use task::{TaskSnapshot, TaskStatus};
