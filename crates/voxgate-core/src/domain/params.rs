//! Generation parameters and the request shape they are validated from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::reference::{ReferenceAudio, ReferenceId, ReferenceSelector};
use crate::error::ValidationError;

pub const CHUNK_LENGTH_RANGE: (u32, u32) = (100, 300);
pub const TOP_P_RANGE: (f32, f32) = (0.1, 1.0);
pub const TEMPERATURE_RANGE: (f32, f32) = (0.1, 1.0);
pub const REPETITION_PENALTY_RANGE: (f32, f32) = (0.9, 2.0);

/// Encoded audio container produced for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Pcm,
    Mp3,
}

impl AudioFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
            Self::Mp3 => "mp3",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "pcm" => Ok(Self::Pcm),
            "mp3" => Ok(Self::Mp3),
            other => Err(ValidationError::Invalid(format!(
                "Unknown audio format '{other}'"
            ))),
        }
    }
}

/// Whether encoded reference prompts may be reused across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCache {
    On,
    #[default]
    Off,
}

impl MemoryCache {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Limits that depend on deployment configuration rather than the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterLimits {
    /// Maximum text length in characters; `0` disables the check.
    pub max_text_length: usize,
    /// Whether the build can encode MP3.
    pub mp3_available: bool,
}

/// Validated, immutable description of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub text: String,
    pub chunk_length: u32,
    pub format: AudioFormat,
    pub reference: ReferenceSelector,
    pub seed: Option<u64>,
    pub top_p: f32,
    pub temperature: f32,
    pub repetition_penalty: f32,
    /// `0` means no limit.
    pub max_new_tokens: u32,
    pub normalize: bool,
    pub memory_cache: MemoryCache,
}

impl GenerationParameters {
    /// Parameters with every default applied for the given text.
    pub fn for_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chunk_length: default_chunk_length(),
            format: AudioFormat::default(),
            reference: ReferenceSelector::None,
            seed: None,
            top_p: default_top_p(),
            temperature: default_temperature(),
            repetition_penalty: default_repetition_penalty(),
            max_new_tokens: default_max_new_tokens(),
            normalize: true,
            memory_cache: MemoryCache::Off,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceSelector) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn with_memory_cache(mut self, memory_cache: MemoryCache) -> Self {
        self.memory_cache = memory_cache;
        self
    }

    /// Text length as counted for the length cap.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Re-check every range and limit.
    pub fn validate(&self, limits: &ParameterLimits) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::Empty { field: "text" });
        }
        let len = self.text_len();
        if limits.max_text_length > 0 && len > limits.max_text_length {
            return Err(ValidationError::TextTooLong {
                len,
                max: limits.max_text_length,
            });
        }
        let (lo, hi) = CHUNK_LENGTH_RANGE;
        if !(lo..=hi).contains(&self.chunk_length) {
            return Err(ValidationError::out_of_range(
                "chunk_length",
                lo,
                hi,
                self.chunk_length,
            ));
        }
        check_float("top_p", self.top_p, TOP_P_RANGE)?;
        check_float("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_float(
            "repetition_penalty",
            self.repetition_penalty,
            REPETITION_PENALTY_RANGE,
        )?;
        if self.format == AudioFormat::Mp3 && !limits.mp3_available {
            return Err(ValidationError::UnsupportedFormat(self.format.to_string()));
        }
        if let ReferenceSelector::Inline(refs) = &self.reference {
            if refs.iter().any(|r| r.audio.is_empty()) {
                return Err(ValidationError::Empty {
                    field: "references.audio",
                });
            }
        }
        Ok(())
    }
}

fn check_float(field: &'static str, value: f32, (lo, hi): (f32, f32)) -> Result<(), ValidationError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::out_of_range(field, lo, hi, value))
    }
}

const fn default_chunk_length() -> u32 {
    200
}
const fn default_top_p() -> f32 {
    0.8
}
const fn default_temperature() -> f32 {
    0.8
}
const fn default_repetition_penalty() -> f32 {
    1.1
}
const fn default_max_new_tokens() -> u32 {
    1024
}
const fn default_true() -> bool {
    true
}

// ── Request body shape ──────────────────────────────────────────────────────

/// Text-to-speech request body, shared by the synchronous and asynchronous
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    /// Client-chosen task id; required by asynchronous submission only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub text: String,
    #[serde(default = "default_chunk_length")]
    pub chunk_length: u32,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub references: Vec<ReferenceAudio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub use_memory_cache: MemoryCache,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>) -> Self {
        let defaults = GenerationParameters::for_text(text);
        Self {
            step_id: None,
            text: defaults.text,
            chunk_length: defaults.chunk_length,
            format: defaults.format,
            references: Vec::new(),
            reference_id: None,
            seed: None,
            use_memory_cache: defaults.memory_cache,
            normalize: defaults.normalize,
            streaming: false,
            max_new_tokens: defaults.max_new_tokens,
            top_p: defaults.top_p,
            repetition_penalty: defaults.repetition_penalty,
            temperature: defaults.temperature,
        }
    }

    /// The saved id, if one was given and is non-blank.
    fn saved_reference(&self) -> Option<&str> {
        self.reference_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// True when both a saved id and inline samples were supplied.
    ///
    /// The saved id wins; callers log the discarded inline samples.
    pub fn has_conflicting_references(&self) -> bool {
        self.saved_reference().is_some() && !self.references.is_empty()
    }

    /// Validate the request and freeze it into [`GenerationParameters`].
    pub fn into_parameters(
        self,
        limits: &ParameterLimits,
    ) -> Result<GenerationParameters, ValidationError> {
        if self.streaming && self.format != AudioFormat::Wav {
            return Err(ValidationError::StreamingRequiresWav);
        }

        let saved = self.saved_reference().map(str::to_owned);
        let reference = match saved {
            Some(raw) => ReferenceSelector::Saved(
                ReferenceId::parse(raw).map_err(|e| ValidationError::Invalid(e.to_string()))?,
            ),
            None if self.references.is_empty() => ReferenceSelector::None,
            None => ReferenceSelector::Inline(self.references),
        };

        let parameters = GenerationParameters {
            text: self.text,
            chunk_length: self.chunk_length,
            format: self.format,
            reference,
            seed: self.seed,
            top_p: self.top_p,
            temperature: self.temperature,
            repetition_penalty: self.repetition_penalty,
            max_new_tokens: self.max_new_tokens,
            normalize: self.normalize,
            memory_cache: self.use_memory_cache,
        };
        parameters.validate(limits)?;
        Ok(parameters)
    }
}
