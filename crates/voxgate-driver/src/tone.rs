//! Deterministic stand-in engine.
//!
//! Renders one short sine tone per text chunk. Pitch is derived from the
//! chunk text, the seed and the voice prompts, so identical requests produce
//! identical audio. Useful for wiring tests and for running the service
//! without model weights.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use voxgate_core::{EngineError, SynthesisEngine, SynthesisRequest, SynthesisSession};

/// Token frames per second of audio, matching common codec rates.
const FRAMES_PER_SECOND: u32 = 21;
const MILLIS_PER_CHAR: u32 = 40;
const CODEBOOKS: usize = 8;
const AMPLITUDE: f32 = 0.3;

/// Sine-tone engine.
#[derive(Debug, Clone)]
pub struct ToneEngine {
    sample_rate: u32,
    step_delay: Duration,
}

impl ToneEngine {
    pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

    pub const fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            step_delay: Duration::ZERO,
        }
    }

    /// Sleep this long in every step, to mimic a slow engine.
    #[must_use]
    pub const fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    const fn samples_per_frame(&self) -> usize {
        (self.sample_rate / FRAMES_PER_SECOND) as usize
    }
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}

fn fnv1a(bytes: impl IntoIterator<Item = u8>, seed: u64) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64 ^ seed;
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[allow(clippy::cast_precision_loss)]
fn tone(frequency: f32, len: usize, sample_rate: u32) -> Vec<f32> {
    let step = TAU * frequency / sample_rate as f32;
    (0..len)
        .map(|i| AMPLITUDE * (step * i as f32).sin())
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn pitch(hash: u64) -> f32 {
    // 200–800 Hz
    200.0 + (hash % 600) as f32
}

/// Split on whitespace into chunks of at most `limit` characters.
fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl SynthesisEngine for ToneEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn encode_reference(&self, audio: &[u8]) -> Result<Vec<Vec<i32>>, EngineError> {
        if audio.is_empty() {
            return Err(EngineError::InvalidAudio("reference audio is empty".into()));
        }
        Ok((0..CODEBOOKS)
            .map(|book| {
                audio
                    .chunks(512)
                    .map(|chunk| {
                        let hash = fnv1a(chunk.iter().copied(), book as u64);
                        i32::try_from(hash % 1024).unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    fn decode_tokens(&self, tokens: &[Vec<i32>]) -> Result<Vec<f32>, EngineError> {
        let frames = tokens.first().map_or(0, Vec::len);
        if frames == 0 {
            return Err(EngineError::InvalidAudio("token matrix is empty".into()));
        }
        if tokens.iter().any(|row| row.len() != frames) {
            return Err(EngineError::InvalidAudio(
                "token matrix rows have different lengths".into(),
            ));
        }
        let hash = fnv1a(tokens[0].iter().flat_map(|t| t.to_le_bytes()), 0);
        Ok(tone(
            pitch(hash),
            frames * self.samples_per_frame(),
            self.sample_rate,
        ))
    }

    fn start(&self, request: SynthesisRequest) -> Result<Box<dyn SynthesisSession>, EngineError> {
        let limit = usize::try_from(request.chunk_length).unwrap_or(usize::MAX).max(1);
        let mut chunks = split_chunks(&request.text, limit);
        chunks.reverse();

        let voice = request.prompts.iter().fold(request.seed.unwrap_or(0), |acc, p| {
            fnv1a(p.tokens.iter().flatten().flat_map(|t| t.to_le_bytes()), acc)
        });
        let max_samples = match request.max_new_tokens {
            0 => usize::MAX,
            tokens => tokens as usize * self.samples_per_frame(),
        };

        Ok(Box::new(ToneSession {
            chunks,
            voice,
            sample_rate: self.sample_rate,
            step_delay: self.step_delay,
            max_samples,
        }))
    }
}

struct ToneSession {
    // Reversed so `pop` yields chunks in order.
    chunks: Vec<String>,
    voice: u64,
    sample_rate: u32,
    step_delay: Duration,
    max_samples: usize,
}

impl SynthesisSession for ToneSession {
    fn next_segment(&mut self) -> Result<Option<Vec<f32>>, EngineError> {
        let Some(chunk) = self.chunks.pop() else {
            return Ok(None);
        };
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
        let millis = chunk.chars().count() as u64 * u64::from(MILLIS_PER_CHAR);
        let len = usize::try_from(millis * u64::from(self.sample_rate) / 1000)
            .unwrap_or(usize::MAX)
            .min(self.max_samples);
        let hash = fnv1a(chunk.bytes(), self.voice);
        Ok(Some(tone(pitch(hash), len, self.sample_rate)))
    }
}
