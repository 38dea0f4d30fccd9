//! The generation driver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use voxgate_core::{
    GenerationError, GenerationParameters, ParameterLimits, PromptReference,
    ReferenceAudio, ReferenceRepository, ReferenceSelector, ServiceSettings, SynthesisEngine,
    SynthesisRequest,
};

use crate::cache::{Fingerprint, PromptCache};
use crate::encode;
use crate::gate::CapacityGate;
use crate::stream::{AudioStream, Frame};

/// Segments buffered between the engine thread and the consumer.
const SEGMENT_BUFFER: usize = 4;

/// Fully encoded output of a buffered generation.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
}

/// Uniform, cancellable front for the synthesis engine.
pub struct GenerationDriver {
    engine: Arc<dyn SynthesisEngine>,
    references: Arc<dyn ReferenceRepository>,
    gate: CapacityGate,
    prompts: PromptCache,
    max_text_length: usize,
}

impl GenerationDriver {
    pub fn new(
        engine: Arc<dyn SynthesisEngine>,
        references: Arc<dyn ReferenceRepository>,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            engine,
            references,
            gate: CapacityGate::new(settings.engine_concurrency),
            prompts: PromptCache::default(),
            max_text_length: settings.max_text_length,
        }
    }

    /// Limits requests are validated against before they reach the driver.
    pub const fn limits(&self) -> ParameterLimits {
        ParameterLimits {
            max_text_length: self.max_text_length,
            mp3_available: encode::MP3_AVAILABLE,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    pub const fn gate(&self) -> &CapacityGate {
        &self.gate
    }

    pub const fn prompt_cache(&self) -> &PromptCache {
        &self.prompts
    }

    /// Turn a reference selector into concrete samples.
    pub async fn resolve_references(
        &self,
        selector: &ReferenceSelector,
    ) -> Result<Vec<ReferenceAudio>, GenerationError> {
        match selector {
            ReferenceSelector::None => Ok(Vec::new()),
            ReferenceSelector::Inline(refs) => Ok(refs.clone()),
            ReferenceSelector::Saved(id) => Ok(vec![self.references.get(id).await?]),
        }
    }

    /// Start a generation and return its lazily produced audio.
    ///
    /// Waits for a capacity permit first; the permit is held until the engine
    /// session ends, which happens early if `cancel` fires or the returned
    /// stream is dropped.
    pub async fn generate(
        &self,
        parameters: &GenerationParameters,
        cancel: &CancellationToken,
    ) -> Result<AudioStream, GenerationError> {
        let len = parameters.text_len();
        if self.max_text_length > 0 && len > self.max_text_length {
            return Err(GenerationError::TextTooLong {
                len,
                max: self.max_text_length,
            });
        }

        let references = self.resolve_references(&parameters.reference).await?;
        let permit = self.gate.acquire(cancel).await?;

        let prompts = self
            .encode_prompts(references, parameters.memory_cache.is_on(), cancel)
            .await?;

        let request = SynthesisRequest::new(parameters, prompts);
        let engine = Arc::clone(&self.engine);
        let sample_rate = engine.sample_rate();
        let session_cancel = cancel.child_token();
        let (tx, rx) = mpsc::channel(SEGMENT_BUFFER);

        tracing::debug!(
            target: "voxgate.driver",
            text_len = len,
            format = %parameters.format,
            "Starting engine session"
        );

        let loop_cancel = session_cancel.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = run_session(engine.as_ref(), request, &loop_cancel, &tx);
            let frame = outcome.map(|()| Frame::Done);
            // Receiver may already be gone; nothing left to report to.
            let _ = tx.blocking_send(frame);
        });

        Ok(AudioStream::new(rx, sample_rate, session_cancel.drop_guard()))
    }

    /// Generate to completion and encode in the requested format.
    pub async fn generate_encoded(
        &self,
        parameters: &GenerationParameters,
        cancel: &CancellationToken,
    ) -> Result<EncodedAudio, GenerationError> {
        let stream = self.generate(parameters, cancel).await?;
        let sample_rate = stream.sample_rate();
        let samples = stream.collect_samples().await?;
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let format = parameters.format;
        let bytes = run_blocking(move || encode::encode(format, &samples, sample_rate)).await?;
        Ok(EncodedAudio { bytes, sample_rate })
    }

    /// Encode raw audios into token matrices, one per input.
    pub async fn encode_audio(
        &self,
        audios: Vec<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<Vec<i32>>>, GenerationError> {
        let _permit = self.gate.acquire(cancel).await?;
        let engine = Arc::clone(&self.engine);
        let cancel = cancel.clone();
        run_blocking(move || {
            audios
                .iter()
                .map(|audio| {
                    if cancel.is_cancelled() {
                        return Err(GenerationError::Cancelled);
                    }
                    engine.encode_reference(audio).map_err(Into::into)
                })
                .collect()
        })
        .await
    }

    /// Decode token matrices into mono samples, one buffer per input.
    pub async fn decode_tokens(
        &self,
        tokens: Vec<Vec<Vec<i32>>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, GenerationError> {
        let _permit = self.gate.acquire(cancel).await?;
        let engine = Arc::clone(&self.engine);
        let cancel = cancel.clone();
        run_blocking(move || {
            tokens
                .iter()
                .map(|matrix| {
                    if cancel.is_cancelled() {
                        return Err(GenerationError::Cancelled);
                    }
                    engine.decode_tokens(matrix).map_err(Into::into)
                })
                .collect()
        })
        .await
    }

    /// Encode each reference into a prompt, consulting the cache when enabled.
    async fn encode_prompts(
        &self,
        references: Vec<ReferenceAudio>,
        use_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<PromptReference>>, GenerationError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<Fingerprint> = references.iter().map(Fingerprint::of).collect();
        let cached: Vec<Option<Arc<PromptReference>>> = keys
            .iter()
            .map(|key| if use_cache { self.prompts.get(key) } else { None })
            .collect();

        let hits = cached.iter().filter(|p| p.is_some()).count();
        if hits > 0 {
            tracing::debug!(target: "voxgate.driver", hits, "Prompt cache hits");
        }

        let engine = Arc::clone(&self.engine);
        let cancel = cancel.clone();
        let prompts = run_blocking(move || {
            references
                .into_iter()
                .zip(cached)
                .map(|(reference, cached)| {
                    if let Some(prompt) = cached {
                        return Ok(prompt);
                    }
                    if cancel.is_cancelled() {
                        return Err(GenerationError::Cancelled);
                    }
                    let tokens = engine.encode_reference(&reference.audio)?;
                    Ok(Arc::new(PromptReference {
                        tokens,
                        text: reference.text,
                    }))
                })
                .collect::<Result<Vec<_>, GenerationError>>()
        })
        .await?;

        if use_cache {
            for (key, prompt) in keys.into_iter().zip(&prompts) {
                self.prompts.insert(key, Arc::clone(prompt));
            }
        }
        Ok(prompts)
    }
}

/// Drive one engine session to completion, checking `cancel` before every step.
fn run_session(
    engine: &dyn SynthesisEngine,
    request: SynthesisRequest,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Result<Frame, GenerationError>>,
) -> Result<(), GenerationError> {
    if cancel.is_cancelled() {
        return Err(GenerationError::Cancelled);
    }
    let mut session = engine.start(request)?;
    loop {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        match session.next_segment()? {
            Some(samples) => {
                if tx.blocking_send(Ok(Frame::Segment(samples))).is_err() {
                    // Consumer dropped the stream.
                    return Err(GenerationError::Cancelled);
                }
            }
            None => return Ok(()),
        }
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, GenerationError>
where
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GenerationError::Worker(e.to_string()))?
}
