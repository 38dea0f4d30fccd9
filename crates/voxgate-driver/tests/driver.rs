//! Generation driver behaviour against fake engines and an in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use voxgate_core::{
    AudioFormat, EngineError, GenerationError, GenerationParameters, MemoryCache, ReferenceAudio,
    ReferenceError, ReferenceId, ReferenceRepository, ReferenceSelector, ServiceSettings,
    SynthesisEngine, SynthesisRequest, SynthesisSession,
};
use voxgate_driver::{GenerationDriver, ToneEngine};

// ── Test doubles ────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryReferences {
    entries: Mutex<HashMap<ReferenceId, ReferenceAudio>>,
}

#[async_trait]
impl ReferenceRepository for MemoryReferences {
    async fn add(&self, id: &ReferenceId, audio: &[u8], text: &str) -> Result<(), ReferenceError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(id) {
            return Err(ReferenceError::AlreadyExists(id.to_string()));
        }
        entries.insert(
            id.clone(),
            ReferenceAudio {
                audio: audio.to_vec(),
                text: text.to_owned(),
            },
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ReferenceId>, ReferenceError> {
        let mut ids: Vec<_> = self.entries.lock().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &ReferenceId) -> Result<(), ReferenceError> {
        self.entries
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ReferenceError::NotFound(id.to_string()))
    }

    async fn rename(&self, old: &ReferenceId, new: &ReferenceId) -> Result<(), ReferenceError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .remove(old)
            .ok_or_else(|| ReferenceError::NotFound(old.to_string()))?;
        entries.insert(new.clone(), entry);
        Ok(())
    }

    async fn get(&self, id: &ReferenceId) -> Result<ReferenceAudio, ReferenceError> {
        self.entries
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ReferenceError::NotFound(id.to_string()))
    }
}

/// Tone engine that counts reference encodes.
#[derive(Default)]
struct CountingEngine {
    inner: ToneEngine,
    encodes: AtomicUsize,
}

impl SynthesisEngine for CountingEngine {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn encode_reference(&self, audio: &[u8]) -> Result<Vec<Vec<i32>>, EngineError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode_reference(audio)
    }

    fn decode_tokens(&self, tokens: &[Vec<i32>]) -> Result<Vec<f32>, EngineError> {
        self.inner.decode_tokens(tokens)
    }

    fn start(&self, request: SynthesisRequest) -> Result<Box<dyn SynthesisSession>, EngineError> {
        self.inner.start(request)
    }
}

/// Engine whose sessions fail after one good segment.
struct FailingEngine;

struct FailingSession {
    emitted: bool,
}

impl SynthesisSession for FailingSession {
    fn next_segment(&mut self) -> Result<Option<Vec<f32>>, EngineError> {
        if self.emitted {
            Err(EngineError::synthesis("decoder ran out of memory"))
        } else {
            self.emitted = true;
            Ok(Some(vec![0.0; 16]))
        }
    }
}

impl SynthesisEngine for FailingEngine {
    fn sample_rate(&self) -> u32 {
        16_000
    }

    fn encode_reference(&self, _audio: &[u8]) -> Result<Vec<Vec<i32>>, EngineError> {
        Ok(vec![vec![0]])
    }

    fn decode_tokens(&self, _tokens: &[Vec<i32>]) -> Result<Vec<f32>, EngineError> {
        Err(EngineError::synthesis("no decoder"))
    }

    fn start(&self, _request: SynthesisRequest) -> Result<Box<dyn SynthesisSession>, EngineError> {
        Ok(Box::new(FailingSession { emitted: false }))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn driver_with(
    engine: Arc<dyn SynthesisEngine>,
    references: Arc<MemoryReferences>,
) -> GenerationDriver {
    GenerationDriver::new(engine, references, &ServiceSettings::with_defaults())
}

fn slow_engine() -> Arc<dyn SynthesisEngine> {
    Arc::new(ToneEngine::new(8000).with_step_delay(Duration::from_millis(20)))
}

/// Long enough for dozens of engine steps at `chunk_length` 100.
fn long_text() -> String {
    "lorem ipsum dolor sit amet ".repeat(100)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn reference(bytes: &[u8]) -> ReferenceAudio {
    ReferenceAudio {
        audio: bytes.to_vec(),
        text: "reference transcript".into(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn buffered_wav_generation() {
    let driver = driver_with(Arc::new(ToneEngine::new(8000)), Arc::default());
    let params = GenerationParameters::for_text("hello world");

    let audio = driver
        .generate_encoded(&params, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(&audio.bytes[0..4], b"RIFF");
    assert_eq!(audio.sample_rate, 8000);
    assert!(audio.bytes.len() > 44);
}

#[tokio::test]
async fn pcm_generation_has_no_header() {
    let driver = driver_with(Arc::new(ToneEngine::new(8000)), Arc::default());
    let params = GenerationParameters::for_text("hi").with_format(AudioFormat::Pcm);

    let audio = driver
        .generate_encoded(&params, &CancellationToken::new())
        .await
        .unwrap();
    assert_ne!(&audio.bytes[0..4], b"RIFF");
    assert_eq!(audio.bytes.len() % 2, 0);
}

#[tokio::test]
async fn missing_saved_reference_fails_before_engine() {
    let engine = Arc::new(CountingEngine::default());
    let driver = driver_with(engine.clone(), Arc::default());
    let params = GenerationParameters::for_text("hi")
        .with_reference(ReferenceSelector::Saved(ReferenceId::parse("ghost").unwrap()));

    let err = driver
        .generate(&params, &CancellationToken::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GenerationError::ReferenceNotFound(ref id) if id == "ghost"));
    assert_eq!(driver.gate().available(), 1);
}

#[tokio::test]
async fn saved_reference_is_encoded() {
    let references = Arc::new(MemoryReferences::default());
    let id = ReferenceId::parse("alice").unwrap();
    references.add(&id, b"alice-audio", "hi").await.unwrap();

    let engine = Arc::new(CountingEngine::default());
    let driver = driver_with(engine.clone(), references);
    let params =
        GenerationParameters::for_text("hello").with_reference(ReferenceSelector::Saved(id));

    driver
        .generate_encoded(&params, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(engine.encodes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn memory_cache_reuses_prompts_only_when_on() {
    let engine = Arc::new(CountingEngine::default());
    let driver = driver_with(engine.clone(), Arc::default());
    let inline = ReferenceSelector::Inline(vec![reference(b"sample")]);

    let cached = GenerationParameters::for_text("one")
        .with_reference(inline.clone())
        .with_memory_cache(MemoryCache::On);
    for _ in 0..3 {
        driver
            .generate_encoded(&cached, &CancellationToken::new())
            .await
            .unwrap();
    }
    assert_eq!(engine.encodes.load(Ordering::SeqCst), 1);
    assert_eq!(driver.prompt_cache().len(), 1);

    let uncached = GenerationParameters::for_text("two").with_reference(inline);
    for _ in 0..2 {
        driver
            .generate_encoded(&uncached, &CancellationToken::new())
            .await
            .unwrap();
    }
    assert_eq!(engine.encodes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn engine_failure_preserves_message() {
    let driver = driver_with(Arc::new(FailingEngine), Arc::default());
    let params = GenerationParameters::for_text("hi");

    let err = driver
        .generate_encoded(&params, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("decoder ran out of memory"));
    wait_until(|| driver.gate().available() == 1).await;
}

#[tokio::test]
async fn text_over_limit_is_rejected() {
    let settings = ServiceSettings {
        max_text_length: 5,
        ..ServiceSettings::with_defaults()
    };
    let driver = GenerationDriver::new(
        Arc::new(ToneEngine::default()),
        Arc::new(MemoryReferences::default()),
        &settings,
    );
    let err = driver
        .generate(&GenerationParameters::for_text("too long"), &CancellationToken::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GenerationError::TextTooLong { len: 8, max: 5 }));
}

#[tokio::test]
async fn cancellation_is_observed_between_steps() {
    let driver = driver_with(slow_engine(), Arc::default());
    let mut params = GenerationParameters::for_text(long_text());
    params.chunk_length = 100;
    let cancel = CancellationToken::new();

    let mut stream = driver.generate(&params, &cancel).await.unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    cancel.cancel();

    let mut saw_cancel = false;
    while let Some(item) = stream.next().await {
        if matches!(item, Err(GenerationError::Cancelled)) {
            saw_cancel = true;
        }
    }
    assert!(saw_cancel);
    wait_until(|| driver.gate().available() == 1).await;
}

#[tokio::test]
async fn dropping_the_stream_releases_capacity() {
    let driver = driver_with(slow_engine(), Arc::default());
    let mut params = GenerationParameters::for_text(long_text());
    params.chunk_length = 100;
    let cancel = CancellationToken::new();

    let mut stream = driver.generate(&params, &cancel).await.unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    assert_eq!(driver.gate().available(), 0);

    // Simulates a client disconnecting mid-stream.
    drop(stream);
    wait_until(|| driver.gate().available() == 1).await;
    assert!(!cancel.is_cancelled(), "caller's token is left untouched");
}

#[tokio::test]
async fn cancelled_wait_for_capacity() {
    let driver = driver_with(slow_engine(), Arc::default());
    let mut params = GenerationParameters::for_text(long_text());
    params.chunk_length = 100;

    let _busy = driver
        .generate(&params, &CancellationToken::new())
        .await
        .unwrap();

    let waiting = CancellationToken::new();
    let canceller = waiting.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });
    let err = driver.generate(&params, &waiting).await.err().unwrap();
    assert!(matches!(err, GenerationError::Cancelled));
}

#[tokio::test]
async fn encode_then_decode_round_trip_shapes() {
    let driver = driver_with(Arc::new(ToneEngine::new(8400)), Arc::default());
    let cancel = CancellationToken::new();

    let tokens = driver
        .encode_audio(vec![vec![1; 600], vec![2; 100]], &cancel)
        .await
        .unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0][0].len(), 2);
    assert_eq!(tokens[1][0].len(), 1);

    let audios = driver.decode_tokens(tokens, &cancel).await.unwrap();
    assert_eq!(audios[0].len(), 800);
    assert_eq!(audios[1].len(), 400);
}

#[tokio::test]
async fn decode_failure_is_engine_failure() {
    let driver = driver_with(Arc::new(FailingEngine), Arc::default());
    let err = driver
        .decode_tokens(vec![vec![vec![1]]], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Failed(_)));
}
