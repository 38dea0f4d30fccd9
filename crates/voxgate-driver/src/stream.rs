//! Lazy audio produced by one generation.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use voxgate_core::GenerationError;

use crate::encode;

/// Message from the engine thread to the stream.
pub(crate) enum Frame {
    Segment(Vec<f32>),
    Done,
}

/// Finite sequence of mono sample segments from one generation.
///
/// Dropping the stream before it ends cancels the generation and frees its
/// capacity permit.
pub struct AudioStream {
    rx: mpsc::Receiver<Result<Frame, GenerationError>>,
    sample_rate: u32,
    finished: bool,
    _cancel_on_drop: DropGuard,
}

impl AudioStream {
    pub(crate) const fn new(
        rx: mpsc::Receiver<Result<Frame, GenerationError>>,
        sample_rate: u32,
        cancel_on_drop: DropGuard,
    ) -> Self {
        Self {
            rx,
            sample_rate,
            finished: false,
            _cancel_on_drop: cancel_on_drop,
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Drain every segment into one buffer.
    pub async fn collect_samples(mut self) -> Result<Vec<f32>, GenerationError> {
        let mut samples = Vec::new();
        while let Some(segment) = self.next().await {
            samples.extend(segment?);
        }
        Ok(samples)
    }

    /// WAV byte stream: an open-ended header, then PCM per segment.
    pub fn into_wav_chunks(self) -> impl Stream<Item = Result<Bytes, GenerationError>> + Send {
        let header = Bytes::from(encode::streaming_wav_header(self.sample_rate));
        stream::once(async move { Ok(header) }).chain(
            self.map(|segment| segment.map(|samples| Bytes::from(encode::pcm_s16le(&samples)))),
        )
    }
}

impl Stream for AudioStream {
    type Item = Result<Vec<f32>, GenerationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(Frame::Segment(samples)))) => Poll::Ready(Some(Ok(samples))),
            Poll::Ready(Some(Ok(Frame::Done))) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            // Sender gone without `Done`: the engine thread died.
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(Some(Err(GenerationError::Worker(
                    "engine task ended unexpectedly".into(),
                ))))
            }
        }
    }
}
