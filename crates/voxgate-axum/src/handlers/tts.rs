//! Synchronous generation.

use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use tokio_util::sync::CancellationToken;

use voxgate_core::TtsRequest;

use super::audio_response;
use crate::error::HttpError;
use crate::negotiate::WireBody;
use crate::state::AppState;

/// Generate audio and return it in the response.
///
/// With `streaming` the WAV header goes out first and PCM follows as the
/// engine produces it. Dropping the connection cancels generation on both
/// paths and frees the capacity permit.
pub async fn synthesize(
    State(state): State<AppState>,
    WireBody(req): WireBody<TtsRequest>,
) -> Result<Response, HttpError> {
    if req.has_conflicting_references() {
        tracing::warn!(
            target: "voxgate.http",
            reference_id = ?req.reference_id,
            inline = req.references.len(),
            "Both a saved reference and inline references given; using the saved one"
        );
    }

    let streaming = req.streaming;
    let params = req.into_parameters(&state.driver.limits())?;
    let format = params.format;
    let cancel = CancellationToken::new();

    if streaming {
        // The stream owns the session; dropping the body cancels it.
        let stream = state.driver.generate(&params, &cancel).await?;
        return Ok(audio_response(
            format,
            "audio",
            Body::from_stream(stream.into_wav_chunks()),
        ));
    }

    let _guard = cancel.clone().drop_guard();
    let audio = state.driver.generate_encoded(&params, &cancel).await?;
    Ok(audio_response(format, "audio", Body::from(audio.bytes)))
}
