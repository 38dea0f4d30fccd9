//! Encode and decode of intermediate token representations.

use axum::extract::State;
use tokio_util::sync::CancellationToken;

use voxgate_core::ValidationError;
use voxgate_core::wire::Blob;

use crate::dto::{VqganDecodeRequest, VqganDecodeResponse, VqganEncodeRequest, VqganEncodeResponse};
use crate::error::HttpError;
use crate::negotiate::{Negotiated, Wire, WireBody};
use crate::state::AppState;

/// Encode raw audios into token matrices.
pub async fn encode(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    WireBody(req): WireBody<VqganEncodeRequest>,
) -> Result<Wire<VqganEncodeResponse>, HttpError> {
    if req.audios.is_empty() {
        return Err(ValidationError::Empty { field: "audios" }.into());
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let audios = req.audios.into_iter().map(Blob::into_inner).collect();
    let tokens = state.driver.encode_audio(audios, &cancel).await?;

    Ok(Wire(format, VqganEncodeResponse { tokens }))
}

/// Decode token matrices into little-endian `f32` PCM.
pub async fn decode(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    WireBody(req): WireBody<VqganDecodeRequest>,
) -> Result<Wire<VqganDecodeResponse>, HttpError> {
    if req.tokens.is_empty() {
        return Err(ValidationError::Empty { field: "tokens" }.into());
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let decoded = state.driver.decode_tokens(req.tokens, &cancel).await?;

    let audios = decoded
        .iter()
        .map(|samples| Blob(samples.iter().flat_map(|s| s.to_le_bytes()).collect()))
        .collect();
    Ok(Wire(format, VqganDecodeResponse { audios }))
}
