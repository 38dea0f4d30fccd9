//! HTTP request handlers.
//!
//! Each submodule contains handlers for one API area. Handlers are thin:
//! they validate, delegate to the driver, the registry or the store, and
//! shape the response.

pub mod health;
pub mod references;
pub mod tasks;
pub mod tts;
pub mod vqgan;

use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};

use voxgate_core::AudioFormat;

/// Audio payload served as a download named `<stem>.<ext>`.
pub(crate) fn audio_response(format: AudioFormat, stem: &str, body: Body) -> Response {
    let filename = format!("{stem}.{}", format.extension());
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        body,
    )
        .into_response()
}

/// `attachment` with a quoted ASCII `filename` and an RFC 5987 `filename*`.
///
/// The stem may carry a client-chosen step id, so nothing from it is
/// emitted unquoted: `"` and `\` are escaped, controls and non-ASCII become
/// `_` in the fallback, and the exact name travels percent-encoded.
fn content_disposition(filename: &str) -> HeaderValue {
    let mut fallback = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => fallback.push(c),
            _ => fallback.push('_'),
        }
    }
    let value = format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
