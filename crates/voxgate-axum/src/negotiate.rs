//! Content-format negotiation.
//!
//! Request bodies are decoded according to their `Content-Type`. Response
//! bodies are encoded per the `serialization` query parameter, then the
//! `Accept` header, then the request's `Content-Type`, falling back to JSON.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HttpError;

pub const MSGPACK: &str = "application/msgpack";
pub const JSON: &str = "application/json";

/// Wire encoding of structured bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    MsgPack,
}

impl WireFormat {
    /// Match a media type such as `application/json; charset=utf-8`.
    pub fn from_media_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        let essence = essence.to_ascii_lowercase();
        if essence.ends_with("msgpack") {
            Some(Self::MsgPack)
        } else if essence == JSON || essence.ends_with("+json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// First recognised entry of an `Accept` header, if any.
    fn from_accept(value: &str) -> Option<Self> {
        value.split(',').find_map(Self::from_media_type)
    }

    fn from_name(name: &str) -> Result<Self, HttpError> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" => Ok(Self::MsgPack),
            other => Err(HttpError::Validation(format!(
                "Unsupported serialization '{other}', expected json or msgpack"
            ))),
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => JSON,
            Self::MsgPack => MSGPACK,
        }
    }

    pub fn decode<T: DeserializeOwned>(self, body: &[u8]) -> Result<T, HttpError> {
        match self {
            Self::Json => serde_json::from_slice(body)
                .map_err(|e| HttpError::Validation(format!("Invalid JSON body: {e}"))),
            Self::MsgPack => rmp_serde::from_slice(body)
                .map_err(|e| HttpError::Validation(format!("Invalid MessagePack body: {e}"))),
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, HttpError> {
        match self {
            Self::Json => serde_json::to_vec(value)
                .map_err(|e| HttpError::Internal(format!("Failed to encode response: {e}"))),
            Self::MsgPack => rmp_serde::to_vec_named(value)
                .map_err(|e| HttpError::Internal(format!("Failed to encode response: {e}"))),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Format of the request body; JSON when no `Content-Type` is given.
pub fn request_format(headers: &HeaderMap) -> Result<WireFormat, HttpError> {
    match header_str(headers, &header::CONTENT_TYPE) {
        None => Ok(WireFormat::Json),
        Some(value) => WireFormat::from_media_type(value)
            .ok_or_else(|| HttpError::Validation(format!("Unsupported content type '{value}'"))),
    }
}

/// Choose the response format for a request.
pub fn response_format(
    serialization: Option<&str>,
    headers: &HeaderMap,
) -> Result<WireFormat, HttpError> {
    if let Some(name) = serialization {
        return WireFormat::from_name(name);
    }
    let from_headers = header_str(headers, &header::ACCEPT)
        .and_then(WireFormat::from_accept)
        .or_else(|| header_str(headers, &header::CONTENT_TYPE).and_then(WireFormat::from_media_type));
    Ok(from_headers.unwrap_or_default())
}

// ── Extractors ──────────────────────────────────────────────────────────────

/// Request body decoded per its `Content-Type`.
#[derive(Debug)]
pub struct WireBody<T>(pub T);

impl<S, T> FromRequest<S> for WireBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let format = request_format(req.headers())?;
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| HttpError::Validation(format!("Failed to read body: {e}")))?;
        format.decode(&body).map(WireBody)
    }
}

#[derive(Debug, serde::Deserialize)]
struct SerializationQuery {
    serialization: Option<String>,
}

/// Response format negotiated for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated(pub WireFormat);

impl<S> FromRequestParts<S> for Negotiated
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let serialization = Query::<SerializationQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.serialization);
        response_format(serialization.as_deref(), &parts.headers).map(Negotiated)
    }
}

// ── Response ────────────────────────────────────────────────────────────────

/// Structured response body in a negotiated format.
#[derive(Debug)]
pub struct Wire<T>(pub WireFormat, pub T);

impl<T: Serialize> IntoResponse for Wire<T> {
    fn into_response(self) -> Response {
        let Self(format, value) = self;
        match format.encode(&value) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()))],
                body,
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn media_types() {
        assert_eq!(WireFormat::from_media_type("application/json"), Some(WireFormat::Json));
        assert_eq!(
            WireFormat::from_media_type("application/json; charset=utf-8"),
            Some(WireFormat::Json)
        );
        assert_eq!(
            WireFormat::from_media_type("application/x-msgpack"),
            Some(WireFormat::MsgPack)
        );
        assert_eq!(WireFormat::from_media_type("text/plain"), None);
    }

    #[test]
    fn query_parameter_wins() {
        let h = headers(&[(header::ACCEPT, "application/json")]);
        assert_eq!(response_format(Some("msgpack"), &h).unwrap(), WireFormat::MsgPack);
        assert!(response_format(Some("xml"), &h).is_err());
    }

    #[test]
    fn accept_then_content_type_then_json() {
        let h = headers(&[
            (header::ACCEPT, "text/html, application/msgpack"),
            (header::CONTENT_TYPE, "application/json"),
        ]);
        assert_eq!(response_format(None, &h).unwrap(), WireFormat::MsgPack);

        let h = headers(&[(header::ACCEPT, "*/*"), (header::CONTENT_TYPE, "application/msgpack")]);
        assert_eq!(response_format(None, &h).unwrap(), WireFormat::MsgPack);

        assert_eq!(response_format(None, &HeaderMap::new()).unwrap(), WireFormat::Json);
    }

    #[test]
    fn request_format_defaults_to_json() {
        assert_eq!(request_format(&HeaderMap::new()).unwrap(), WireFormat::Json);
        let h = headers(&[(header::CONTENT_TYPE, "text/plain")]);
        assert!(matches!(request_format(&h), Err(HttpError::Validation(_))));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = WireFormat::MsgPack.decode::<SerializationQuery>(b"\xc1").unwrap_err();
        assert!(matches!(err, HttpError::Validation(_)));
    }
}
