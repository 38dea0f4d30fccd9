//! Reference voice management.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;

use voxgate_core::{ReferenceError, ReferenceId, ValidationError};

use crate::dto::{
    AddReferenceBody, AddReferenceResponse, DeleteReferenceRequest, DeleteReferenceResponse,
    ListReferencesResponse, UpdateReferenceRequest, UpdateReferenceResponse,
};
use crate::error::HttpError;
use crate::negotiate::{Negotiated, Wire, WireBody};
use crate::state::AppState;

/// Reference upload as multipart form data or a JSON / MessagePack body.
#[derive(Debug)]
pub struct AddReferenceForm(pub AddReferenceBody);

impl<S> FromRequest<S> for AddReferenceForm
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let WireBody(body) = WireBody::from_request(req, state).await?;
            return Ok(Self(body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| HttpError::Validation(e.body_text()))?;

        let (mut id, mut audio, mut text) = (None, None, None);
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("id") => id = Some(field.text().await.map_err(multipart_error)?),
                Some("text") => text = Some(field.text().await.map_err(multipart_error)?),
                Some("audio") => {
                    audio = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
                }
                _ => {}
            }
        }

        Ok(Self(AddReferenceBody {
            id: id.ok_or(ValidationError::Empty { field: "Reference ID" })?,
            audio: audio.ok_or(ValidationError::Empty { field: "Audio file" })?,
            text: text.ok_or(ValidationError::Empty { field: "Reference text" })?,
        }))
    }
}

fn multipart_error(e: MultipartError) -> HttpError {
    HttpError::Validation(e.body_text())
}

fn non_blank(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Save a new reference voice.
pub async fn add(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    AddReferenceForm(body): AddReferenceForm,
) -> Result<Wire<AddReferenceResponse>, HttpError> {
    non_blank(&body.id, "Reference ID")?;
    non_blank(&body.text, "Reference text")?;
    if body.audio.is_empty() {
        return Err(ValidationError::Empty { field: "Audio file" }.into());
    }

    let id = ReferenceId::parse(body.id)?;
    state.references.add(&id, &body.audio, &body.text).await?;
    tracing::info!(target: "voxgate.http", reference_id = %id, bytes = body.audio.len(), "Reference added");

    Ok(Wire(
        format,
        AddReferenceResponse {
            success: true,
            message: format!("Reference voice '{id}' added successfully"),
            reference_id: id.into_inner(),
        },
    ))
}

/// List saved reference ids.
pub async fn list(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
) -> Result<Wire<ListReferencesResponse>, HttpError> {
    let reference_ids: Vec<String> = state
        .references
        .list()
        .await?
        .into_iter()
        .map(ReferenceId::into_inner)
        .collect();

    Ok(Wire(
        format,
        ListReferencesResponse {
            success: true,
            message: format!("Found {} reference voices", reference_ids.len()),
            reference_ids,
        },
    ))
}

/// Delete a saved reference.
pub async fn delete(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    WireBody(req): WireBody<DeleteReferenceRequest>,
) -> Result<Wire<DeleteReferenceResponse>, HttpError> {
    non_blank(&req.reference_id, "Reference ID")?;
    let id = existing_id(&req.reference_id)?;
    state.references.delete(&id).await?;
    tracing::info!(target: "voxgate.http", reference_id = %id, "Reference deleted");

    Ok(Wire(
        format,
        DeleteReferenceResponse {
            success: true,
            message: format!("Reference voice '{id}' deleted successfully"),
            reference_id: id.into_inner(),
        },
    ))
}

/// Rename a saved reference.
pub async fn update(
    State(state): State<AppState>,
    Negotiated(format): Negotiated,
    WireBody(req): WireBody<UpdateReferenceRequest>,
) -> Result<Wire<UpdateReferenceResponse>, HttpError> {
    non_blank(&req.old_reference_id, "Old reference ID")?;
    non_blank(&req.new_reference_id, "New reference ID")?;
    if req.old_reference_id == req.new_reference_id {
        return Err(HttpError::Validation(
            "New reference ID must be different from old reference ID".into(),
        ));
    }

    let old = existing_id(&req.old_reference_id)?;
    let new = ReferenceId::parse(req.new_reference_id)?;
    state.references.rename(&old, &new).await?;
    tracing::info!(target: "voxgate.http", from = %old, to = %new, "Reference renamed");

    Ok(Wire(
        format,
        UpdateReferenceResponse {
            success: true,
            message: format!("Reference voice renamed from '{old}' to '{new}' successfully"),
            old_reference_id: old.into_inner(),
            new_reference_id: new.into_inner(),
        },
    ))
}

/// An id that must already be stored; a malformed id cannot be, so it is
/// reported as not found.
fn existing_id(raw: &str) -> Result<ReferenceId, HttpError> {
    ReferenceId::parse(raw).map_err(|_| ReferenceError::NotFound(raw.to_owned()).into())
}
