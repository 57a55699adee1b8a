//! PDF → presentation conversion endpoint.
//!
//! `POST /api/convert` is a single synchronous request/response cycle: the
//! upload is staged, the converter runs to completion (or times out) and the
//! artifact or a classified error is returned in the same response. No job
//! identity outlives the request.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::Router;
use bytes::BytesMut;
use deckshift_core::{ConversionOptions, ConversionRequest, ErrorBody, UploadedFile};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::response::OutcomeResponse;
use crate::schemas::ConvertUpload;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(convert), components(schemas(ConvertUpload, ErrorBody)))]
pub struct ConvertApi;

/// Register conversion routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/convert", post(convert))
}

/// Convert an uploaded PDF slide deck (`POST /api/convert`).
///
/// On success the response body is the presentation file itself, offered as
/// an attachment named after the upload with `.pdf` replaced by `.pptx`.
#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "convert",
    request_body(content = ConvertUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted presentation", content_type = "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
        (status = 400, description = "Missing file or not a PDF", body = ErrorBody),
        (status = 422, description = "Converter rejected the input", body = ErrorBody),
        (status = 500, description = "Converter could not run or produced nothing", body = ErrorBody),
    )
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<OutcomeResponse, ServerError> {
    let request = read_request(&mut multipart, state.service.max_upload_bytes()).await?;
    Ok(OutcomeResponse(state.service.handle(request).await))
}

/// Collect the `file` and `use_llm` fields; other fields are ignored.
///
/// Reading stops as soon as the file exceeds `max_bytes`; the oversized
/// payload is then rejected by the service's validation step.
async fn read_request(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ConversionRequest, ServerError> {
    let mut request = ConversionRequest::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if request.file.is_none() => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let mut payload = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    payload.extend_from_slice(&chunk);
                    if payload.len() > max_bytes {
                        break;
                    }
                }
                debug!(file_name = %file_name, size_bytes = payload.len(), "received file upload");

                let oversized = payload.len() > max_bytes;
                request.file = Some(UploadedFile {
                    file_name,
                    payload: payload.freeze(),
                });
                if oversized {
                    return Ok(request);
                }
            }
            Some("use_llm") => {
                let value = field.text().await?;
                request.options = ConversionOptions {
                    use_llm: is_truthy(&value),
                };
            }
            _ => {}
        }
    }

    Ok(request)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
