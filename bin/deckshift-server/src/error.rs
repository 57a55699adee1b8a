//! Unified server error type.
//!
//! Covers faults raised by the HTTP layer before a request reaches
//! [`deckshift_core::ConversionService::handle`] (e.g. a malformed multipart
//! body). Conversion outcomes themselves are rendered by
//! [`crate::response::OutcomeResponse`].
//!
//! Every variant renders as the same `{ error }` shape the conversion
//! endpoint uses for validation failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deckshift_core::ErrorBody;
use thiserror::Error;
use tracing::warn;

/// All errors that can occur in the deckshift-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::BadRequest(m) => {
                warn!(error = %m, "rejected request");
                (StatusCode::BAD_REQUEST, m)
            }
        };
        (status, Json(ErrorBody::new(client_message))).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ServerError::BadRequest(format!("Failed to read multipart body: {}", e.body_text()))
    }
}
