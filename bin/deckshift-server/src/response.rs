//! Serialization of a [`ConversionOutcome`] into an HTTP response.
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | `Success` | 200 | artifact bytes, attachment disposition |
//! | `ValidationFailure` | 400 | `{ error }` |
//! | `ProcessLaunchFailure` | 500 | `{ error, detail }` |
//! | `ProcessExitFailure` | 422 | `{ error, detail, hint? }` |
//! | `MissingArtifactFailure` | 500 | `{ error }` |

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use deckshift_core::{ConversionOutcome, ARTIFACT_CONTENT_TYPE};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone by JavaScript's `encodeURIComponent`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub struct OutcomeResponse(pub ConversionOutcome);

impl OutcomeResponse {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConversionOutcome::Success { .. } => StatusCode::OK,
            ConversionOutcome::ValidationFailure { .. } => StatusCode::BAD_REQUEST,
            ConversionOutcome::ProcessLaunchFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ConversionOutcome::ProcessExitFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ConversionOutcome::MissingArtifactFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OutcomeResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0 {
            ConversionOutcome::Success {
                artifact,
                artifact_name,
            } => (
                status,
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(ARTIFACT_CONTENT_TYPE),
                    ),
                    (header::CONTENT_DISPOSITION, content_disposition(&artifact_name)),
                ],
                artifact,
            )
                .into_response(),
            failure => match failure.error_body() {
                Some(body) => (status, Json(body)).into_response(),
                None => status.into_response(),
            },
        }
    }
}

/// `attachment; filename="<percent-encoded name>"`.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let encoded = utf8_percent_encode(file_name, FILENAME_ENCODE_SET);
    // The encoded form is pure ASCII without quotes or control characters.
    HeaderValue::try_from(format!("attachment; filename=\"{encoded}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use deckshift_core::FailureCategory;

    #[test]
    fn disposition_matches_encode_uri_component() {
        assert_eq!(
            content_disposition("sample.pptx"),
            "attachment; filename=\"sample.pptx\""
        );
        assert_eq!(
            content_disposition("Q3 deck (final).pptx"),
            "attachment; filename=\"Q3%20deck%20(final).pptx\""
        );
        assert_eq!(
            content_disposition("資料.pptx"),
            "attachment; filename=\"%E8%B3%87%E6%96%99.pptx\""
        );
        assert_eq!(
            content_disposition("a\"b.pptx"),
            "attachment; filename=\"a%22b.pptx\""
        );
    }

    #[test]
    fn statuses_follow_the_outcome() {
        let cases = [
            (
                ConversionOutcome::Success {
                    artifact: Bytes::new(),
                    artifact_name: "a.pptx".into(),
                },
                200,
            ),
            (ConversionOutcome::ValidationFailure { reason: "r".into() }, 400),
            (ConversionOutcome::ProcessLaunchFailure { message: "m".into() }, 500),
            (
                ConversionOutcome::ProcessExitFailure {
                    exit_code: Some(1),
                    category: FailureCategory::ConversionFailed,
                    diagnostic_excerpt: "d".into(),
                    hint: None,
                },
                422,
            ),
            (ConversionOutcome::MissingArtifactFailure, 500),
        ];
        for (outcome, expected) in cases {
            assert_eq!(OutcomeResponse(outcome).status().as_u16(), expected);
        }
    }

    #[test]
    fn success_sets_artifact_headers() {
        let resp = OutcomeResponse(ConversionOutcome::Success {
            artifact: Bytes::from_static(b"PK"),
            artifact_name: "sample.pptx".into(),
        })
        .into_response();
        assert_eq!(resp.headers()[header::CONTENT_TYPE], ARTIFACT_CONTENT_TYPE);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"sample.pptx\""
        );
    }
}
