use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::classifier::FailureCategory;

/// The single result of handling one conversion request.
///
/// Exactly one variant is produced per request.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    /// The converter produced an artifact.
    Success { artifact: Bytes, artifact_name: String },
    /// The upload was rejected before anything was staged.
    ValidationFailure { reason: String },
    /// The converter could not be run (or an infrastructure fault occurred).
    ProcessLaunchFailure { message: String },
    /// The converter ran and exited non-zero.
    ProcessExitFailure {
        exit_code: Option<i32>,
        category: FailureCategory,
        diagnostic_excerpt: String,
        hint: Option<String>,
    },
    /// The converter exited 0 but wrote nothing at the output path.
    MissingArtifactFailure,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionOutcome::Success { .. } => "success",
            ConversionOutcome::ValidationFailure { .. } => "validation_failure",
            ConversionOutcome::ProcessLaunchFailure { .. } => "launch_failure",
            ConversionOutcome::ProcessExitFailure { .. } => "exit_failure",
            ConversionOutcome::MissingArtifactFailure => "missing_artifact",
        }
    }

    /// The JSON error payload for this outcome, or `None` on success.
    pub fn error_body(&self) -> Option<ErrorBody> {
        let body = match self {
            ConversionOutcome::Success { .. } => return None,
            ConversionOutcome::ValidationFailure { reason } => ErrorBody::new(reason.clone()),
            ConversionOutcome::ProcessLaunchFailure { message } => ErrorBody {
                error: "Failed to run the converter. Check the Python environment.".into(),
                detail: Some(message.clone()),
                hint: None,
            },
            ConversionOutcome::ProcessExitFailure {
                category,
                diagnostic_excerpt,
                hint,
                ..
            } => ErrorBody {
                error: category.message().into(),
                detail: Some(diagnostic_excerpt.clone()),
                hint: hint.clone(),
            },
            ConversionOutcome::MissingArtifactFailure => {
                ErrorBody::new("The converter did not produce an output file.")
            }
        };
        Some(body)
    }
}

/// JSON body of every non-success response: `{ error, detail?, hint? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub error: String,
    /// Raw diagnostic text (OS error or converter stderr excerpt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Actionable remediation, when the failure was recognised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            hint: None,
        }
    }
}
