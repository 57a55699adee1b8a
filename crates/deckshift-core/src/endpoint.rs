//! Conversion Endpoint logic, independent of the HTTP transport.
//!
//! [`ConversionService::handle`] runs a strictly linear sequence:
//!
//! 1. **Validate** – name ends in `.pdf` and payload is within the size cap.
//! 2. **Stage** – allocate a [`Workspace`] and write the upload to its input path.
//! 3. **Convert** – run the [`Converter`]; non-zero exits are classified.
//! 4. **Verify** – the output path must exist even after a zero exit.
//! 5. **Deliver** – read the artifact and derive its download name.
//!
//! Cleanup is the workspace's `Drop`: it runs when `convert_staged` returns,
//! whichever step ended it, and also if the future is dropped mid-flight.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::classifier::classify;
use crate::invoker::{ConversionOptions, Converter};
use crate::naming::{derive_artifact_name, has_accepted_extension};
use crate::outcome::ConversionOutcome;
use crate::workspace::{ScratchDir, Workspace};

/// Message returned when the upload is missing or not a PDF.
pub const NOT_A_PDF_MESSAGE: &str = "Please choose a PDF file.";

/// An uploaded deck.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// `None` when the form carried no `file` field.
    pub file: Option<UploadedFile>,
    pub options: ConversionOptions,
}

/// Opaque upload payload and the client-declared file name.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub payload: Bytes,
}

impl ConversionRequest {
    pub fn new(file_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            file: Some(UploadedFile {
                file_name: file_name.into(),
                payload: payload.into(),
            }),
            options: ConversionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Drives workspace, converter and classifier for one request at a time.
///
/// Cheap to clone; concurrent calls share nothing but the scratch root.
#[derive(Clone)]
pub struct ConversionService {
    scratch: ScratchDir,
    converter: Arc<dyn Converter>,
    max_upload_bytes: usize,
}

impl std::fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionService")
            .field("scratch", &self.scratch)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ConversionService {
    pub fn new(scratch: ScratchDir, converter: Arc<dyn Converter>) -> Self {
        Self {
            scratch,
            converter,
            max_upload_bytes: usize::MAX,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    pub async fn handle(&self, request: ConversionRequest) -> ConversionOutcome {
        let Some(file) = request.file else {
            return validation_failure(NOT_A_PDF_MESSAGE);
        };
        if !has_accepted_extension(&file.file_name) {
            info!(file_name = %file.file_name, "rejected upload: not a PDF");
            return validation_failure(NOT_A_PDF_MESSAGE);
        }
        if file.payload.len() > self.max_upload_bytes {
            info!(size_bytes = file.payload.len(), "rejected upload: too large");
            return validation_failure(format!(
                "File too large: {} bytes exceeds the maximum of {} bytes.",
                file.payload.len(),
                self.max_upload_bytes
            ));
        }

        let workspace = match self.scratch.allocate().await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(error = %e, "workspace allocation failed");
                return ConversionOutcome::ProcessLaunchFailure {
                    message: e.to_string(),
                };
            }
        };

        let outcome = self.convert_staged(&workspace, &file, request.options).await;
        info!(
            token = %workspace.token(),
            file_name = %file.file_name,
            outcome = outcome.kind(),
            "conversion finished"
        );
        workspace.release();
        outcome
    }

    async fn convert_staged(
        &self,
        workspace: &Workspace,
        file: &UploadedFile,
        options: ConversionOptions,
    ) -> ConversionOutcome {
        if let Err(e) = workspace.stage(&file.payload).await {
            warn!(error = %e, "staging failed");
            return ConversionOutcome::ProcessLaunchFailure {
                message: e.to_string(),
            };
        }

        let result = match self
            .converter
            .run(workspace.input_path(), workspace.output_path(), options)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "converter launch failed");
                return ConversionOutcome::ProcessLaunchFailure {
                    message: e.to_string(),
                };
            }
        };

        if !result.success() {
            return classify(result.exit_code, &result.diagnostic);
        }

        match tokio::fs::read(workspace.output_path()).await {
            Ok(artifact) => ConversionOutcome::Success {
                artifact: Bytes::from(artifact),
                artifact_name: derive_artifact_name(&file.file_name),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(token = %workspace.token(), "converter exited 0 without output");
                ConversionOutcome::MissingArtifactFailure
            }
            Err(e) => {
                warn!(error = %e, "reading artifact failed");
                ConversionOutcome::ProcessLaunchFailure {
                    message: format!("failed to read converter output: {e}"),
                }
            }
        }
    }
}

fn validation_failure(reason: impl Into<String>) -> ConversionOutcome {
    ConversionOutcome::ValidationFailure {
        reason: reason.into(),
    }
}
