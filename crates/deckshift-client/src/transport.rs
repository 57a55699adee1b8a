//! HTTP transport to the conversion endpoint.

use std::path::{Component, Path};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deckshift_core::{derive_artifact_name, has_accepted_extension, ErrorBody};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::ClientError;

/// Shown when an error response carries no usable JSON body.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed.";

/// A deck selected for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub payload: Bytes,
    pub use_llm: bool,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: payload.into(),
            use_llm: false,
        }
    }

    /// Read a local `.pdf` file.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidInput(format!("{} has no file name", path.display())))?
            .to_owned();
        if !has_accepted_extension(&file_name) {
            return Err(ClientError::InvalidInput(format!(
                "{file_name} is not a PDF file"
            )));
        }
        let payload = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, payload))
    }
}

/// What the endpoint answered, when it answered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    /// 2xx with the artifact as body.
    Artifact { bytes: Bytes, file_name: String },
    /// Non-2xx with a classified `{ error, detail?, hint? }` body.
    Rejected { status: u16, body: ErrorBody },
}

#[async_trait]
pub trait ConversionTransport: Send + Sync {
    /// Submit one upload. `Err` means a transport-level fault; any HTTP
    /// response, success or not, is `Ok`.
    async fn submit(&self, upload: &Upload) -> Result<ServerReply, ClientError>;
}

/// Posts the upload as `multipart/form-data` to `<server>/api/convert`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Longer than the server's converter bound so its timeout response wins.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

    pub fn new(server: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, server))
    }

    /// Use a preconfigured client (proxy, TLS, timeout settings).
    pub fn with_client(client: reqwest::Client, server: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/convert", server.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConversionTransport for HttpTransport {
    async fn submit(&self, upload: &Upload) -> Result<ServerReply, ClientError> {
        let part = Part::bytes(upload.payload.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")?;
        let mut form = Form::new().part("file", part);
        if upload.use_llm {
            form = form.text("use_llm", "true");
        }

        debug!(endpoint = %self.endpoint, file_name = %upload.file_name, "submitting upload");
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();

        if status.is_success() {
            let file_name = response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(filename_from_disposition)
                .unwrap_or_else(|| derive_artifact_name(&upload.file_name));
            let bytes = response.bytes().await?;
            return Ok(ServerReply::Artifact { bytes, file_name });
        }

        let raw = response.bytes().await?;
        Ok(ServerReply::Rejected {
            status: status.as_u16(),
            body: parse_error_body(&raw),
        })
    }
}

/// Parse `{ error, detail?, hint? }`, falling back to a generic message.
pub fn parse_error_body(raw: &[u8]) -> ErrorBody {
    serde_json::from_slice(raw).unwrap_or_else(|_| ErrorBody::new(GENERIC_FAILURE_MESSAGE))
}

static FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";\n]+)"?"#).expect("static regex is valid")
});

/// Extract and percent-decode the file name from a `Content-Disposition` value.
///
/// The result is always a bare file name; see [`local_file_name`].
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let raw = FILENAME.captures(value)?.get(1)?.as_str().trim();
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    local_file_name(&decoded)
}

/// Accept a server-supplied name only if it is a single plain path component.
///
/// Empty names, absolute paths, `.`/`..` and anything containing a separator
/// yield `None`, so the caller falls back to a name it derived itself.
pub fn local_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part.to_str().map(str::to_owned),
        _ => None,
    }
}
