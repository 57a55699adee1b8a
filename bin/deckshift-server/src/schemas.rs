//! OpenAPI-only request schemas.

use serde::Deserialize;
use utoipa::ToSchema;

/// Multipart form accepted by `POST /api/convert`.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertUpload {
    /// The slide deck; its file name must end in `.pdf`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Enable LLM-assisted layout analysis (`true`, `1` or `on`).
    pub use_llm: Option<bool>,
}
