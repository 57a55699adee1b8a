//! `GET /health`: liveness plus the converter this instance will launch.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Reports the server version and the configured converter.
///
/// `converter.project_root_present` is `false` when the project root the
/// converter runs from does not exist; conversions will then fail with a
/// launch error even though the server itself is up.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up; converter settings attached", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cfg = &state.config;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "converter": {
            "python": cfg.python.display().to_string(),
            "module": cfg.converter_module,
            "timeout_secs": cfg.converter_timeout.as_secs(),
            "project_root_present": cfg.project_root.is_dir(),
        },
    }))
}
