//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, body limit)
//! - Optional OpenAPI document (disable with `DECKSHIFT_ENABLE_OPENAPI=false`)
//! - Health / heartbeat route
//! - The conversion endpoint under `/api`

mod convert;
pub mod doc;
mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{self},
    routing::get,
    Json, Router,
};
use crate::middleware::{cors, trace};
use crate::state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;

/// Room for multipart boundaries and the small text fields next to the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let body_limit = state
        .service
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", convert::router());

    if state.config.enable_openapi {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || {
                let doc = api_doc.clone();
                async move { Json(doc) }
            }),
        );
    }

    app
        .layer(DefaultBodyLimit::max(body_limit))
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}
