use crate::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let wildcard = || {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any)
            .expose_headers([axum::http::header::CONTENT_DISPOSITION])
    };

    let Some(origins_str) = &state.config.cors_allowed_origins else {
        // Wildcard – suitable for development; set DECKSHIFT_CORS_ORIGINS in production.
        return wildcard();
    };

    // Parse the comma-separated origin list and build a restrictive layer.
    let origins: Vec<axum::http::HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        wildcard()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers(Any)
            .allow_methods(Any)
            .expose_headers([axum::http::header::CONTENT_DISPOSITION])
    }
}
