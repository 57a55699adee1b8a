//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use deckshift_core::ConversionService;

use crate::config::Config;

/// State shared across all HTTP handlers.
///
/// There is no mutable state shared between requests; each conversion gets
/// its own workspace and child process.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Stages uploads, runs the converter and classifies the result.
    pub service: ConversionService,
}
