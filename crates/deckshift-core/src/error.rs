use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while preparing the per-request scratch workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The scratch root could not be created.
    #[error("failed to create scratch directory '{path}': {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The uploaded payload could not be written to the staged input path.
    #[error("failed to stage upload at '{path}': {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The converter could not be run to completion.
///
/// Returned by [`crate::invoker::Converter::run`]; a converter that ran and
/// exited non-zero is *not* a launch failure.
#[derive(Debug, Error)]
pub enum LaunchFailure {
    /// The process could not be spawned (binary missing, permission denied, ...).
    #[error("failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed after it was spawned.
    #[error("failed to wait for converter: {0}")]
    Wait(#[source] std::io::Error),

    /// The wall-clock bound expired; the child has been killed.
    #[error("converter timed out after {}s and was terminated", .0.as_secs())]
    TimedOut(Duration),
}
