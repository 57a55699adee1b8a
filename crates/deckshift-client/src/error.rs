use thiserror::Error;

/// Errors that can be returned by deckshift-client operations.
///
/// A classified error *response* from the server is not a `ClientError`;
/// it arrives as [`crate::transport::ServerReply::Rejected`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request failed (connection refused, reset, timeout, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was rejected locally before submitting.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
