use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors raised while setting up or running the relay.
///
/// Per-record problems (malformed JSON, unrecognized tags) never show
/// up here: those records are dropped silently at the connection
/// handler.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("native host {0} is not registered")]
    UnknownHost(String),

    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
