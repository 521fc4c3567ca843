use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors raised by connectors and live links.
///
/// None of these are fatal to the owning component: a failed connect or
/// a broken link only schedules a backoff retry.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The peer was unavailable at attempt time.
    #[error("failed to connect to {peer}: {reason}")]
    ConnectFailed { peer: String, reason: String },

    /// A live link terminated while sending.
    #[error("link to {peer} closed")]
    Closed { peer: String },

    /// Transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized for the wire.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LinkError {
    pub fn connect_failed(peer: impl Into<String>, reason: impl ToString) -> Self {
        LinkError::ConnectFailed {
            peer: peer.into(),
            reason: reason.to_string(),
        }
    }

    pub fn closed(peer: impl Into<String>) -> Self {
        LinkError::Closed { peer: peer.into() }
    }
}
