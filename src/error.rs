//! Error types for the update channel and mock feed.

/// Errors surfaced by the library. None of them are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not connected")]
    NotConnected,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown vat: {0}")]
    UnknownVat(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
