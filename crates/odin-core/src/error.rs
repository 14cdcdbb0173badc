//! Error types for ODIN

/// Result type alias using ODIN's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ODIN operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A message or field failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem errors from save/load
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes that do not match the message schema
    #[error("serialization error: {0}")]
    Serialization(String),

    /// JSON conversion errors
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}
