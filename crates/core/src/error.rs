//! Unified error types for the tracking SDK.
//!
//! Tracking is best-effort infrastructure: most call sites log these errors
//! and carry on rather than propagating them to page code. The favourites
//! API is the exception, since its responses are user-visible state.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the tracking SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// Persisted key-value storage failed (quota, permissions, disabled).
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unusable configuration (API url/key).
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP delivery failed (connect error, non-2xx response).
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller asked for something that requires analytics consent.
    #[error("analytics consent has not been given")]
    ConsentRequired,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
