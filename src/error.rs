//! Error types for call session orchestration
//!
//! Most failures in this crate never reach the presentation layer as error
//! values: signaling drops and ICE failures collapse into the connection
//! state machine reaching `Failed` or `Disconnected`, followed by the
//! auto-dismiss. The variants here exist for the seams where a caller can
//! act on the error (construction, configuration, engine calls).

use thiserror::Error;

/// Error type for call session operations
#[derive(Debug, Error)]
pub enum Error {
    /// Signaling channel could not be established or was dropped
    #[error("signaling error: {0}")]
    Signaling(String),

    /// SDP creation or application failed
    #[error("negotiation error: {0}")]
    Negotiation(String),

    /// ICE connectivity checks failed
    #[error("ice failure: {0}")]
    IceFailure(String),

    /// Explicit local hangup
    #[error("call aborted by local user")]
    UserAbort,

    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal channel closed or already consumed
    #[error("channel error: {0}")]
    Channel(String),

    /// JSON serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a signaling error
    pub fn signaling(msg: impl Into<String>) -> Self {
        Error::Signaling(msg.into())
    }

    /// Create a negotiation error
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Error::Negotiation(msg.into())
    }

    /// Create an ICE failure error
    pub fn ice_failure(msg: impl Into<String>) -> Self {
        Error::IceFailure(msg.into())
    }

    /// Create a channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        Error::Channel(msg.into())
    }
}

/// Result type for call session operations
pub type Result<T> = std::result::Result<T, Error>;
