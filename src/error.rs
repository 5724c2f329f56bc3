//! Bridge Error Types

use thiserror::Error;

/// Errors raised while resolving clients or executing requests against the store
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Client construction failed (bad URI, unusable credentials, no runtime)
    #[error("Connection to {uri} failed: {reason}")]
    Connection { uri: String, reason: String },

    /// The store answered a query with a non-empty error string
    #[error("{0}")]
    QueryFailed(String),

    /// The store rejected a line-protocol write
    #[error("Write rejected with status {status}: {message}")]
    Write { status: u16, message: String },

    /// Network-level failure talking to the store
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unexpected HTTP status that carried no store error message
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Store response body could not be decoded
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client handle was closed before use
    #[error("Client for {endpoint} is closed")]
    ClientClosed { endpoint: String },

    /// Background work of a client failed while closing
    #[error("Client for {endpoint} failed to shut down: {reason}")]
    Shutdown { endpoint: String, reason: String },

    /// The request cannot be executed as given
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl BridgeError {
    pub(crate) fn connection(uri: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BridgeError::Connection {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the store's own error reporting
    /// rather than from the transport or the local client.
    pub fn is_store_reported(&self) -> bool {
        matches!(self, BridgeError::QueryFailed(_) | BridgeError::Write { .. })
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
