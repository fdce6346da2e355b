//! Error types for the Domoticz bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the bridge
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Hub request could not be completed (transport, HTTP status, parse)
    #[error("hub error: {0}")]
    Hub(String),

    /// Hub answered but reported a non-OK command status
    #[error("hub rejected command: status {0}")]
    HubStatus(String),

    /// Inbound request is missing required fields
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Inbound namespace is not handled by the bridge
    #[error("unsupported namespace: {0}")]
    UnsupportedNamespace(String),

    /// Authorization grant exchange failed
    #[error("grant error: {0}")]
    Grant(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the error should be surfaced to the caller as a bad request
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::UnsupportedNamespace(_))
    }
}
