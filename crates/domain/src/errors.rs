//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Bibsync
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BibsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// An HTTP error status surfaced by the remote API. The status is kept
    /// so the batch drivers can distinguish transient server failures (5xx,
    /// retried exactly once) from client request errors (4xx, recorded
    /// against the row).
    #[error("API request failed with HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The response body could not be decoded as the expected schema.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// A buffer was misused (duplicate add, add to an occupied single-record
    /// slot, or processing a wrongly sized buffer). Indicates a caller bug.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BibsyncError {
    /// Whether this is a server-side (5xx) HTTP failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (500..=599).contains(status))
    }

    /// Whether this is a client-side (4xx) HTTP failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (400..=499).contains(status))
    }
}

/// Result type alias for Bibsync operations
pub type Result<T> = std::result::Result<T, BibsyncError>;
