//! Error types for the assist service client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to the assist service.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured base URL could not be parsed or joined.
    #[error("Invalid assist service URL: {0}")]
    InvalidUrl(String),

    /// The endpoint was unreachable or the request timed out.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned {status}{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Rejected {
        url: String,
        status: u16,
        message: Option<String>,
    },

    /// The endpoint answered 2xx but the body did not match the expected shape.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    /// Returns true for transport-level failures (unreachable endpoint, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns the HTTP status if the remote rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
