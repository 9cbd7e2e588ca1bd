// ABOUTME: Error taxonomy for the export pipeline
// ABOUTME: Separates transport, HTTP, decode, validation, shape and IO failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} on {endpoint}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid JSON from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed API data: {0}")]
    Malformed(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for an authentication rejection from the server.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Http { status: 401 | 403, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
