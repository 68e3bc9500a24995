//! Error types shared by the upstream clients.
//!
//! The API layer maps each variant onto an HTTP status: invalid input is the
//! caller's fault (400), upstream and transport failures are a bad gateway
//! (502), everything else is an internal error (500).

use thiserror::Error;

/// Errors raised while talking to Fusion, the NFT service, Push or a webhook.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Request was well-formed JSON but its content cannot be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream service answered with a non-success status
    #[error("{service} returned status {status}: {body}")]
    Upstream {
        /// Name of the upstream service (e.g. "fusion", "push")
        service: &'static str,
        /// HTTP status code returned by the upstream
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Transport-level failure (connect, timeout, body decode)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Key handling or signature creation failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Subscription store could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Builds an [`RelayError::Upstream`] from a failed response, consuming its body.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY_LEN {
            let mut cut = MAX_ERROR_BODY_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        RelayError::Upstream {
            service,
            status,
            body,
        }
    }

    /// Whether the failure originated outside this process.
    pub fn is_upstream(&self) -> bool {
        matches!(self, RelayError::Upstream { .. } | RelayError::Http(_))
    }
}

/// Upstream error bodies are cut to this many bytes before being reported.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Result alias used by the library modules.
pub type Result<T> = std::result::Result<T, RelayError>;
