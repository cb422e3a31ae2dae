//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured (missing key, endpoint or deployment).
    #[error("embedding provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// The service rejected the credentials.
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// API request failed.
    #[error("API request failed ({status}): {message}")]
    ApiRequest { status: u16, message: String },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The call did not complete within the configured timeout.
    #[error("embedding request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector with zero magnitude was used in a similarity computation.
    #[error("degenerate vector: cosine similarity is undefined for zero-magnitude vectors")]
    DegenerateVector,

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether this error came from talking to the embedding service, as
    /// opposed to vector math on already-computed embeddings.
    pub fn is_service_error(&self) -> bool {
        !matches!(
            self,
            Self::DimensionMismatch { .. } | Self::DegenerateVector
        )
    }
}
