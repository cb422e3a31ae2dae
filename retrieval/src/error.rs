//! Error types for ingestion and retrieval.

use std::path::PathBuf;

use docsearch_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while building or searching a document store.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error (query embedding, similarity math).
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Embedding a corpus row failed and the batch was aborted.
    #[error("failed to embed row {index} ({preview:?}): {source}")]
    RowFailed {
        index: usize,
        preview: String,
        #[source]
        source: EmbeddingError,
    },

    /// A best match was requested from an empty result set.
    #[error("no results to pick a best match from")]
    EmptyResult,

    /// `top_n` must be at least 1.
    #[error("top_n must be at least 1")]
    InvalidTopN,

    /// An embedding did not match the store's dimension.
    #[error("dimension mismatch at row {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// An embedding with zero magnitude cannot be stored.
    #[error("row {index} has a zero-magnitude embedding")]
    DegenerateEmbedding { index: usize },

    /// A required column is missing from a CSV file.
    #[error("{path}: missing column {column:?}")]
    MissingColumn { path: PathBuf, column: String },

    /// An embedding cell could not be parsed.
    #[error("row {row}: invalid embedding: {message}")]
    InvalidEmbedding { row: usize, message: String },

    /// The tokenizer could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// CSV error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parse error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
