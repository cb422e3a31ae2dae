//! # Embeddings
//!
//! Embedding generation and vector similarity for docsearch.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through a remote
//!   embedding service (Azure OpenAI or any OpenAI-compatible endpoint)
//! - **Similarity**: Cosine similarity with explicit failure modes for
//!   mismatched or zero-magnitude vectors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ServiceConfig ──► HttpEmbeddingProvider ──► Embedding          │
//! │                          │                       │              │
//! │                          ▼                       ▼              │
//! │                 dyn EmbeddingProvider    cosine_similarity      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod similarity;

pub use config::{ServiceConfig, ServiceKind};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HttpEmbeddingProvider};
pub use similarity::{cosine_similarity, dot_product, magnitude};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (text-embedding-ada-002).
pub const DEFAULT_DIMENSION: usize = 1536;
