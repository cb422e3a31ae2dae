//! # Retrieval
//!
//! Builds a document store from a text corpus and ranks it against user
//! queries by cosine similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Ingestion                               │
//! │  corpus.csv ──► normalize_text ──► TokenEstimator ──► embed     │
//! │                                      (ceiling)          │       │
//! │                                                         ▼       │
//! │                                                  DocumentStore  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                         Retrieval                               │
//! │  query ──► embed ──► rank(store) ──► Vec<RankedRow> ──► best    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docsearch_retrieval::{Ingestor, Retriever, TiktokenEstimator, best_match};
//!
//! let ingestor = Ingestor::new(provider.clone(), Arc::new(TiktokenEstimator::cl100k()?));
//! let report = ingestor.ingest(&texts).await?;
//!
//! let retriever = Retriever::new(provider);
//! let results = retriever.search(&report.store, "open questions", 4).await?;
//! let best = best_match(&results)?;
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod search;
pub mod store;
pub mod table;
pub mod tokens;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, SearchConfig};
pub use error::{Result, RetrievalError};
pub use ingest::{
    FailurePolicy, IngestConfig, IngestReport, IngestStats, Ingestor, SkipReason, SkippedRow,
};
pub use normalize::normalize_text;
pub use search::{RankedRow, Retriever, best_match, rank};
pub use store::{DocumentRow, DocumentStore};
pub use table::TableConfig;
pub use tokens::{CharRatioEstimator, TiktokenEstimator, TokenEstimator, TokenizerKind};

// Re-export from dependencies for convenience
pub use docsearch_embeddings::{
    EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider, ServiceConfig,
};
