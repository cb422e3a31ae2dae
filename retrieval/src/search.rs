//! Query-time ranking of stored rows by cosine similarity.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use docsearch_embeddings::{EmbeddingError, EmbeddingProvider, cosine_similarity};
use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::store::{DocumentRow, DocumentStore};

/// A stored row together with its score for one query.
///
/// Borrowed from the store; the store itself is never annotated.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankedRow<'a> {
    /// The matched row.
    pub row: &'a DocumentRow,

    /// Position of the row in the store.
    pub position: usize,

    /// Cosine similarity between the row and the query.
    pub similarity: f32,
}

/// Score every row against `query` and return the `top_n` best, highest
/// similarity first. Rows with equal scores keep their store order.
pub fn rank<'a>(
    store: &'a DocumentStore,
    query: &[f32],
    top_n: usize,
) -> Result<Vec<RankedRow<'a>>> {
    if top_n == 0 {
        return Err(RetrievalError::InvalidTopN);
    }

    let mut ranked = store
        .iter()
        .enumerate()
        .map(|(position, row)| {
            Ok(RankedRow {
                row,
                position,
                similarity: cosine_similarity(&row.embedding, query)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Vec::sort_by_key is stable.
    ranked.sort_by_key(|r| Reverse(OrderedFloat(r.similarity)));
    ranked.truncate(top_n);

    Ok(ranked)
}

/// The entry with the highest similarity; the earliest one on ties.
pub fn best_match<'r, 'a>(ranked: &'r [RankedRow<'a>]) -> Result<&'r RankedRow<'a>> {
    let mut best: Option<&RankedRow<'a>> = None;
    for candidate in ranked {
        match best {
            Some(current) if candidate.similarity <= current.similarity => {}
            _ => best = Some(candidate),
        }
    }
    best.ok_or(RetrievalError::EmptyResult)
}

/// Embeds queries and ranks a [`DocumentStore`] against them.
///
/// Holds no per-query state, so one retriever can serve concurrent searches
/// over a shared store.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,

    /// Upper bound on the query embedding call.
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever with the default 30 second embedding timeout.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the timeout for the query embedding call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Embed `query` and return the `top_n` most similar rows.
    ///
    /// The ingestion token ceiling is not applied to `query`; an oversized
    /// query is sent as-is and any rejection by the service is returned as an
    /// error. A failed query embedding aborts the search.
    pub async fn search<'a>(
        &self,
        store: &'a DocumentStore,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<RankedRow<'a>>> {
        if top_n == 0 {
            return Err(RetrievalError::InvalidTopN);
        }

        debug!("Searching {} rows for: {query}", store.len());

        let query_vector = embed_with_timeout(self.provider.as_ref(), query, self.timeout).await?;
        let results = rank(store, &query_vector, top_n)?;

        info!(
            "Search returned {} of {} rows (top_n = {top_n})",
            results.len(),
            store.len()
        );
        Ok(results)
    }
}

/// Embed `text`, failing with [`EmbeddingError::Timeout`] if the provider
/// takes longer than `timeout`.
pub(crate) async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> std::result::Result<Vec<f32>, EmbeddingError> {
    match tokio::time::timeout(timeout, provider.embed_text(text)).await {
        Ok(result) => result,
        Err(_) => Err(EmbeddingError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}
