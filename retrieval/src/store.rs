//! In-memory document store.

use docsearch_embeddings::{Embedding, magnitude};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};

/// A normalized document section paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    /// Normalized text.
    pub text: String,

    /// Embedding of `text`.
    pub embedding: Embedding,
}

impl DocumentRow {
    /// Create a new row.
    pub fn new(text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// Ordered collection of rows sharing one embedding dimension.
///
/// Rows are append-only and immutable once stored. Every embedding has the
/// store's dimension and a non-zero magnitude, so any row can be scored
/// against a valid query vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    rows: Vec<DocumentRow>,

    /// Fixed up front, or by the first row pushed.
    dimension: Option<usize>,
}

impl DocumentStore {
    /// Create an empty store whose dimension is set by the first row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that only accepts embeddings of `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            rows: Vec::new(),
            dimension: Some(dimension),
        }
    }

    /// Append a row.
    pub fn push(&mut self, row: DocumentRow) -> Result<()> {
        let index = self.rows.len();
        let actual = row.embedding.len();

        if let Some(expected) = self.dimension {
            if actual != expected {
                return Err(RetrievalError::DimensionMismatch {
                    index,
                    expected,
                    actual,
                });
            }
        }

        if magnitude(&row.embedding) == 0.0 {
            return Err(RetrievalError::DegenerateEmbedding { index });
        }

        self.dimension = Some(actual);
        self.rows.push(row);
        debug!("Stored row {index} ({actual} dimensions)");

        Ok(())
    }

    /// Embedding dimension, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[DocumentRow] {
        &self.rows
    }

    /// Get a row by position.
    pub fn get(&self, index: usize) -> Option<&DocumentRow> {
        self.rows.get(index)
    }

    /// Iterate over rows in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, DocumentRow> {
        self.rows.iter()
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> IntoIterator for &'a DocumentStore {
    type Item = &'a DocumentRow;
    type IntoIter = std::slice::Iter<'a, DocumentRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
