//! CSV input and output for corpora, embedded stores and search results.
//!
//! Embeddings are written as a bracketed, comma-separated list of floats
//! (`[0.1,-0.2,0.3]`). Reading also accepts the `[0.1, -0.2, 0.3]` form with
//! spaces.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::search::RankedRow;
use crate::store::{DocumentRow, DocumentStore};

/// Column names used in CSV files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Column holding document text.
    pub text_column: String,

    /// Column holding the serialized embedding.
    pub embedding_column: String,

    /// Column holding the similarity score in search output.
    pub similarity_column: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            text_column: "text".to_string(),
            embedding_column: "ada_v2".to_string(),
            similarity_column: "similarities".to_string(),
        }
    }
}

/// Read the text column of a corpus file. Other columns are ignored.
pub fn read_corpus(path: impl AsRef<Path>, config: &TableConfig) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let text_idx = column_index(reader.headers()?, &config.text_column, path)?;

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record?;
        texts.push(record.get(text_idx).unwrap_or_default().to_string());
    }

    info!("Read {} corpus rows from {}", texts.len(), path.display());
    Ok(texts)
}

/// Write every row of `store` as `text,embedding`.
pub fn write_embedded(
    path: impl AsRef<Path>,
    store: &DocumentStore,
    config: &TableConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([&config.text_column, &config.embedding_column])?;
    for row in store {
        writer.write_record([row.text.as_str(), format_embedding(&row.embedding).as_str()])?;
    }
    writer.flush()?;

    info!("Wrote {} embedded rows to {}", store.len(), path.display());
    Ok(())
}

/// Load a file written by [`write_embedded`] back into a store.
///
/// Errors name the 1-based data row that failed to parse or broke the
/// store's dimension/magnitude invariants.
pub fn read_embedded(path: impl AsRef<Path>, config: &TableConfig) -> Result<DocumentStore> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let text_idx = column_index(&headers, &config.text_column, path)?;
    let embedding_idx = column_index(&headers, &config.embedding_column, path)?;

    let mut store = DocumentStore::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let text = record.get(text_idx).unwrap_or_default();
        let embedding = parse_embedding(record.get(embedding_idx).unwrap_or_default())
            .map_err(|message| RetrievalError::InvalidEmbedding { row, message })?;

        store
            .push(DocumentRow::new(text, embedding))
            .map_err(|e| RetrievalError::InvalidEmbedding {
                row,
                message: e.to_string(),
            })?;
    }

    debug!(
        "Loaded {} rows ({:?} dimensions) from {}",
        store.len(),
        store.dimension(),
        path.display()
    );
    Ok(store)
}

/// Write ranked search results as `text,embedding,similarity`.
pub fn write_ranked(
    path: impl AsRef<Path>,
    ranked: &[RankedRow<'_>],
    config: &TableConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        &config.text_column,
        &config.embedding_column,
        &config.similarity_column,
    ])?;
    for result in ranked {
        writer.write_record([
            result.row.text.as_str(),
            format_embedding(&result.row.embedding).as_str(),
            result.similarity.to_string().as_str(),
        ])?;
    }
    writer.flush()?;

    info!("Wrote {} search results to {}", ranked.len(), path.display());
    Ok(())
}

/// Serialize an embedding as `[x,y,...]`.
pub fn format_embedding(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(f32::to_string).collect();
    format!("[{}]", values.join(","))
}

/// Parse an embedding cell.
pub fn parse_embedding(cell: &str) -> std::result::Result<Vec<f32>, String> {
    serde_json::from_str(cell.trim()).map_err(|e| e.to_string())
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| RetrievalError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}
