//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docsearch_embeddings::{
    EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, Result,
};

use crate::store::{DocumentRow, DocumentStore};

/// Provider answering from a fixed text → vector table.
///
/// Unknown texts fail with a 400 `ApiRequest` error.
#[derive(Default)]
pub struct StaticProvider {
    vectors: HashMap<String, Vec<f32>>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn with_delay_for(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn model(&self) -> &str {
        "static-test"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.text.clone());
        }

        let delay = self
            .delays
            .get(&request.text)
            .copied()
            .or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let embedding = self
            .vectors
            .get(&request.text)
            .cloned()
            .ok_or_else(|| EmbeddingError::ApiRequest {
                status: 400,
                message: format!("no vector for {:?}", request.text),
            })?;

        Ok(EmbeddingResponse {
            embedding,
            model: self.model().to_string(),
            tokens_used: None,
        })
    }
}

/// Build a store from `(text, embedding)` pairs.
pub fn store_from(rows: &[(&str, Vec<f32>)]) -> DocumentStore {
    let mut store = DocumentStore::new();
    for (text, embedding) in rows {
        store
            .push(DocumentRow::new(*text, embedding.clone()))
            .unwrap();
    }
    store
}
