//! Corpus ingestion: normalize, filter by token count, embed, store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use docsearch_embeddings::{EmbeddingError, EmbeddingProvider, magnitude};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RetrievalError};
use crate::normalize::normalize_text;
use crate::search::embed_with_timeout;
use crate::store::{DocumentRow, DocumentStore};
use crate::tokens::{TokenEstimator, TokenizerKind};

/// Token ceiling of the ada-002 embedding model.
pub const DEFAULT_MAX_TOKENS: usize = 8192;

/// What to do when embedding a row fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch and report the failing row.
    #[default]
    Abort,
    /// Record the row as skipped and keep going.
    Skip,
}

/// Configuration for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows with at least this many tokens are dropped before embedding.
    pub max_tokens: usize,

    /// Maximum number of embedding requests in flight.
    pub concurrency: usize,

    /// Behaviour on a failed embedding call.
    pub failure_policy: FailurePolicy,

    /// Token estimator to build for the ceiling check.
    pub tokenizer: TokenizerKind,
}

impl IngestConfig {
    /// Set the token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the number of concurrent embedding requests.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the token estimator kind.
    pub fn with_tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            concurrency: 1,
            failure_policy: FailurePolicy::Abort,
            tokenizer: TokenizerKind::Tiktoken,
        }
    }
}

/// Why a row did not make it into the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The row's token estimate reached the ceiling.
    TokenLimitExceeded { tokens: usize, limit: usize },
    /// Embedding failed under [`FailurePolicy::Skip`].
    EmbeddingFailed { message: String },
}

/// A corpus row that was left out of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// Zero-based index of the row in the input.
    pub index: usize,

    /// Why it was skipped.
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Statistics about an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    /// Number of input rows.
    pub rows_read: usize,

    /// Number of rows stored.
    pub rows_embedded: usize,

    /// Rows dropped by the token ceiling.
    pub rows_skipped_tokens: usize,

    /// Rows dropped after a failed embedding call.
    pub rows_skipped_errors: usize,

    /// Processing time in milliseconds.
    pub elapsed_ms: u64,
}

/// Result of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Stored rows, in input order.
    pub store: DocumentStore,

    /// Rows left out, in input order.
    pub skipped: Vec<SkippedRow>,

    /// Run statistics.
    pub stats: IngestStats,
}

/// Builds a [`DocumentStore`] from raw corpus text.
pub struct Ingestor {
    provider: Arc<dyn EmbeddingProvider>,
    estimator: Arc<dyn TokenEstimator>,
    config: IngestConfig,
    timeout: Duration,
}

impl Ingestor {
    /// Create an ingestor with default configuration and the default 30
    /// second embedding timeout.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            provider,
            estimator,
            config: IngestConfig::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the timeout for each embedding call. Callers pass the service's
    /// configured timeout so the HTTP client and this wrapper agree.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-call embedding timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Normalize, filter and embed every row of `texts`.
    ///
    /// Stored rows keep input order whatever the concurrency. Under
    /// [`FailurePolicy::Abort`] the first failing row (in input order) is
    /// returned as [`RetrievalError::RowFailed`].
    pub async fn ingest<S: AsRef<str>>(&self, texts: &[S]) -> Result<IngestReport> {
        let start = Instant::now();
        let mut stats = IngestStats {
            rows_read: texts.len(),
            ..IngestStats::default()
        };
        let mut skipped = Vec::new();

        info!(
            "Ingesting {} rows (tokenizer: {}, max_tokens: {}, concurrency: {})",
            texts.len(),
            self.estimator.name(),
            self.config.max_tokens,
            self.config.concurrency.max(1)
        );

        let mut candidates = Vec::with_capacity(texts.len());
        for (index, raw) in texts.iter().enumerate() {
            let text = normalize_text(raw.as_ref());
            let tokens = self.estimator.count_tokens(&text);
            if tokens >= self.config.max_tokens {
                warn!(
                    "Skipping row {index}: {tokens} tokens reaches limit of {}",
                    self.config.max_tokens
                );
                stats.rows_skipped_tokens += 1;
                skipped.push(SkippedRow {
                    index,
                    reason: SkipReason::TokenLimitExceeded {
                        tokens,
                        limit: self.config.max_tokens,
                    },
                });
                continue;
            }
            candidates.push((index, text));
        }

        let provider = self.provider.as_ref();
        let timeout = self.timeout;
        let mut results = futures::stream::iter(candidates)
            .map(move |(index, text)| async move {
                let result = embed_with_timeout(provider, &text, timeout).await;
                (index, text, result)
            })
            .buffered(self.config.concurrency.max(1));

        let mut store = match self.provider.dimension() {
            Some(dimension) => DocumentStore::with_dimension(dimension),
            None => DocumentStore::new(),
        };

        while let Some((index, text, result)) = results.next().await {
            let outcome = result.and_then(|embedding| validate(&store, embedding));
            match outcome {
                Ok(embedding) => {
                    debug!("Embedded row {index}");
                    store.push(DocumentRow::new(text, embedding))?;
                    stats.rows_embedded += 1;
                }
                Err(source) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(RetrievalError::RowFailed {
                            index,
                            preview: preview(&text),
                            source,
                        });
                    }
                    FailurePolicy::Skip => {
                        warn!("Skipping row {index}: {source}");
                        stats.rows_skipped_errors += 1;
                        skipped.push(SkippedRow {
                            index,
                            reason: SkipReason::EmbeddingFailed {
                                message: source.to_string(),
                            },
                        });
                    }
                },
            }
        }

        skipped.sort_by_key(|s| s.index);
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "Ingestion complete: {} embedded, {} over token limit, {} failed ({}ms)",
            stats.rows_embedded,
            stats.rows_skipped_tokens,
            stats.rows_skipped_errors,
            stats.elapsed_ms
        );

        Ok(IngestReport {
            store,
            skipped,
            stats,
        })
    }
}

/// Check an embedding against the store invariants before pushing it.
fn validate(
    store: &DocumentStore,
    embedding: Vec<f32>,
) -> std::result::Result<Vec<f32>, EmbeddingError> {
    if let Some(expected) = store.dimension() {
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
    }
    if magnitude(&embedding) == 0.0 {
        return Err(EmbeddingError::DegenerateVector);
    }
    Ok(embedding)
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
