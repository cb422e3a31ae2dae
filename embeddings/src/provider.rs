//! Embedding providers.
//!
//! The [`EmbeddingProvider`] trait is the seam between the retrieval core and
//! the remote service. [`HttpEmbeddingProvider`] talks to Azure OpenAI or any
//! OpenAI-compatible endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::config::{ServiceConfig, ServiceKind};
use crate::error::{EmbeddingError, Result};

/// Request for generating an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model reported by the service.
    pub model: String,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

impl EmbeddingResponse {
    /// Dimension of the returned embedding.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Model or deployment this provider embeds with.
    fn model(&self) -> &str;

    /// Embedding dimension, if known ahead of the first call.
    fn dimension(&self) -> Option<usize>;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Embed a string and return only the vector.
    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed(EmbeddingRequest::new(text)).await?.embedding)
    }
}

/// Embedding provider backed by an HTTP embeddings endpoint.
pub struct HttpEmbeddingProvider {
    config: ServiceConfig,

    /// Resolved embeddings URL.
    url: String,

    /// API key, checked at construction.
    api_key: String,

    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    /// Build a provider from an explicit configuration.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EmbeddingError::ProviderNotConfigured("missing API key".to_string()))?;
        if config.endpoint.trim().is_empty() {
            return Err(EmbeddingError::ProviderNotConfigured(
                "missing endpoint".to_string(),
            ));
        }
        if config.deployment.trim().is_empty() {
            return Err(EmbeddingError::ProviderNotConfigured(
                "missing deployment or model".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            url: config.embeddings_url(),
            api_key: api_key.trim().to_string(),
            config,
            client,
        })
    }

    /// The configuration this provider was built from.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn request_body(&self, request: &EmbeddingRequest) -> serde_json::Value {
        match self.config.kind {
            ServiceKind::Azure => serde_json::json!({ "input": [request.text] }),
            ServiceKind::OpenAI => serde_json::json!({
                "input": [request.text],
                "model": self.config.deployment,
            }),
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            EmbeddingError::Http(err)
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        match self.config.kind {
            ServiceKind::Azure => "azure-openai",
            ServiceKind::OpenAI => "openai",
        }
    }

    fn model(&self) -> &str {
        &self.config.deployment
    }

    fn dimension(&self) -> Option<usize> {
        self.config.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        debug!(
            "Requesting embedding from {} ({} chars)",
            self.name(),
            request.text.len()
        );

        let builder = self.client.post(&self.url).json(&self.request_body(&request));
        let builder = match self.config.kind {
            ServiceKind::Azure => builder.header("api-key", &self.api_key),
            ServiceKind::OpenAI => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    EmbeddingError::Authentication {
                        status: status.as_u16(),
                        message,
                    }
                } else {
                    EmbeddingError::ApiRequest {
                        status: status.as_u16(),
                        message,
                    }
                },
            );
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let result: ServiceEmbeddingResponse = serde_json::from_slice(&body)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let embedding = result
            .data
            .into_iter()
            .min_by_key(|item| item.index)
            .map(|item| item.embedding)
            .ok_or_else(|| {
                EmbeddingError::InvalidResponse("no embedding in response".to_string())
            })?;

        if let Some(expected) = self.config.dimension {
            if embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        debug!("Received embedding with {} dimensions", embedding.len());

        Ok(EmbeddingResponse {
            embedding,
            model: result.model.unwrap_or_else(|| self.config.deployment.clone()),
            tokens_used: result.usage.map(|u| u.total_tokens),
        })
    }
}

/// Embeddings API response format (shared by Azure and OpenAI).
#[derive(Debug, Deserialize)]
struct ServiceEmbeddingResponse {
    data: Vec<ServiceEmbeddingData>,
    model: Option<String>,
    usage: Option<ServiceUsage>,
}

#[derive(Debug, Deserialize)]
struct ServiceEmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ServiceUsage {
    total_tokens: u64,
}
