//! Connection settings for the remote embedding service.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which wire flavour the embedding service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Azure OpenAI: deployment in the URL path, `api-version` query
    /// parameter, `api-key` header.
    #[default]
    Azure,
    /// OpenAI-compatible: model in the body, bearer token.
    #[serde(rename = "openai")]
    OpenAI,
}

/// Configuration for an embedding service.
///
/// Passed explicitly to [`crate::HttpEmbeddingProvider::new`]; nothing is
/// read from global state.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service flavour.
    pub kind: ServiceKind,

    /// Base endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,

    /// API key. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Azure deployment name, or the model name for OpenAI-compatible services.
    pub deployment: String,

    /// Azure `api-version` query parameter.
    pub api_version: String,

    /// Expected embedding dimension. Responses of any other length are rejected.
    pub dimension: Option<usize>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl ServiceConfig {
    /// Azure OpenAI configuration for the given resource endpoint and deployment.
    pub fn azure(endpoint: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            kind: ServiceKind::Azure,
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            ..Self::default()
        }
    }

    /// OpenAI-compatible configuration for the given base URL and model.
    pub fn openai(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ServiceKind::OpenAI,
            endpoint: endpoint.into(),
            deployment: model.into(),
            ..Self::default()
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the Azure API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Pin the expected embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the embeddings endpoint.
    pub fn embeddings_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match self.kind {
            ServiceKind::Azure => format!(
                "{base}/openai/deployments/{}/embeddings?api-version={}",
                self.deployment, self.api_version
            ),
            ServiceKind::OpenAI => format!("{base}/embeddings"),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            kind: ServiceKind::Azure,
            endpoint: String::new(),
            api_key: None,
            deployment: "text-embedding-ada-002".to_string(),
            api_version: "2023-05-15".to_string(),
            dimension: None,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
