//! Application configuration: service connection, ingestion, search and
//! CSV column settings, loaded from TOML with environment overrides.

use std::path::{Path, PathBuf};

use docsearch_embeddings::ServiceConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::ingest::IngestConfig;
use crate::table::TableConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Embedding service connection.
    pub service: ServiceConfig,

    /// Ingestion settings.
    pub ingest: IngestConfig,

    /// Search settings.
    pub search: SearchConfig,

    /// CSV column names.
    pub table: TableConfig,
}

/// Configuration for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results returned when the caller does not say.
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_n: 4 }
    }
}

/// Environment variables consulted by [`AppConfig::apply_env`], in priority
/// order per setting.
const ENV_API_KEY: [&str; 2] = ["DOCSEARCH_API_KEY", "AZURE_OPENAI_API_KEY"];
const ENV_ENDPOINT: [&str; 2] = ["DOCSEARCH_ENDPOINT", "AZURE_OPENAI_ENDPOINT"];
const ENV_DEPLOYMENT: [&str; 2] = ["DOCSEARCH_DEPLOYMENT", "AZURE_OPENAI_DEPLOYMENT"];
const ENV_API_VERSION: [&str; 2] = ["DOCSEARCH_API_VERSION", "OPENAI_API_VERSION"];

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default config location: `<config dir>/docsearch/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docsearch").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if present, otherwise built-in defaults. Environment variables
    /// are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(file) => {
                let content = std::fs::read_to_string(&file).map_err(|e| {
                    RetrievalError::Config(format!("{}: {e}", file.display()))
                })?;
                info!("Loaded configuration from {}", file.display());
                Self::from_toml(&content)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override service settings from environment lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| {
            keys.iter()
                .copied()
                .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        if let Some(key) = first(&ENV_API_KEY) {
            self.service.api_key = Some(key);
        }
        if let Some(endpoint) = first(&ENV_ENDPOINT) {
            self.service.endpoint = endpoint;
        }
        if let Some(deployment) = first(&ENV_DEPLOYMENT) {
            self.service.deployment = deployment;
        }
        if let Some(version) = first(&ENV_API_VERSION) {
            self.service.api_version = version;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FailurePolicy;
    use crate::tokens::TokenizerKind;
    use docsearch_embeddings::ServiceKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.max_tokens, 8192);
        assert_eq!(config.ingest.concurrency, 1);
        assert_eq!(config.ingest.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.search.top_n, 4);
        assert_eq!(config.table.embedding_column, "ada_v2");
        assert_eq!(config.service.api_version, "2023-05-15");
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [service]
            kind = "openai"
            endpoint = "https://api.openai.com/v1"
            deployment = "text-embedding-3-small"
            dimension = 1536

            [ingest]
            concurrency = 4
            failure_policy = "skip"
            tokenizer = "chars"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.kind, ServiceKind::OpenAI);
        assert_eq!(config.service.dimension, Some(1536));
        assert_eq!(config.ingest.concurrency, 4);
        assert_eq!(config.ingest.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.ingest.max_tokens, 8192);
        assert_eq!(config.ingest.tokenizer, TokenizerKind::Chars);
        assert_eq!(config.search.top_n, 4);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml("[ingest]\nconcurrency = \"many\""),
            Err(RetrievalError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides_prefer_docsearch_names() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DOCSEARCH_API_KEY", "primary"),
            ("AZURE_OPENAI_API_KEY", "fallback"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("DOCSEARCH_DEPLOYMENT", "  "),
        ]);

        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.service.api_key.as_deref(), Some("primary"));
        assert_eq!(config.service.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.service.deployment, "text-embedding-ada-002");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ntop_n = 2\n").unwrap();

        let config = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.search.top_n, 2);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            AppConfig::load(Some(missing.as_path())),
            Err(RetrievalError::Config(_))
        ));
    }
}
