//! Token-count estimation used to keep oversized rows out of the store.

use std::fmt;

use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

use crate::error::{Result, RetrievalError};

/// Estimates how many model tokens a text will consume.
pub trait TokenEstimator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Estimated token count for `text`.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Exact counts with the `cl100k_base` BPE used by the ada-002 and
/// text-embedding-3 models.
pub struct TiktokenEstimator {
    bpe: CoreBPE,
}

impl TiktokenEstimator {
    /// Load the `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| RetrievalError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn name(&self) -> &str {
        "cl100k_base"
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl fmt::Debug for TiktokenEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenEstimator").finish_non_exhaustive()
    }
}

/// Offline approximation: one token per `chars_per_token` characters,
/// rounded up.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    /// Create an estimator with a custom ratio (clamped to at least 1).
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn name(&self) -> &str {
        "char-ratio"
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Estimator selection for configuration files and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// [`TiktokenEstimator`].
    #[default]
    Tiktoken,
    /// [`CharRatioEstimator`] with the default ratio.
    Chars,
}

impl TokenizerKind {
    /// Build the selected estimator.
    pub fn build(self) -> Result<Box<dyn TokenEstimator>> {
        Ok(match self {
            Self::Tiktoken => Box::new(TiktokenEstimator::cl100k()?),
            Self::Chars => Box::new(CharRatioEstimator::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_char_ratio_rounds_up() {
        let estimator = CharRatioEstimator::default();
        assert_eq!(estimator.count_tokens(""), 0);
        assert_eq!(estimator.count_tokens("abc"), 1);
        assert_eq!(estimator.count_tokens("abcd"), 1);
        assert_eq!(estimator.count_tokens("abcde"), 2);
    }

    #[test]
    fn test_char_ratio_counts_chars_not_bytes() {
        let estimator = CharRatioEstimator::new(1);
        assert_eq!(estimator.count_tokens("héllo"), 5);
    }

    #[test]
    fn test_zero_ratio_is_clamped() {
        let estimator = CharRatioEstimator::new(0);
        assert_eq!(estimator.count_tokens("ab"), 2);
    }

    #[test]
    fn test_tiktoken_counts() {
        let estimator = TiktokenEstimator::cl100k().unwrap();
        assert_eq!(estimator.count_tokens(""), 0);
        assert_eq!(estimator.count_tokens("hello world"), 2);
    }

    #[test]
    fn test_kind_deserializes() {
        let kind: TokenizerKind = serde_json::from_str("\"chars\"").unwrap();
        assert_eq!(kind, TokenizerKind::Chars);
        assert_eq!(kind.build().unwrap().name(), "char-ratio");
    }
}
