//! Token splitter configuration.
//!
//! ## Size and Overlap
//!
//! Both are measured in tokens of the configured tokenizer, not bytes or
//! characters. Consecutive windows start `chunk_size - chunk_overlap` tokens
//! apart:
//!
//! ```text
//! chunk_size = 512, chunk_overlap = 100, 1024 tokens
//!
//! Window 0: [0..512)
//! Window 1: [412..924)    <- starts at 512 - 100
//! Window 2: [824..1024)   <- last window is truncated at the end
//! ```
//!
//! An overlap equal to or larger than the size would never advance, so it is
//! rejected by [`ChunkConfig::validate`].
//!
//! ## Selecting a Tokenizer
//!
//! A model name (`"gpt-4"`) takes precedence over an encoding name
//! (`"cl100k_base"`). At least one must be set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_CHUNK_SIZE: usize = 512;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_ENCODING: &str = "cl100k_base";

/// A set of special tokens, or every special token of the encoding.
///
/// Serialises as a list of strings; `["all"]` stands for [`SpecialTokens::All`].
///
/// ```rust
/// use tokslab::SpecialTokens;
///
/// let set = SpecialTokens::from(vec!["all".to_string()]);
/// assert_eq!(set, SpecialTokens::All);
/// assert!(SpecialTokens::none().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum SpecialTokens {
    /// Every special token the encoding defines.
    All,
    /// Exactly these tokens.
    Only(BTreeSet<String>),
}

impl SpecialTokens {
    /// The empty set.
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    /// Whether no tokens are selected.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(set) if set.is_empty())
    }

    /// Whether `token` is selected.
    pub fn contains(&self, token: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(token),
        }
    }

    /// Narrow this selection to the tokens an encoding actually defines.
    pub fn resolve<'a>(&self, available: &[&'a str]) -> Vec<&'a str> {
        available
            .iter()
            .copied()
            .filter(|token| self.contains(token))
            .collect()
    }
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Vec<String>> for SpecialTokens {
    fn from(tokens: Vec<String>) -> Self {
        if tokens.iter().any(|t| t == "all") {
            Self::All
        } else {
            Self::Only(tokens.into_iter().collect())
        }
    }
}

impl From<SpecialTokens> for Vec<String> {
    fn from(tokens: SpecialTokens) -> Self {
        match tokens {
            SpecialTokens::All => vec!["all".to_string()],
            SpecialTokens::Only(set) => set.into_iter().collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for SpecialTokens {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<String>>())
    }
}

/// Configuration for [`TokenSplitter`](crate::TokenSplitter).
///
/// # Examples
///
/// ```rust
/// use tokslab::ChunkConfig;
///
/// let config = ChunkConfig::default();
/// assert_eq!(config.chunk_size, 512);
/// assert_eq!(config.chunk_overlap, 100);
/// assert!(config.validate().is_ok());
///
/// let config = ChunkConfig::new(256, 32).with_encoding("o200k_base");
/// assert_eq!(config.model, None);
///
/// assert!(ChunkConfig::new(10, 10).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks. Must be `< chunk_size`.
    pub chunk_overlap: usize,
    /// Model name used to pick the tokenizer. Takes precedence over `encoding`.
    pub model: Option<String>,
    /// Encoding name used when `model` is unset.
    pub encoding: Option<String>,
    /// Special tokens that encode to their reserved ids.
    pub allowed_special: SpecialTokens,
    /// Special tokens that make encoding fail when present in the text.
    pub disallowed_special: SpecialTokens,
}

impl ChunkConfig {
    /// Create a config with the given window arithmetic and no tokenizer
    /// selected.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            model: None,
            encoding: None,
            allowed_special: SpecialTokens::none(),
            disallowed_special: SpecialTokens::All,
        }
    }

    /// Select the tokenizer by model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Select the tokenizer by encoding name.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the allowed special tokens.
    #[must_use]
    pub fn with_allowed_special(mut self, tokens: SpecialTokens) -> Self {
        self.allowed_special = tokens;
        self
    }

    /// Set the disallowed special tokens.
    #[must_use]
    pub fn with_disallowed_special(mut self, tokens: SpecialTokens) -> Self {
        self.disallowed_special = tokens;
        self
    }

    /// Distance between consecutive window starts.
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeds.
    #[must_use]
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }

    /// Check the window arithmetic and tokenizer selection.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidChunkSize`] if `chunk_size == 0`
    /// - [`Error::OverlapExceedsSize`] if `chunk_overlap >= chunk_size`
    /// - [`Error::MissingTokenizer`] if neither model nor encoding is set
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunk_size, self.chunk_overlap)?;
        if self.model.is_none() && self.encoding.is_none() {
            return Err(Error::MissingTokenizer);
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
            .with_model(DEFAULT_MODEL)
            .with_encoding(DEFAULT_ENCODING)
    }
}

pub(crate) fn validate_window(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::InvalidChunkSize(size));
    }
    if overlap >= size {
        return Err(Error::OverlapExceedsSize { size, overlap });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(config.encoding.as_deref(), Some("cl100k_base"));
        assert!(config.allowed_special.is_empty());
        assert_eq!(config.disallowed_special, SpecialTokens::All);
        assert_eq!(config.step(), 412);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = ChunkConfig::new(10, 10)
            .with_encoding("cl100k_base")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OverlapExceedsSize {
                size: 10,
                overlap: 10
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert!(ChunkConfig::new(10, 11)
            .with_encoding("cl100k_base")
            .validate()
            .is_err());
        assert!(ChunkConfig::new(10, 9)
            .with_encoding("cl100k_base")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = ChunkConfig::new(0, 0).with_model("gpt-4").validate();
        assert!(matches!(err, Err(Error::InvalidChunkSize(0))));
    }

    #[test]
    fn test_missing_tokenizer() {
        let err = ChunkConfig::new(10, 2).validate();
        assert!(matches!(err, Err(Error::MissingTokenizer)));
    }

    #[test]
    fn test_special_tokens_all_sentinel() {
        let tokens: SpecialTokens = ["<|endoftext|>", "all"].into_iter().collect();
        assert_eq!(tokens, SpecialTokens::All);
        assert!(tokens.contains("<|anything|>"));

        let tokens: SpecialTokens = ["<|endoftext|>"].into_iter().collect();
        assert!(tokens.contains("<|endoftext|>"));
        assert!(!tokens.contains("<|fim_prefix|>"));
    }

    #[test]
    fn test_special_tokens_resolve() {
        let available = ["<|endoftext|>", "<|fim_prefix|>"];
        assert_eq!(SpecialTokens::All.resolve(&available), available.to_vec());
        assert!(SpecialTokens::none().resolve(&available).is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ChunkConfig =
            serde_json::from_str(r#"{"chunk_size": 10, "chunk_overlap": 0, "disallowed_special": []}"#)
                .unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.chunk_overlap, 0);
        assert_eq!(config.model.as_deref(), Some("gpt-3.5-turbo"));
        assert!(config.disallowed_special.is_empty());
    }

    #[test]
    fn test_serialize_all_as_list() {
        let json = serde_json::to_value(ChunkConfig::default()).unwrap();
        assert_eq!(json["disallowed_special"], serde_json::json!(["all"]));
        assert_eq!(json["allowed_special"], serde_json::json!([]));
    }
}
