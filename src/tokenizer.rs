//! Tokenizer capability: encode text to ids and decode ids back to text.
//!
//! The splitter never hard-codes a tokenizer. It asks a
//! [`TokenizerResolver`] for a handle by model name or encoding name and
//! talks to it through the [`Tokenizer`] trait. Two resolvers ship with
//! the crate:
//!
//! - [`TokenizerRegistry`]: explicit name → tokenizer table, for custom or
//!   test tokenizers.
//! - [`TiktokenResolver`](crate::TiktokenResolver) (feature `tiktoken`):
//!   OpenAI BPE encodings via `tiktoken-rs`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{Error, Result, SpecialTokens};

/// Integer token id.
pub type TokenId = u32;

/// A subword tokenizer.
///
/// `encode` followed by `decode` must reproduce the input for text without
/// special tokens. Decoding an arbitrary sub-range may cut a multi-byte
/// character; how that is handled is up to the implementation.
pub trait Tokenizer: Send + Sync {
    /// Encode `text`, honouring the special-token policy.
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::DisallowedSpecialToken`] when the text
    /// contains a disallowed special token.
    fn encode(
        &self,
        text: &str,
        allowed_special: &SpecialTokens,
        disallowed_special: &SpecialTokens,
    ) -> Result<Vec<TokenId>>;

    /// Decode a sequence of ids back to text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the ids cannot be decoded.
    fn decode(&self, ids: &[TokenId]) -> Result<String>;
}

/// Looks up tokenizers by logical name.
pub trait TokenizerResolver {
    /// Resolve the tokenizer a model uses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownModel`] if the model is not known.
    fn by_model(&self, model: &str) -> Result<Arc<dyn Tokenizer>>;

    /// Resolve a tokenizer by encoding name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEncoding`] if the encoding is not known.
    fn by_encoding(&self, encoding: &str) -> Result<Arc<dyn Tokenizer>>;

    /// Resolve by model if given, otherwise by encoding.
    ///
    /// An unknown model is an error even when an encoding is also given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTokenizer`] if neither name is given.
    fn resolve(&self, model: Option<&str>, encoding: Option<&str>) -> Result<Arc<dyn Tokenizer>> {
        match (model, encoding) {
            (Some(model), _) => self.by_model(model),
            (None, Some(encoding)) => self.by_encoding(encoding),
            (None, None) => Err(Error::MissingTokenizer),
        }
    }
}

impl<R: TokenizerResolver + ?Sized> TokenizerResolver for &R {
    fn by_model(&self, model: &str) -> Result<Arc<dyn Tokenizer>> {
        (**self).by_model(model)
    }

    fn by_encoding(&self, encoding: &str) -> Result<Arc<dyn Tokenizer>> {
        (**self).by_encoding(encoding)
    }
}

/// Name → tokenizer table.
///
/// ```rust
/// use std::sync::Arc;
/// use tokslab::{Result, SpecialTokens, Tokenizer, TokenizerRegistry, TokenizerResolver};
///
/// struct Bytes;
///
/// impl Tokenizer for Bytes {
///     fn encode(&self, text: &str, _: &SpecialTokens, _: &SpecialTokens) -> Result<Vec<u32>> {
///         Ok(text.bytes().map(u32::from).collect())
///     }
///     fn decode(&self, ids: &[u32]) -> Result<String> {
///         Ok(ids.iter().map(|&b| char::from(b as u8)).collect())
///     }
/// }
///
/// let registry = TokenizerRegistry::new().with_encoding("bytes", Arc::new(Bytes));
/// assert!(registry.by_encoding("bytes").is_ok());
/// assert!(registry.by_model("gpt-4").is_err());
/// ```
#[derive(Default, Clone)]
pub struct TokenizerRegistry {
    models: HashMap<String, Arc<dyn Tokenizer>>,
    encodings: HashMap<String, Arc<dyn Tokenizer>>,
}

impl TokenizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tokenizer under a model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.models.insert(model.into(), tokenizer);
        self
    }

    /// Register a tokenizer under an encoding name.
    #[must_use]
    pub fn with_encoding(
        mut self,
        encoding: impl Into<String>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        self.encodings.insert(encoding.into(), tokenizer);
        self
    }
}

impl fmt::Debug for TokenizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<_> = self.models.keys().collect();
        let mut encodings: Vec<_> = self.encodings.keys().collect();
        models.sort();
        encodings.sort();
        f.debug_struct("TokenizerRegistry")
            .field("models", &models)
            .field("encodings", &encodings)
            .finish()
    }
}

impl TokenizerResolver for TokenizerRegistry {
    fn by_model(&self, model: &str) -> Result<Arc<dyn Tokenizer>> {
        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| Error::UnknownModel(model.to_string()))
    }

    fn by_encoding(&self, encoding: &str) -> Result<Arc<dyn Tokenizer>> {
        self.encodings
            .get(encoding)
            .cloned()
            .ok_or_else(|| Error::UnknownEncoding(encoding.to_string()))
    }
}

/// `<|endoftext|>`
pub const ENDOFTEXT: &str = "<|endoftext|>";
/// `<|fim_prefix|>`
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
/// `<|fim_middle|>`
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
/// `<|fim_suffix|>`
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
/// `<|endofprompt|>`
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

/// The OpenAI BPE encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// GPT-3 era (`davinci`, `gpt2`).
    R50kBase,
    /// Codex era.
    P50kBase,
    /// Edit models, adds fill-in-the-middle tokens.
    P50kEdit,
    /// GPT-3.5 / GPT-4.
    Cl100kBase,
    /// GPT-4o.
    O200kBase,
}

impl Encoding {
    /// Every encoding.
    pub const ALL: [Self; 5] = [
        Self::R50kBase,
        Self::P50kBase,
        Self::P50kEdit,
        Self::Cl100kBase,
        Self::O200kBase,
    ];

    /// The canonical encoding name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::R50kBase => "r50k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::Cl100kBase => "cl100k_base",
            Self::O200kBase => "o200k_base",
        }
    }

    /// Special tokens the encoding defines.
    pub const fn special_tokens(self) -> &'static [&'static str] {
        match self {
            Self::R50kBase | Self::P50kBase => &[ENDOFTEXT],
            Self::P50kEdit => &[ENDOFTEXT, FIM_PREFIX, FIM_MIDDLE, FIM_SUFFIX],
            Self::Cl100kBase => &[ENDOFTEXT, FIM_PREFIX, FIM_MIDDLE, FIM_SUFFIX, ENDOFPROMPT],
            Self::O200kBase => &[ENDOFTEXT, ENDOFPROMPT],
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| Error::UnknownEncoding(s.to_string()))
    }
}

/// Which special tokens may be encoded as such, and which are forbidden,
/// after narrowing the configured sets to what an encoding defines.
///
/// `All` in the disallowed set means every special token that is not
/// allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialPolicy<'a> {
    /// Special tokens encoded to their reserved ids.
    pub allowed: Vec<&'a str>,
    /// Special tokens whose presence is an error.
    pub disallowed: Vec<&'a str>,
}

impl<'a> SpecialPolicy<'a> {
    /// Narrow `allowed` / `disallowed` to `available`.
    pub fn new(
        available: &[&'a str],
        allowed: &SpecialTokens,
        disallowed: &SpecialTokens,
    ) -> Self {
        let allowed = allowed.resolve(available);
        let disallowed = disallowed
            .resolve(available)
            .into_iter()
            .filter(|token| !allowed.contains(token))
            .collect();
        Self {
            allowed,
            disallowed,
        }
    }

    /// Fail if `text` contains a disallowed special token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DisallowedSpecialToken`] naming the first match.
    pub fn check(&self, text: &str) -> Result<()> {
        let first = self
            .disallowed
            .iter()
            .filter_map(|token| text.find(token).map(|at| (at, *token)))
            .min_by_key(|(at, _)| *at);
        match first {
            Some((_, token)) => Err(Error::DisallowedSpecialToken(token.to_string())),
            None => Ok(()),
        }
    }

    /// Split `text` into ordinary runs and allowed special tokens, in order.
    pub fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        let mut rest = text;
        loop {
            let next = self
                .allowed
                .iter()
                .filter_map(|token| rest.find(token).map(|at| (at, token.len())))
                .min_by_key(|(at, _)| *at);
            match next {
                Some((at, len)) => {
                    if at > 0 {
                        segments.push(Segment::Ordinary(&rest[..at]));
                    }
                    segments.push(Segment::Special(&rest[at..at + len]));
                    rest = &rest[at + len..];
                }
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Ordinary(rest));
                    }
                    return segments;
                }
            }
        }
    }
}

/// A piece of text produced by [`SpecialPolicy::segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Text encoded without special-token handling.
    Ordinary(&'t str),
    /// An allowed special token.
    Special(&'t str),
}
