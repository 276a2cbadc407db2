//! OpenAI BPE tokenizers backed by `tiktoken-rs`.
//!
//! Requires the `tiktoken` feature (on by default).
//!
//! ## Special Tokens
//!
//! Special tokens such as `<|endoftext|>` follow tiktoken's rules:
//!
//! | allowed | disallowed | `<|endoftext|>` in text |
//! |---------|------------|-------------------------|
//! | `{}` | `all` | error |
//! | `{}` | `{}` | encoded as ordinary text |
//! | `all` | anything | encoded as its reserved id |
//!
//! ## Decoding Windows
//!
//! A window boundary can fall inside a multi-byte character, which is
//! common for CJK text and emoji. The bytes of such a window are decoded
//! lossily: the cut character becomes `U+FFFD` and the split goes on.
//! Only an id outside the encoding is an [`Error::Tokenizer`].

use std::sync::Arc;

use tiktoken_rs::{CoreBPE, Rank};
use tracing::{debug, trace};

use crate::tokenizer::{Segment, SpecialPolicy, TokenId, Tokenizer, TokenizerResolver};
use crate::{Encoding, Error, Result, SpecialTokens};

/// A tiktoken BPE for one [`Encoding`].
pub struct BpeTokenizer {
    encoding: Encoding,
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// Load the BPE ranks for `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the bundled ranks fail to load.
    pub fn new(encoding: Encoding) -> Result<Self> {
        let bpe = match encoding {
            Encoding::R50kBase => tiktoken_rs::r50k_base(),
            Encoding::P50kBase => tiktoken_rs::p50k_base(),
            Encoding::P50kEdit => tiktoken_rs::p50k_edit(),
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| Error::Tokenizer(e.to_string()))?;
        debug!(encoding = %encoding, "loaded bpe ranks");
        Ok(Self { encoding, bpe })
    }

    /// The encoding this tokenizer implements.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(
        &self,
        text: &str,
        allowed_special: &SpecialTokens,
        disallowed_special: &SpecialTokens,
    ) -> Result<Vec<TokenId>> {
        let policy = SpecialPolicy::new(
            self.encoding.special_tokens(),
            allowed_special,
            disallowed_special,
        );
        policy.check(text)?;

        if policy.allowed.is_empty() {
            return Ok(self.bpe.encode_ordinary(text));
        }

        let mut ids = Vec::new();
        for segment in policy.segments(text) {
            match segment {
                Segment::Ordinary(run) => {
                    ids.extend(self.bpe.encode_ordinary(run));
                }
                Segment::Special(token) => {
                    ids.extend(self.bpe.encode_with_special_tokens(token));
                }
            }
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let ranks: Vec<Rank> = ids.to_vec();
        match self.bpe.decode(ranks.clone()) {
            Ok(text) => Ok(text),
            // Every id was known; the range just cuts through a character.
            Err(e) if e.to_string().contains("UTF-8") => {
                let bytes: Vec<u8> = self.bpe._decode_native_and_split(ranks).flatten().collect();
                trace!(tokens = ids.len(), "lossy decode of partial character");
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => Err(Error::Tokenizer(e.to_string())),
        }
    }
}

/// Resolves model and encoding names to [`BpeTokenizer`]s.
///
/// ```rust
/// use tokslab::{TiktokenResolver, TokenizerResolver};
///
/// let resolver = TiktokenResolver::new();
/// assert!(resolver.by_model("gpt-4").is_ok());
/// assert!(resolver.by_encoding("cl100k_base").is_ok());
/// assert!(resolver.by_encoding("nope").is_err());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenResolver;

impl TiktokenResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self
    }

    /// The encoding a model name maps to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownModel`] if tiktoken does not know the model.
    pub fn encoding_for_model(model: &str) -> Result<Encoding> {
        use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer as Known};

        match get_tokenizer(model) {
            Some(Known::O200kBase) => Ok(Encoding::O200kBase),
            Some(Known::Cl100kBase) => Ok(Encoding::Cl100kBase),
            Some(Known::P50kBase) => Ok(Encoding::P50kBase),
            Some(Known::P50kEdit) => Ok(Encoding::P50kEdit),
            Some(Known::R50kBase | Known::Gpt2) => Ok(Encoding::R50kBase),
            #[allow(unreachable_patterns)]
            _ => Err(Error::UnknownModel(model.to_string())),
        }
    }
}

impl TokenizerResolver for TiktokenResolver {
    fn by_model(&self, model: &str) -> Result<Arc<dyn Tokenizer>> {
        let encoding = Self::encoding_for_model(model)?;
        debug!(model, encoding = %encoding, "resolved model");
        Ok(Arc::new(BpeTokenizer::new(encoding)?))
    }

    fn by_encoding(&self, encoding: &str) -> Result<Arc<dyn Tokenizer>> {
        Ok(Arc::new(BpeTokenizer::new(encoding.parse()?)?))
    }
}
