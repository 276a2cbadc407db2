//! Token-window splitting.
//!
//! Text is encoded to token ids, cut into fixed-size windows that overlap by
//! a fixed number of tokens, and each window is decoded back to text.
//!
//! ## How It Works
//!
//! ```text
//! chunk_size = 4, chunk_overlap = 1
//!
//! Tokens:  [The][ quick][ brown][ fox][ jumps][ over][ the][ dog]
//!
//! Chunk 0: [The][ quick][ brown][ fox]           tokens 0..4
//! Chunk 1:                     [ fox][ jumps][ over][ the]   tokens 3..7  <- starts at 4 - 1
//! Chunk 2:                                         [ the][ dog]   tokens 6..8  <- truncated
//! ```
//!
//! Sizes are in tokens because that is what a model's context window is
//! measured in. A 512-token chunk is 512 tokens whatever the script or
//! vocabulary.
//!
//! ## Windows Stop at the End
//!
//! The window that reaches the last token is the final one. Starting another
//! window inside the trailing overlap would only repeat a suffix of it.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::validate_window;
use crate::tokenizer::{Tokenizer, TokenizerResolver};
use crate::window::{chunk_count, window_spans};
use crate::{ChunkConfig, Error, Result, TextUnit, TokenWindow};

/// A text splitting strategy.
///
/// ```rust
/// use tokslab::{Result, TextSplitter};
///
/// struct Lines;
///
/// impl TextSplitter for Lines {
///     fn split_text(&self, text: &str) -> Result<Vec<String>> {
///         Ok(text.lines().map(str::to_string).collect())
///     }
/// }
///
/// assert_eq!(Lines.split_text("a\nb").unwrap(), vec!["a", "b"]);
/// ```
pub trait TextSplitter: Send + Sync {
    /// Split text into chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be split.
    fn split_text(&self, text: &str) -> Result<Vec<String>>;
}

/// Splits text into overlapping windows of at most `chunk_size` tokens.
///
/// The tokenizer is resolved once at construction and shared by every call.
///
/// ## Example
///
/// ```rust
/// use tokslab::{ChunkConfig, TextSplitter, TokenSplitter};
///
/// let config = ChunkConfig::new(8, 2).with_encoding("cl100k_base");
/// let splitter = TokenSplitter::new(config).unwrap();
///
/// let chunks = splitter
///     .split_text("The quick brown fox jumps over the lazy dog again and again.")
///     .unwrap();
/// assert!(chunks.len() >= 2);
/// ```
#[derive(Clone)]
pub struct TokenSplitter {
    config: ChunkConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenSplitter {
    /// Build a splitter whose tokenizer comes from tiktoken.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the window arithmetic is invalid or
    /// no tokenizer can be resolved.
    #[cfg(feature = "tiktoken")]
    pub fn new(config: ChunkConfig) -> Result<Self> {
        Self::with_resolver(config, crate::TiktokenResolver::new())
    }

    /// Build a splitter, resolving its tokenizer through `resolver`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidChunkSize`] / [`Error::OverlapExceedsSize`] for bad
    ///   window arithmetic
    /// - [`Error::MissingTokenizer`], [`Error::UnknownModel`],
    ///   [`Error::UnknownEncoding`] if the tokenizer cannot be resolved
    pub fn with_resolver(config: ChunkConfig, resolver: impl TokenizerResolver) -> Result<Self> {
        config.validate()?;
        let tokenizer = resolver.resolve(config.model.as_deref(), config.encoding.as_deref())?;
        debug!(
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            model = config.model.as_deref(),
            encoding = config.encoding.as_deref(),
            "token splitter ready"
        );
        Ok(Self { config, tokenizer })
    }

    /// Build a splitter around an already-resolved tokenizer.
    ///
    /// The model and encoding names in `config` are not consulted.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the window arithmetic is invalid.
    pub fn with_tokenizer(config: ChunkConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        validate_window(config.chunk_size, config.chunk_overlap)?;
        Ok(Self { config, tokenizer })
    }

    /// The configuration this splitter was built with.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// The resolved tokenizer.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Encode `text` with the configured special-token policy.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer failures.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.tokenizer.encode(
            text,
            &self.config.allowed_special,
            &self.config.disallowed_special,
        )
    }

    /// Number of chunks produced for a text of `n_tokens` tokens.
    pub fn chunk_count(&self, n_tokens: usize) -> usize {
        chunk_count(n_tokens, self.config.chunk_size, self.config.step())
    }

    /// Split `text` into decoded windows with their token spans.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer encode/decode failures.
    pub fn split_windows(&self, text: &str) -> Result<Vec<TokenWindow>> {
        let ids = self.encode(text)?;
        let spans = window_spans(ids.len(), self.config.chunk_size, self.config.chunk_overlap)
            .ok_or(Error::OverlapExceedsSize {
                size: self.config.chunk_size,
                overlap: self.config.chunk_overlap,
            })?;

        let mut windows = Vec::with_capacity(spans.len());
        for (index, span) in spans.enumerate() {
            let text = self.tokenizer.decode(&ids[span.clone()])?;
            trace!(index, start = span.start, end = span.end, "decoded window");
            windows.push(TokenWindow::new(text, span.start, span.end, index));
        }

        debug!(
            tokens = ids.len(),
            chunks = windows.len(),
            "split text into token windows"
        );
        Ok(windows)
    }
}

impl TextSplitter for TokenSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .split_windows(text)?
            .into_iter()
            .map(|window| window.text)
            .collect())
    }
}

impl fmt::Debug for TokenSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSplitter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Split `text` under `config`, resolving the tokenizer through `resolver`.
///
/// One-shot form of [`TokenSplitter`]; build the splitter once when splitting
/// many texts.
///
/// # Errors
///
/// Returns a configuration error before any tokenization if the config is
/// invalid, then propagates tokenizer failures.
pub fn split_text(
    text: &str,
    config: &ChunkConfig,
    resolver: impl TokenizerResolver,
) -> Result<Vec<String>> {
    TokenSplitter::with_resolver(config.clone(), resolver)?.split_text(text)
}

/// Split every unit's content, giving each chunk a copy of its parent's
/// metadata.
///
/// Output order is unit order, then chunk order within a unit. A unit whose
/// content has no tokens contributes nothing.
///
/// ```rust
/// use tokslab::{split_documents, Result, TextSplitter, TextUnit};
///
/// struct Words;
///
/// impl TextSplitter for Words {
///     fn split_text(&self, text: &str) -> Result<Vec<String>> {
///         Ok(text.split_whitespace().map(str::to_string).collect())
///     }
/// }
///
/// let units = vec![TextUnit::new("a b").with_metadata("page", 1_i64)];
/// let chunks = split_documents(&Words, &units).unwrap();
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].metadata, units[0].metadata);
/// ```
///
/// # Errors
///
/// Returns [`Error::Split`] carrying the index of the failing unit.
pub fn split_documents<S: TextSplitter + ?Sized>(
    splitter: &S,
    units: &[TextUnit],
) -> Result<Vec<TextUnit>> {
    let mut out = Vec::new();
    for (index, unit) in units.iter().enumerate() {
        let chunks = splitter
            .split_text(&unit.content)
            .map_err(|source| Error::Split {
                unit: index,
                source: Box::new(source),
            })?;
        out.extend(
            chunks
                .into_iter()
                .map(|chunk| TextUnit::with_parent_metadata(chunk, &unit.metadata)),
        );
    }
    debug!(units = units.len(), chunks = out.len(), "split documents");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, SpecialTokens, TokenizerRegistry};

    /// One token per `char`.
    struct Chars;

    impl Tokenizer for Chars {
        fn encode(&self, text: &str, _: &SpecialTokens, _: &SpecialTokens) -> Result<Vec<u32>> {
            Ok(text.chars().map(u32::from).collect())
        }

        fn decode(&self, ids: &[u32]) -> Result<String> {
            ids.iter()
                .map(|&id| char::from_u32(id).ok_or_else(|| Error::Tokenizer(format!("bad id {id}"))))
                .collect()
        }
    }

    fn splitter(size: usize, overlap: usize) -> TokenSplitter {
        TokenSplitter::with_tokenizer(ChunkConfig::new(size, overlap), Arc::new(Chars)).unwrap()
    }

    fn registry() -> TokenizerRegistry {
        TokenizerRegistry::new().with_encoding("chars", Arc::new(Chars))
    }

    #[test]
    fn test_basic_splitting() {
        let chunks = splitter(10, 2).split_text("abcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(chunks, vec!["abcdefghij", "ijklmnopqr", "qrstuvwxyz"]);
    }

    #[test]
    fn test_no_overlap_sizes() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 0).split_text(&text).unwrap();
        let sizes: Vec<_> = chunks.iter().map(String::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_window_offsets() {
        let text = "a".repeat(1024);
        let windows = splitter(512, 100).split_windows(&text).unwrap();
        let starts: Vec<_> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![0, 412, 824]);
        assert_eq!(windows[2].token_len(), 200);
        assert_eq!(windows[2].end, 1024);
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(10, 2).split_text("").unwrap().is_empty());
    }

    #[test]
    fn test_text_smaller_than_chunk() {
        let chunks = splitter(100, 20).split_text("small").unwrap();
        assert_eq!(chunks, vec!["small"]);
    }

    #[test]
    fn test_multibyte_chars_are_single_tokens() {
        let chunks = splitter(2, 1).split_text("日本語").unwrap();
        assert_eq!(chunks, vec!["日本", "本語"]);
    }

    #[test]
    fn test_chunk_count() {
        let s = splitter(512, 100);
        assert_eq!(s.chunk_count(0), 0);
        assert_eq!(s.chunk_count(1), 1);
        assert_eq!(s.chunk_count(512), 1);
        assert_eq!(s.chunk_count(1024), 3);
    }

    #[test]
    fn test_overlap_rejected_before_tokenizing() {
        let err = TokenSplitter::with_tokenizer(ChunkConfig::new(10, 10), Arc::new(Chars))
            .unwrap_err();
        assert!(matches!(err, Error::OverlapExceedsSize { .. }));

        let config = ChunkConfig::new(5, 7).with_encoding("chars");
        let err = split_text("abc", &config, registry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_resolution_failures() {
        let config = ChunkConfig::new(5, 1);
        assert!(matches!(
            split_text("abc", &config, registry()),
            Err(Error::MissingTokenizer)
        ));

        let config = ChunkConfig::new(5, 1).with_model("gpt-4").with_encoding("chars");
        assert!(matches!(
            split_text("abc", &config, registry()),
            Err(Error::UnknownModel(_))
        ));

        let config = ChunkConfig::new(5, 1).with_encoding("chars");
        assert_eq!(split_text("abc", &config, registry()).unwrap(), vec!["abc"]);
    }

    #[test]
    fn test_split_documents_inherits_metadata() {
        let units = vec![
            TextUnit::new("abcdef").with_metadata("page", 1_i64),
            TextUnit::new(""),
            TextUnit::new("xyz").with_metadata("page", 3_i64),
        ];
        let out = split_documents(&splitter(4, 1), &units).unwrap();

        let texts: Vec<_> = out.iter().map(|u| u.content.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "def", "xyz"]);
        assert_eq!(out[0].metadata, units[0].metadata);
        assert_eq!(out[1].metadata, units[0].metadata);
        assert_eq!(out[2].metadata, units[2].metadata);
        assert_eq!(out[0].metadata.len(), 1);
    }

    #[test]
    fn test_split_documents_reports_unit() {
        struct FailOn(&'static str);

        impl TextSplitter for FailOn {
            fn split_text(&self, text: &str) -> Result<Vec<String>> {
                if text == self.0 {
                    Err(Error::Tokenizer("boom".into()))
                } else {
                    Ok(vec![text.to_string()])
                }
            }
        }

        let units = vec![TextUnit::new("ok"), TextUnit::new("bad")];
        let err = split_documents(&FailOn("bad"), &units).unwrap_err();
        assert!(matches!(err, Error::Split { unit: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Tokenizer);
    }
}
