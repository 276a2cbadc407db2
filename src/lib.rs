//! # tokslab
//!
//! Token-bounded text chunking for retrieval-augmented generation (RAG)
//! pipelines, plus page-by-page document loading to feed it.
//!
//! ## The Problem
//!
//! Language models measure their context in tokens. A chunk of 2,000
//! characters can be 400 tokens of English or 1,500 tokens of Japanese, so
//! character-based chunking either wastes the context window or overflows it.
//!
//! This crate sizes chunks in the units the model actually counts:
//!
//! ```text
//! text ──encode──▶ [t0 t1 t2 ... tN-1] ──windows──▶ [t0..t512) [t412..t924) ...
//!                                                        │          │
//!                                                     decode     decode
//!                                                        ▼          ▼
//!                                                     chunk 0    chunk 1
//! ```
//!
//! ## Components
//!
//! ### Token Splitter
//!
//! [`TokenSplitter`] encodes text with a pluggable [`Tokenizer`], slices the
//! ids into windows of `chunk_size` tokens that share `chunk_overlap` tokens,
//! and decodes each window back to text. For `N > 0` tokens it produces
//! `ceil((N - overlap) / (size - overlap))` chunks (at least one).
//!
//! ### Document Loader
//!
//! [`PdfLoader`] buffers a byte stream, opens it with a
//! [`DocumentDecoder`], and emits one [`TextUnit`] per page tagged with
//! `page` and `total_pages`. [`DocumentLoader::load_and_split`] feeds the
//! pages straight into a splitter.
//!
//! ## Quick Start
//!
//! ```rust
//! use tokslab::{ChunkConfig, TextSplitter, TokenSplitter};
//!
//! let config = ChunkConfig::new(16, 4).with_model("gpt-4");
//! let splitter = TokenSplitter::new(config).unwrap();
//!
//! let chunks = splitter
//!     .split_text("The quick brown fox jumps over the lazy dog. Pack my box with five dozen liquor jugs.")
//!     .unwrap();
//! assert!(!chunks.is_empty());
//! ```
//!
//! ## Loading PDFs (requires `pdf` feature)
//!
//! ```rust,ignore
//! use tokslab::{ChunkConfig, DocumentLoader, PdfLoader, TokenSplitter};
//!
//! let file = std::fs::File::open("paper.pdf")?;
//! let size = file.metadata()?.len();
//! let splitter = TokenSplitter::new(ChunkConfig::default())?;
//!
//! let chunks = PdfLoader::new(file, size).load_and_split(&splitter)?;
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Provides |
//! |---------|---------|----------|
//! | `tiktoken` | yes | [`TiktokenResolver`], OpenAI BPE encodings |
//! | `pdf` | no | [`LopdfDecoder`], `PdfLoader::new` |

mod config;
mod error;
mod loader;
mod source;
mod splitter;
mod tokenizer;
mod unit;
mod window;

#[cfg(feature = "tiktoken")]
mod bpe;

#[cfg(feature = "pdf")]
mod pdf;

pub use config::{ChunkConfig, SpecialTokens};
pub use error::{Error, ErrorKind, Result, Stage};
pub use loader::{
    Credential, DecodedDocument, DocumentDecoder, DocumentLoader, Password, PdfLoader, PAGE_KEY,
    TOTAL_PAGES_KEY,
};
pub use source::ByteSource;
pub use splitter::{split_documents, split_text, TextSplitter, TokenSplitter};
pub use tokenizer::{
    Encoding, Segment, SpecialPolicy, TokenId, Tokenizer, TokenizerRegistry, TokenizerResolver,
    ENDOFPROMPT, ENDOFTEXT, FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX,
};
pub use unit::{Metadata, MetadataValue, TextUnit};
pub use window::{window_spans, TokenWindow, WindowSpans};

#[cfg(feature = "tiktoken")]
pub use bpe::{BpeTokenizer, TiktokenResolver};

#[cfg(feature = "pdf")]
pub use pdf::{LopdfDecoder, PdfDocument, PdfFont};
