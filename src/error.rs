//! Error types for tokslab.

/// Errors that can occur while loading or chunking.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid chunk size (must be > 0).
    #[error("invalid chunk size: {0} (must be > 0)")]
    InvalidChunkSize(usize),

    /// Overlap is not smaller than the chunk size, so windows would never advance.
    #[error("overlap {overlap} must be smaller than chunk size {size}")]
    OverlapExceedsSize {
        /// The chunk size.
        size: usize,
        /// The overlap that was too large.
        overlap: usize,
    },

    /// Neither a model nor an encoding identifier was configured.
    #[error("must have either a model name or an encoding name")]
    MissingTokenizer,

    /// The model name does not map to a known tokenizer.
    #[error("no tokenizer registered for model {0:?}")]
    UnknownModel(String),

    /// The encoding name does not map to a known tokenizer.
    #[error("no tokenizer registered for encoding {0:?}")]
    UnknownEncoding(String),

    /// The text contains a special token the policy disallows.
    #[error("text contains disallowed special token {0:?}")]
    DisallowedSpecialToken(String),

    /// The tokenizer backend failed to encode or decode.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The document container or one of its pages could not be decoded.
    #[error("{}", match page {
        Some(page) => format!("failed to decode page {page}: {message}"),
        None => format!("failed to decode document: {message}"),
    })]
    Decode {
        /// 1-based page number, when the failure is page-specific.
        page: Option<u32>,
        /// Decoder-provided description.
        message: String,
    },

    /// The document is encrypted and no password was supplied.
    #[error("document is encrypted and no password was supplied")]
    PasswordRequired,

    /// The loader's password was already used by an earlier load.
    #[error("password already consumed by a previous load; supply it again")]
    CredentialConsumed,

    /// Reading the byte stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Splitting the unit at `unit` failed.
    #[error("failed to split unit {unit}: {source}")]
    Split {
        /// Zero-based index of the unit within the batch.
        unit: usize,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid chunking configuration or unresolvable tokenizer.
    Configuration,
    /// Tokenizer encode/decode failure.
    Tokenizer,
    /// Document container or page decoding failure.
    Decode,
    /// Underlying byte stream failure.
    Io,
}

/// The pipeline stage an [`Error`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Document loading.
    Load,
    /// Token chunking.
    Split,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChunkSize(_)
            | Self::OverlapExceedsSize { .. }
            | Self::MissingTokenizer
            | Self::UnknownModel(_)
            | Self::UnknownEncoding(_) => ErrorKind::Configuration,
            Self::DisallowedSpecialToken(_) | Self::Tokenizer(_) => ErrorKind::Tokenizer,
            Self::Decode { .. } | Self::PasswordRequired | Self::CredentialConsumed => {
                ErrorKind::Decode
            }
            Self::Io(_) => ErrorKind::Io,
            Self::Split { source, .. } => source.kind(),
        }
    }

    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self.kind() {
            ErrorKind::Decode | ErrorKind::Io => Stage::Load,
            ErrorKind::Configuration | ErrorKind::Tokenizer => Stage::Split,
        }
    }

    /// The 1-based page number a decode failure refers to, if any.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Decode { page, .. } => *page,
            _ => None,
        }
    }

    pub(crate) fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode {
            page: None,
            message: message.to_string(),
        }
    }

    pub(crate) fn decode_page(page: u32, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            page: Some(page),
            message: message.to_string(),
        }
    }
}

/// Result type for tokslab operations.
pub type Result<T> = std::result::Result<T, Error>;
