//! Page-by-page document loading.
//!
//! ## Flow
//!
//! ```text
//! byte stream ──read fully──▶ ByteSource ──open(password)──▶ decoded document
//!                                                               │
//!            page 1..=N: resolve fonts (cached per load) ◀──────┘
//!                        extract plain text
//!                        emit TextUnit { page, total_pages }
//! ```
//!
//! Any container or page failure aborts the load. No partial document is
//! returned.
//!
//! ## Single-Use Password
//!
//! A password given to a loader is handed to the decoder on the first load
//! and then marked consumed. A later load of an encrypted document through
//! the same loader fails with [`Error::CredentialConsumed`] until a password
//! is supplied again with [`PdfLoader::set_password`].

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use tracing::{debug, instrument, trace};

use crate::splitter::{split_documents, TextSplitter};
use crate::{ByteSource, Error, Result, TextUnit};

/// Metadata key for the 1-based page number.
pub const PAGE_KEY: &str = "page";
/// Metadata key for the document's page count.
pub const TOTAL_PAGES_KEY: &str = "total_pages";

/// A document password. `Debug` does not reveal it.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wrap a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// The password text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// State of a loader's password.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    /// No password was given.
    #[default]
    None,
    /// A password waiting for its single use.
    Pending(Password),
    /// The password was handed to a decoder and is gone.
    Consumed,
}

impl Credential {
    /// Take the pending password, leaving the credential consumed.
    pub fn take(&mut self) -> Option<Password> {
        match std::mem::take(self) {
            Self::Pending(password) => {
                *self = Self::Consumed;
                Some(password)
            }
            Self::Consumed => {
                *self = Self::Consumed;
                None
            }
            Self::None => None,
        }
    }

    /// Whether a password was given and already used.
    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Opens documents from a random-access byte source.
pub trait DocumentDecoder {
    /// The opened document.
    type Document: DecodedDocument;

    /// Open the first `size` bytes of `source`, decrypting with `password`
    /// when the document is encrypted.
    ///
    /// # Errors
    ///
    /// - [`Error::PasswordRequired`] if the document is encrypted and no
    ///   password is given
    /// - [`Error::Decode`] for malformed input or a wrong password
    fn open(
        &self,
        source: &ByteSource,
        size: u64,
        password: Option<&Password>,
    ) -> Result<Self::Document>;
}

/// An opened, paginated document. Pages are numbered from 1.
pub trait DecodedDocument {
    /// A resolved font handle.
    type Font;

    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Names of the fonts `page` references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the page cannot be read.
    fn font_names(&self, page: u32) -> Result<Vec<String>>;

    /// Resolve the font `name` as referenced from `page`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the font cannot be resolved.
    fn resolve_font(&self, page: u32, name: &str) -> Result<Self::Font>;

    /// Extract the plain text of `page` using the resolved `fonts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the page content cannot be decoded.
    fn extract_plain_text(&self, page: u32, fonts: &HashMap<String, Self::Font>)
        -> Result<String>;
}

/// Produces text units from a source.
pub trait DocumentLoader {
    /// Load every unit.
    ///
    /// # Errors
    ///
    /// Returns the first load failure.
    fn load(&mut self) -> Result<Vec<TextUnit>>;

    /// Load, then split every unit with `splitter`.
    ///
    /// # Errors
    ///
    /// Returns the first load or split failure.
    fn load_and_split<S: TextSplitter + ?Sized>(&mut self, splitter: &S) -> Result<Vec<TextUnit>>
    where
        Self: Sized,
    {
        let units = self.load()?;
        split_documents(splitter, &units)
    }
}

/// Loads a paginated document as one [`TextUnit`] per page.
///
/// ## Example
///
/// ```rust,ignore
/// use std::fs::File;
/// use tokslab::{DocumentLoader, PdfLoader};
///
/// let file = File::open("report.pdf")?;
/// let size = file.metadata()?.len();
/// let mut loader = PdfLoader::new(file, size).with_password("hunter2");
///
/// for page in loader.load()? {
///     println!("{page}");
/// }
/// ```
pub struct PdfLoader<R, D> {
    reader: R,
    size: u64,
    decoder: D,
    source: Option<ByteSource>,
    credential: Credential,
}

#[cfg(feature = "pdf")]
impl<R: Read> PdfLoader<R, crate::LopdfDecoder> {
    /// Create a loader that decodes PDF with `lopdf`.
    pub fn new(reader: R, size: u64) -> Self {
        Self::with_decoder(reader, size, crate::LopdfDecoder::new())
    }
}

impl<R: Read, D: DocumentDecoder> PdfLoader<R, D> {
    /// Create a loader over `size` bytes of `reader` using `decoder`.
    pub fn with_decoder(reader: R, size: u64, decoder: D) -> Self {
        Self {
            reader,
            size,
            decoder,
            source: None,
            credential: Credential::None,
        }
    }

    /// Supply a password for an encrypted document.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.set_password(password);
        self
    }

    /// Supply (or resupply) a password for the next load.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credential = Credential::Pending(Password::new(password));
    }

    /// The current password state.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl<R: Read, D: DocumentDecoder> DocumentLoader for PdfLoader<R, D> {
    #[instrument(skip_all, fields(size = self.size))]
    fn load(&mut self) -> Result<Vec<TextUnit>> {
        let source = match self.source.take() {
            Some(source) => source,
            None => {
                let source = ByteSource::from_reader(&mut self.reader, self.size)?;
                debug!(bytes = source.len(), "buffered document");
                source
            }
        };

        let was_consumed = self.credential.is_consumed();
        let password = self.credential.take();
        let result = self.open_and_extract(&source, password.as_ref(), was_consumed);
        self.source = Some(source);
        result
    }
}

impl<R, D: DocumentDecoder> PdfLoader<R, D> {
    fn open_and_extract(
        &self,
        source: &ByteSource,
        password: Option<&Password>,
        was_consumed: bool,
    ) -> Result<Vec<TextUnit>> {
        let document = self
            .decoder
            .open(source, self.size, password)
            .map_err(|e| match e {
                Error::PasswordRequired if was_consumed => Error::CredentialConsumed,
                e => e,
            })?;

        let units = extract_pages(&document)?;
        debug!(pages = units.len(), "loaded document");
        Ok(units)
    }
}

impl<R, D> fmt::Debug for PdfLoader<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfLoader")
            .field("size", &self.size)
            .field("buffered", &self.source.is_some())
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

fn extract_pages<Doc: DecodedDocument>(document: &Doc) -> Result<Vec<TextUnit>> {
    let total = document.page_count();
    let mut fonts: HashMap<String, Doc::Font> = HashMap::new();
    let mut units = Vec::with_capacity(total as usize);

    for page in 1..=total {
        for name in document.font_names(page).map_err(|e| at_page(e, page))? {
            if !fonts.contains_key(&name) {
                let font = document
                    .resolve_font(page, &name)
                    .map_err(|e| at_page(e, page))?;
                trace!(page, font = %name, "resolved font");
                fonts.insert(name, font);
            }
        }

        let text = document
            .extract_plain_text(page, &fonts)
            .map_err(|e| at_page(e, page))?;
        trace!(page, bytes = text.len(), "extracted page");

        units.push(
            TextUnit::new(text)
                .with_metadata(PAGE_KEY, page)
                .with_metadata(TOTAL_PAGES_KEY, total),
        );
    }

    Ok(units)
}

fn at_page(err: Error, page: u32) -> Error {
    match err {
        Error::Decode {
            page: None,
            message,
        } => Error::Decode {
            page: Some(page),
            message,
        },
        err => err,
    }
}
