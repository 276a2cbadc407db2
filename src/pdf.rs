//! PDF decoding backed by `lopdf`.
//!
//! Requires the `pdf` feature.
//!
//! Fonts live in a page's `/Resources /Font` dictionary, which a page may
//! inherit from any ancestor in the page tree. The nearest definition of a
//! name wins.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::loader::{DecodedDocument, DocumentDecoder, Password};
use crate::{ByteSource, Error, Result};

/// Upper bound on page-tree depth when looking for inherited resources.
const MAX_TREE_DEPTH: usize = 64;

/// Opens PDF documents with `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfDecoder;

impl LopdfDecoder {
    /// Create a decoder.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentDecoder for LopdfDecoder {
    type Document = PdfDocument;

    fn open(
        &self,
        source: &ByteSource,
        size: u64,
        password: Option<&Password>,
    ) -> Result<PdfDocument> {
        let bytes = source.as_bytes();
        let end = usize::try_from(size).map_or(bytes.len(), |size| size.min(bytes.len()));
        let mut doc = Document::load_mem(&bytes[..end]).map_err(Error::decode)?;

        if doc.is_encrypted() {
            let password = password.ok_or(Error::PasswordRequired)?;
            doc.decrypt(password.expose())
                .map_err(|e| Error::decode(format!("decryption failed: {e}")))?;
            debug!("decrypted document");
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(pages = pages.len(), "opened pdf");
        Ok(PdfDocument { doc, pages })
    }
}

/// A resolved PDF font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFont {
    /// `/BaseFont`, e.g. `Helvetica`.
    pub base_font: Option<String>,
    /// `/Subtype`, e.g. `Type1`, `TrueType`, `Type0`.
    pub subtype: Option<String>,
    /// `/Encoding` when given by name.
    pub encoding: Option<String>,
}

impl PdfFont {
    /// `BaseFont/Encoding`, with `?` for a missing part.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}",
            self.base_font.as_deref().unwrap_or("?"),
            self.encoding.as_deref().unwrap_or("?")
        )
    }
}

/// An opened PDF.
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or_else(|| Error::decode_page(page, "no such page"))
    }

    fn dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match object {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            _ => None,
        }
    }

    /// Font dictionaries visible from `page`, keyed by resource name.
    fn fonts(&self, page: u32) -> Result<BTreeMap<String, &Dictionary>> {
        let mut fonts = BTreeMap::new();
        let mut node = Some(self.page_id(page)?);

        for _ in 0..MAX_TREE_DEPTH {
            let Some(id) = node else { break };
            let dict = self
                .doc
                .get_dictionary(id)
                .map_err(|e| Error::decode_page(page, e))?;

            let font_map = dict
                .get(b"Resources")
                .ok()
                .and_then(|resources| self.dict(resources))
                .and_then(|resources| resources.get(b"Font").ok())
                .and_then(|fonts| self.dict(fonts));
            if let Some(font_map) = font_map {
                for (name, font) in font_map.iter() {
                    if let Some(font) = self.dict(font) {
                        fonts
                            .entry(String::from_utf8_lossy(name).into_owned())
                            .or_insert(font);
                    }
                }
            }

            node = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }

        Ok(fonts)
    }
}

fn name_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .and_then(Object::as_name)
        .ok()
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

impl DecodedDocument for PdfDocument {
    type Font = PdfFont;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn font_names(&self, page: u32) -> Result<Vec<String>> {
        Ok(self.fonts(page)?.into_keys().collect())
    }

    fn resolve_font(&self, page: u32, name: &str) -> Result<PdfFont> {
        let fonts = self.fonts(page)?;
        let font = fonts
            .get(name)
            .ok_or_else(|| Error::decode_page(page, format!("font {name} not found")))?;
        Ok(PdfFont {
            base_font: name_of(font, b"BaseFont"),
            subtype: name_of(font, b"Subtype"),
            encoding: name_of(font, b"Encoding"),
        })
    }

    fn extract_plain_text(&self, page: u32, fonts: &HashMap<String, PdfFont>) -> Result<String> {
        // lopdf decodes glyphs itself; the resolved fonts are only reported.
        if tracing::enabled!(tracing::Level::TRACE) {
            let fonts: Vec<String> = fonts.values().map(PdfFont::describe).collect();
            trace!(page, ?fonts, "extracting page text");
        }
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::decode_page(page, e))
    }
}
