//! Text extraction for uploaded files.
//!
//! Uploads arrive as raw bytes plus a declared MIME type. The declared type picks the
//! extractor when it is recognised; otherwise the filename suffix decides. Two formats are
//! supported:
//!
//! - Paginated documents (PDF): pages are read in page-tree order. Within a page, every
//!   text-showing operator contributes one fragment in content-stream order and fragments are
//!   joined with a single space. Strings are decoded through the encoding of the font selected
//!   by the last `Tf` (standard single-byte encodings or a ToUnicode map). Pages are joined with
//!   a blank line. Stream order is not always visual reading order; multi-column layouts come
//!   out in whatever order the producer wrote them.
//! - Plain text: bytes are decoded as UTF-8 as-is. Invalid sequences become U+FFFD.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Encoding, Object, ObjectId, content::Content};

use super::types::IngestionError;

/// MIME type for PDF uploads.
pub const MIME_PDF: &str = "application/pdf";

const PAGE_SEPARATOR: &str = "\n\n";
const FRAGMENT_SEPARATOR: &str = " ";
const REPLACEMENT_UNIT: u16 = 0xFFFD;

const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/yaml",
    "application/x-yaml",
    "application/javascript",
];

const TEXT_SUFFIXES: &[&str] = &[
    "txt", "text", "md", "markdown", "csv", "tsv", "json", "log", "xml", "yaml", "yml", "html",
    "htm", "rst", "ini", "toml",
];

/// Source format selected for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Page-oriented binary document (PDF).
    Paginated,
    /// UTF-8 text.
    PlainText,
}

impl SourceFormat {
    /// Pick a format from the declared MIME type, falling back to the filename suffix.
    pub fn detect(declared_mime: &str, filename: &str) -> Option<Self> {
        Self::from_mime(declared_mime).or_else(|| Self::from_filename(filename))
    }

    fn from_mime(declared_mime: &str) -> Option<Self> {
        let essence = declared_mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == MIME_PDF {
            Some(Self::Paginated)
        } else if essence.starts_with("text/") || TEXT_MIME_TYPES.contains(&essence.as_str()) {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    fn from_filename(filename: &str) -> Option<Self> {
        let suffix = Path::new(filename)
            .extension()
            .and_then(|value| value.to_str())?
            .to_ascii_lowercase();
        if suffix == "pdf" {
            Some(Self::Paginated)
        } else if TEXT_SUFFIXES.contains(&suffix.as_str()) {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    /// Short label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Paginated => "pdf",
            Self::PlainText => "text",
        }
    }
}

/// Converts raw upload bytes of one format into plain text.
pub trait TextExtractor: Send + Sync {
    /// Format handled by this extractor.
    fn format(&self) -> SourceFormat;

    /// Extract text from `bytes`; `filename` is only used for diagnostics.
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, IngestionError>;
}

/// Extractor for PDF documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

/// Extractor for UTF-8 text files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

static PDF_EXTRACTOR: PdfTextExtractor = PdfTextExtractor;
static PLAIN_TEXT_EXTRACTOR: PlainTextExtractor = PlainTextExtractor;

/// Resolve the extractor for an upload.
pub fn extractor_for(
    declared_mime: &str,
    filename: &str,
) -> Result<&'static dyn TextExtractor, IngestionError> {
    match SourceFormat::detect(declared_mime, filename) {
        Some(SourceFormat::Paginated) => Ok(&PDF_EXTRACTOR),
        Some(SourceFormat::PlainText) => Ok(&PLAIN_TEXT_EXTRACTOR),
        None => Err(IngestionError::UnsupportedFormat {
            filename: filename.to_string(),
            declared_mime: declared_mime.to_string(),
        }),
    }
}

/// Extract text from an upload, selecting the extractor by MIME type or suffix.
pub fn extract_text(
    filename: &str,
    bytes: &[u8],
    declared_mime: &str,
) -> Result<String, IngestionError> {
    let extractor = extractor_for(declared_mime, filename)?;
    tracing::debug!(filename, format = extractor.format().label(), "Extracting upload text");
    extractor.extract(filename, bytes)
}

impl TextExtractor for PdfTextExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Paginated
    }

    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, IngestionError> {
        let pages = extract_pages(bytes).map_err(|error| IngestionError::CorruptDocument {
            filename: filename.to_string(),
            reason: error.to_string(),
        })?;
        tracing::debug!(filename, pages = pages.len(), "PDF text extracted");
        Ok(pages.join(PAGE_SEPARATOR))
    }
}

impl TextExtractor for PlainTextExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::PlainText
    }

    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, IngestionError> {
        let text = String::from_utf8_lossy(bytes);
        if matches!(text, std::borrow::Cow::Owned(_)) {
            tracing::warn!(filename, "Upload contained invalid UTF-8; replaced lossy bytes");
        }
        Ok(text.into_owned())
    }
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, lopdf::Error> {
    let document = Document::load_mem(bytes)?;
    let mut pages = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        let encodings = page_encodings(&document, page_number, page_id);
        let content = document.get_page_content(page_id)?;
        let operations = Content::decode(&content)?.operations;

        let mut encoding = None;
        let mut fragments = Vec::new();
        for operation in &operations {
            if operation.operator == "Tf" {
                encoding = operation
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name));
                continue;
            }
            if let Some(text) = shown_text(&operation.operator, &operation.operands, encoding) {
                fragments.push(text);
            }
        }
        pages.push(fragments.join(FRAGMENT_SEPARATOR));
    }
    Ok(pages)
}

/// Text encodings of the fonts in a page's resources, keyed by resource name.
///
/// Fonts whose encoding lopdf cannot resolve are left out; their strings fall back to
/// [`decode_pdf_string`].
fn page_encodings(
    document: &Document,
    page_number: u32,
    page_id: ObjectId,
) -> BTreeMap<Vec<u8>, Encoding<'_>> {
    let fonts = match document.get_page_fonts(page_id) {
        Ok(fonts) => fonts,
        Err(error) => {
            tracing::debug!(page_number, %error, "Page fonts unavailable");
            return BTreeMap::new();
        }
    };
    fonts
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(document) {
            Ok(encoding) => Some((name, encoding)),
            Err(error) => {
                tracing::debug!(
                    page_number,
                    font = %String::from_utf8_lossy(&name),
                    %error,
                    "Font encoding unresolved"
                );
                None
            }
        })
        .collect()
}

/// Text carried by a single text-showing operator, if `operator` is one.
fn shown_text(operator: &str, operands: &[Object], encoding: Option<&Encoding<'_>>) -> Option<String> {
    let shown = match operator {
        "Tj" | "'" => operands.last()?,
        "\"" => operands.get(2)?,
        "TJ" => operands.first()?,
        _ => return None,
    };
    match shown {
        Object::String(bytes, _) => Some(decode_shown(encoding, bytes)),
        Object::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Object::String(bytes, _) => Some(decode_shown(encoding, bytes)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn decode_shown(encoding: Option<&Encoding<'_>>, bytes: &[u8]) -> String {
    encoding
        .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
        .unwrap_or_else(|| decode_pdf_string(bytes))
}

/// Decode a string without font information: UTF-16BE when it carries a byte-order mark,
/// single-byte otherwise. A dangling odd byte in UTF-16 becomes U+FFFD.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let pairs = rest.chunks_exact(2);
        let dangling = !pairs.remainder().is_empty();
        let mut units: Vec<u16> = pairs
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if dangling {
            units.push(REPLACEMENT_UNIT);
        }
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[cfg(test)]
#[path = "../../tests/common/pdf.rs"]
mod pdf_fixture;
