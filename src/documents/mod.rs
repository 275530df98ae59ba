//! Document ingestion: text extraction, the shared document store, and context composition.

pub mod context;
pub mod extract;
pub mod store;
pub mod types;

pub use context::{ContextComposer, DEFAULT_EXCERPT_CHARS, TRUNCATION_MARKER};
pub use extract::{
    MIME_PDF, PdfTextExtractor, PlainTextExtractor, SourceFormat, TextExtractor, extract_text,
    extractor_for,
};
pub use store::{DocumentSnapshot, DocumentStore};
pub use types::{DocumentRecord, DocumentSummary, IngestionError, compute_content_hash};
