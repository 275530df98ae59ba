//! Records held by the document store and the errors raised while ingesting uploads.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Errors raised while turning an upload into stored text.
///
/// Any of these leaves the document store untouched.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Neither the declared MIME type nor the filename suffix names a supported format.
    #[error("unsupported file type for '{filename}' (declared '{declared_mime}')")]
    UnsupportedFormat {
        /// Filename supplied with the upload.
        filename: String,
        /// MIME type declared by the uploader.
        declared_mime: String,
    },
    /// The upload claimed a supported format but could not be parsed.
    #[error("could not read '{filename}': {reason}")]
    CorruptDocument {
        /// Filename supplied with the upload.
        filename: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// The extraction worker stopped before producing a result.
    #[error("extraction of '{filename}' was interrupted: {reason}")]
    Interrupted {
        /// Filename supplied with the upload.
        filename: String,
        /// Join diagnostic from the blocking worker.
        reason: String,
    },
}

/// One ingested upload, unique by filename within a store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    /// Filename the upload was stored under.
    pub filename: String,
    /// Extracted plain text.
    pub text: String,
    /// Moment the record was written.
    pub ingested_at: OffsetDateTime,
    /// SHA-256 of `text`, hex encoded.
    pub content_hash: String,
}

impl DocumentRecord {
    /// Build a record stamped with the current time.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            filename: filename.into(),
            content_hash: compute_content_hash(&text),
            text,
            ingested_at: OffsetDateTime::now_utc(),
        }
    }

    /// Length of the stored text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Read-only summary suitable for listing endpoints.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            filename: self.filename.clone(),
            ingested_at: format_timestamp(self.ingested_at),
            characters: self.char_count(),
            content_hash: self.content_hash.clone(),
        }
    }
}

/// Listing entry for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Filename the upload was stored under.
    pub filename: String,
    /// Ingestion time in RFC 3339.
    pub ingested_at: String,
    /// Length of the stored text in characters.
    pub characters: usize,
    /// SHA-256 of the stored text, hex encoded.
    pub content_hash: String,
}

/// Compute a deterministic SHA-256 hash for stored text.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
