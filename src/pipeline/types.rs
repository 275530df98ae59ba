//! Result and error types returned by the companion pipeline.

use crate::documents::{DocumentRecord, IngestionError};
use crate::upstream::UpstreamServiceError;
use serde::Serialize;
use thiserror::Error;

/// Errors emitted by the pipeline to its callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload could not be turned into stored text.
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    /// Chat or speech service failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamServiceError),
    /// Caller supplied an unusable request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Summary of a stored upload produced by [`crate::pipeline::PipelineService::ingest_upload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Filename the text was stored under.
    pub filename: String,
    /// Characters of extracted text.
    pub characters: usize,
    /// SHA-256 of the extracted text, hex encoded.
    pub content_hash: String,
}

impl From<&DocumentRecord> for UploadOutcome {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            characters: record.char_count(),
            content_hash: record.content_hash.clone(),
        }
    }
}
