//! Companion pipeline: uploads into the document store, chat turns over it, and speech output.

mod service;
pub mod types;

pub use service::{PipelineApi, PipelineService};
pub use types::{PipelineError, UploadOutcome};
