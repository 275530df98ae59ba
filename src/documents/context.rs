//! Size-bounded context block built from the document store.
//!
//! Every document contributes at most `excerpt_chars` characters of text plus a fixed header
//! and, when cut, a truncation marker. The block therefore grows with the number of documents,
//! never with their size.

use super::store::DocumentSnapshot;

/// Default per-document excerpt length in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 1500;

/// Appended to an excerpt whose document text was cut.
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";

/// Renders stored documents into a context block for prompts.
#[derive(Debug, Clone, Copy)]
pub struct ContextComposer {
    excerpt_chars: usize,
}

impl Default for ContextComposer {
    fn default() -> Self {
        Self::new(DEFAULT_EXCERPT_CHARS)
    }
}

impl ContextComposer {
    /// Create a composer that keeps at most `excerpt_chars` characters per document.
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    /// Per-document excerpt length in characters.
    pub fn excerpt_chars(&self) -> usize {
        self.excerpt_chars
    }

    /// Build the context block for `snapshot`; empty when the snapshot holds no documents.
    pub fn compose(&self, snapshot: &DocumentSnapshot) -> String {
        snapshot
            .iter()
            .map(|record| {
                let (excerpt, truncated) = excerpt(&record.text, self.excerpt_chars);
                render_section(&record.filename, excerpt, truncated)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_section(filename: &str, excerpt: &str, truncated: bool) -> String {
    let marker = if truncated { TRUNCATION_MARKER } else { "" };
    format!("### File: {filename}\n{excerpt}{marker}\n")
}

/// Leading `limit` characters of `text` and whether anything was cut.
fn excerpt(text: &str, limit: usize) -> (&str, bool) {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}
