//! Process-lifetime document store shared by every upload and chat request.
//!
//! Writers serialize through a single `RwLock` and replace the record list copy-on-write, so a
//! reader that took a [`DocumentSnapshot`] keeps seeing exactly the records that existed when it
//! was taken. Records themselves are `Arc`-shared, which keeps the copy cheap: only pointers are
//! cloned when a snapshot is still alive during an upsert.

use std::sync::{Arc, PoisonError, RwLock};

use super::types::DocumentRecord;

/// Ordered, filename-keyed collection of ingested documents.
///
/// Iteration order is most-recent-write last: re-uploading a filename moves it to the end.
#[derive(Default)]
pub struct DocumentStore {
    records: RwLock<Arc<Vec<Arc<DocumentRecord>>>>,
}

/// Immutable view of the store taken at a single instant.
#[derive(Debug, Clone, Default)]
pub struct DocumentSnapshot {
    records: Arc<Vec<Arc<DocumentRecord>>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any record for `filename` and append the new one at the end of store order.
    pub fn upsert(
        &self,
        filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Arc<DocumentRecord> {
        let record = Arc::new(DocumentRecord::new(filename, text));
        let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let records = Arc::make_mut(&mut *guard);
        records.retain(|existing| existing.filename != record.filename);
        records.push(Arc::clone(&record));
        tracing::debug!(
            filename = %record.filename,
            documents = records.len(),
            "Document stored"
        );
        record
    }

    /// Take a consistent snapshot of the current records in store order.
    pub fn list(&self) -> DocumentSnapshot {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        DocumentSnapshot {
            records: Arc::clone(&*guard),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no document has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSnapshot {
    /// Records in store order.
    pub fn records(&self) -> &[Arc<DocumentRecord>] {
        &self.records
    }

    /// Iterate records in store order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.iter().map(|record| record.as_ref())
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
