use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload, chat, and speech activity.
#[derive(Default)]
pub struct CompanionMetrics {
    documents_ingested: AtomicU64,
    ingestion_failures: AtomicU64,
    chat_requests: AtomicU64,
    chat_failures: AtomicU64,
    replies_without_metadata: AtomicU64,
    speech_requests: AtomicU64,
    speech_failures: AtomicU64,
}

impl CompanionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully stored upload.
    pub fn record_ingestion(&self) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upload rejected during extraction.
    pub fn record_ingestion_failure(&self) {
        self.ingestion_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed chat turn and whether it carried usable metadata.
    pub fn record_chat(&self, has_metadata: bool) {
        self.chat_requests.fetch_add(1, Ordering::Relaxed);
        if !has_metadata {
            self.replies_without_metadata
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a chat turn that failed upstream.
    pub fn record_chat_failure(&self) {
        self.chat_requests.fetch_add(1, Ordering::Relaxed);
        self.chat_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a speech synthesis attempt.
    pub fn record_speech(&self, succeeded: bool) {
        self.speech_requests.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.speech_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            ingestion_failures: self.ingestion_failures.load(Ordering::Relaxed),
            chat_requests: self.chat_requests.load(Ordering::Relaxed),
            chat_failures: self.chat_failures.load(Ordering::Relaxed),
            replies_without_metadata: self.replies_without_metadata.load(Ordering::Relaxed),
            speech_requests: self.speech_requests.load(Ordering::Relaxed),
            speech_failures: self.speech_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads stored since startup (re-uploads included).
    pub documents_ingested: u64,
    /// Uploads rejected as unsupported or corrupt.
    pub ingestion_failures: u64,
    /// Chat turns attempted.
    pub chat_requests: u64,
    /// Chat turns that failed because the chat service was unavailable.
    pub chat_failures: u64,
    /// Successful chat turns whose reply carried no decodable metadata line.
    pub replies_without_metadata: u64,
    /// Speech synthesis attempts.
    pub speech_requests: u64,
    /// Speech synthesis attempts that failed upstream.
    pub speech_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_chat_outcomes() {
        let metrics = CompanionMetrics::new();
        metrics.record_chat(true);
        metrics.record_chat(false);
        metrics.record_chat_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chat_requests, 3);
        assert_eq!(snapshot.chat_failures, 1);
        assert_eq!(snapshot.replies_without_metadata, 1);
    }

    #[test]
    fn records_ingestion_and_speech() {
        let metrics = CompanionMetrics::new();
        metrics.record_ingestion();
        metrics.record_ingestion();
        metrics.record_ingestion_failure();
        metrics.record_speech(true);
        metrics.record_speech(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.ingestion_failures, 1);
        assert_eq!(snapshot.speech_requests, 2);
        assert_eq!(snapshot.speech_failures, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(CompanionMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
