//! Pipeline service coordinating extraction, the document store, and the upstream clients.

use crate::{
    chat::{ChatClient, ChatReply, build_chat_client, build_prompt, parse_response},
    config::Config,
    documents::{ContextComposer, DocumentStore, DocumentSummary, IngestionError, extract_text},
    metrics::{CompanionMetrics, MetricsSnapshot},
    pipeline::types::{PipelineError, UploadOutcome},
    speech::{SpeechClient, SpeechRequest, SynthesizedSpeech, build_speech_client},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Coordinates uploads, chat turns, and speech synthesis over one shared document store.
///
/// The store is created once and shared through an `Arc`; every upload writes to it and every
/// chat turn reads a snapshot of it. Construct the service near process start and hand it to the
/// HTTP layer behind an `Arc`.
pub struct PipelineService {
    store: Arc<DocumentStore>,
    chat_client: Box<dyn ChatClient + Send + Sync>,
    speech_client: Box<dyn SpeechClient + Send + Sync>,
    composer: ContextComposer,
    metrics: Arc<CompanionMetrics>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Extract text from an upload and store it under `filename`.
    async fn ingest_upload(
        &self,
        filename: String,
        bytes: Vec<u8>,
        declared_mime: String,
    ) -> Result<UploadOutcome, PipelineError>;

    /// Answer one user utterance using the stored documents as context.
    async fn chat(&self, utterance: &str) -> Result<ChatReply, PipelineError>;

    /// Turn text into audio, using the provider's default voice when `voice` is `None`.
    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedSpeech, PipelineError>;

    /// Summaries of the stored documents in store order.
    fn list_documents(&self) -> Vec<DocumentSummary>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Build a service with a fresh store and the clients selected by `config`.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        tracing::info!("Initializing upstream clients");
        let chat_client = build_chat_client(config)?;
        let speech_client = build_speech_client(config)?;
        tracing::info!("Upstream clients initialized");

        Ok(Self::from_parts(
            Arc::new(DocumentStore::new()),
            chat_client,
            speech_client,
            config.context_excerpt_chars,
        ))
    }

    /// Assemble a service from already constructed parts.
    pub fn from_parts(
        store: Arc<DocumentStore>,
        chat_client: Box<dyn ChatClient + Send + Sync>,
        speech_client: Box<dyn SpeechClient + Send + Sync>,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            store,
            chat_client,
            speech_client,
            composer: ContextComposer::new(excerpt_chars),
            metrics: Arc::new(CompanionMetrics::new()),
        }
    }

    /// Shared document store backing this service.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Extract text on a blocking worker, then upsert it.
    ///
    /// Extraction failures leave the store untouched. An empty extraction result is still stored.
    pub async fn ingest_upload(
        &self,
        filename: String,
        bytes: Vec<u8>,
        declared_mime: String,
    ) -> Result<UploadOutcome, PipelineError> {
        if filename.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "upload is missing a filename".into(),
            ));
        }
        tracing::info!(
            filename = %filename,
            mime = %declared_mime,
            bytes = bytes.len(),
            "Ingesting upload"
        );

        let worker_filename = filename.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_text(&worker_filename, &bytes, &declared_mime)
        })
        .await
        .unwrap_or_else(|error| {
            Err(IngestionError::Interrupted {
                filename: filename.clone(),
                reason: error.to_string(),
            })
        });

        let text = match extracted {
            Ok(text) => text,
            Err(error) => {
                self.metrics.record_ingestion_failure();
                tracing::warn!(filename = %filename, error = %error, "Upload rejected");
                return Err(error.into());
            }
        };

        let record = self.store.upsert(filename, text);
        self.metrics.record_ingestion();
        tracing::info!(
            filename = %record.filename,
            characters = record.char_count(),
            stored = self.store.len(),
            "Upload ingested"
        );

        Ok(UploadOutcome::from(&*record))
    }

    /// Run one chat turn: snapshot, compose context, prompt, complete, parse.
    pub async fn chat(&self, utterance: &str) -> Result<ChatReply, PipelineError> {
        let snapshot = self.store.list();
        let context = self.composer.compose(&snapshot);
        let prompt = build_prompt(utterance, &context);
        tracing::debug!(
            documents = snapshot.len(),
            context_chars = context.chars().count(),
            prompt_chars = prompt.chars().count(),
            "Composed chat prompt"
        );

        let raw = match self.chat_client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                self.metrics.record_chat_failure();
                tracing::warn!(error = %error, "Chat turn failed");
                return Err(error.into());
            }
        };

        let reply = parse_response(&raw);
        self.metrics.record_chat(!reply.meta.is_empty());
        tracing::info!(
            reply_chars = reply.reply.chars().count(),
            meta_keys = reply.meta.len(),
            "Chat turn completed"
        );
        Ok(reply)
    }

    /// Synthesize `text` with the configured speech provider.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedSpeech, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "speech text must not be empty".into(),
            ));
        }
        let voice = voice
            .filter(|voice| !voice.trim().is_empty())
            .unwrap_or_else(|| self.speech_client.default_voice());
        let request = SpeechRequest::new(text, voice);

        match self.speech_client.synthesize(&request).await {
            Ok(speech) => {
                self.metrics.record_speech(true);
                tracing::info!(
                    voice = %request.voice,
                    audio_bytes = speech.audio.len(),
                    "Speech synthesized"
                );
                Ok(speech)
            }
            Err(error) => {
                self.metrics.record_speech(false);
                tracing::warn!(error = %error, "Speech synthesis failed");
                Err(error.into())
            }
        }
    }

    /// Summaries of the stored documents in store order.
    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        self.store
            .list()
            .iter()
            .map(|record| record.summary())
            .collect()
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn ingest_upload(
        &self,
        filename: String,
        bytes: Vec<u8>,
        declared_mime: String,
    ) -> Result<UploadOutcome, PipelineError> {
        PipelineService::ingest_upload(self, filename, bytes, declared_mime).await
    }

    async fn chat(&self, utterance: &str) -> Result<ChatReply, PipelineError> {
        PipelineService::chat(self, utterance).await
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedSpeech, PipelineError> {
        PipelineService::synthesize_speech(self, text, voice).await
    }

    fn list_documents(&self) -> Vec<DocumentSummary> {
        PipelineService::list_documents(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineService::metrics_snapshot(self)
    }
}
