//! HTTP surface for Rusty Companion.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /upload` – Multipart upload (`file` field). Extracts text from PDF or plain-text files
//!   and stores it under the uploaded filename, replacing any earlier upload of the same name.
//!   Returns `{ ok, filename, characters, content_hash }`, or `{ ok: false, error }`.
//! - `POST /chat` – `{ message }` in, `{ reply, meta }` out. Stored documents are passed to the
//!   model as context.
//! - `POST /speak` – `{ text, voice? }` in, encoded audio out.
//! - `GET /documents` – Stored document summaries in context order.
//! - `GET /metrics` – Upload, chat, and speech counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::chat::ChatReply;
use crate::documents::{DocumentSummary, IngestionError};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{PipelineApi, PipelineError};
use crate::upstream::UpstreamServiceError;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartError, rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const UPLOAD_FIELD: &str = "file";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Build the HTTP router exposing the companion API surface.
///
/// Request bodies are capped at `max_upload_bytes`.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/upload", post(upload_document::<S>))
        .route("/chat", post(chat::<S>))
        .route("/speak", post(speak::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Success response for the `POST /upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    ok: bool,
    filename: String,
    characters: usize,
    content_hash: String,
}

/// Store the `file` field of a multipart upload.
///
/// The declared content type of the part selects the extractor; when it is missing or generic the
/// filename suffix decides.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: PipelineApi,
{
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let declared_mime = field.content_type().unwrap_or(FALLBACK_MIME).to_string();
        let bytes = field.bytes().await?;

        let outcome = service
            .ingest_upload(filename, bytes.to_vec(), declared_mime)
            .await?;
        tracing::info!(
            filename = %outcome.filename,
            characters = outcome.characters,
            "Upload request completed"
        );
        return Ok(Json(UploadResponse {
            ok: true,
            filename: outcome.filename,
            characters: outcome.characters,
            content_hash: outcome.content_hash,
        }));
    }

    Err(AppError::bad_request(format!(
        "multipart body has no '{UPLOAD_FIELD}' field"
    )))
}

/// Request body for the `POST /chat` endpoint.
#[derive(Deserialize)]
struct ChatRequest {
    /// What the user said.
    message: String,
}

/// Run one chat turn against the stored documents.
async fn chat<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError>
where
    S: PipelineApi,
{
    let Json(request) = payload?;
    Ok(Json(service.chat(&request.message).await?))
}

/// Request body for the `POST /speak` endpoint.
#[derive(Deserialize)]
struct SpeakRequest {
    text: String,
    #[serde(default)]
    voice: Option<String>,
}

/// Synthesize speech and return the audio bytes with the provider's content type.
async fn speak<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let Json(request) = payload?;
    let speech = service
        .synthesize_speech(&request.text, request.voice.as_deref())
        .await?;
    Ok(([(header::CONTENT_TYPE, speech.content_type)], speech.audio).into_response())
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
}

async fn list_documents<S>(State(service): State<Arc<S>>) -> Json<DocumentsResponse>
where
    S: PipelineApi,
{
    Json(DocumentsResponse {
        documents: service.list_documents(),
    })
}

/// Return the counter snapshot.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload a PDF or text file as multipart field 'file'. Its text becomes context for later chats. Response returns { \"ok\": true, \"filename\": string, \"characters\": number, \"content_hash\": string }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/chat",
                description: "Send a message and receive { \"reply\": string, \"meta\": object } informed by uploaded files.",
                request_example: Some(json!({ "message": "What do my notes say about Friday?" })),
            },
            CommandDescriptor {
                name: "speak",
                method: "POST",
                path: "/speak",
                description: "Synthesize up to 1000 characters of text into audio.",
                request_example: Some(json!({ "text": "Hello there", "voice": "optional-voice-id" })),
            },
            CommandDescriptor {
                name: "documents",
                method: "GET",
                path: "/documents",
                description: "List stored documents in the order they are given to the model.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload, chat, and speech counters.",
                request_example: None,
            },
        ],
    })
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "ok": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        let status = match &inner {
            PipelineError::Ingestion(IngestionError::UnsupportedFormat { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            PipelineError::Ingestion(IngestionError::CorruptDocument { .. }) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::Ingestion(IngestionError::Interrupted { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::Upstream(
                UpstreamServiceError::NotConfigured(_)
                | UpstreamServiceError::Unreachable { .. }
                | UpstreamServiceError::UnexpectedStatus { .. }
                | UpstreamServiceError::InvalidResponse { .. },
            ) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: inner.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(inner: JsonRejection) -> Self {
        Self {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}
