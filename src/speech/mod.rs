//! Speech synthesis adapters.
//!
//! Synthesis is independent of the document pipeline: text goes out, encoded audio comes back.
//! Requests are capped at [`MAX_SPEECH_CHARS`] characters before they leave the process.

use crate::config::{Config, SpeechProvider};
use crate::upstream::{self, UpstreamService, UpstreamServiceError};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::json;
use std::time::Duration;

/// Longest text forwarded to the speech service, in characters.
pub const MAX_SPEECH_CHARS: usize = 1000;

const SERVICE: UpstreamService = UpstreamService::Speech;
const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";
const ELEVENLABS_DEFAULT_MODEL: &str = "eleven_multilingual_v2";
const OPENAI_DEFAULT_MODEL: &str = "tts-1";

/// Text and voice sent to the speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to speak, at most [`MAX_SPEECH_CHARS`] characters.
    pub text: String,
    /// Provider-specific voice identifier.
    pub voice: String,
}

impl SpeechRequest {
    /// Build a request, truncating `text` to [`MAX_SPEECH_CHARS`] characters.
    pub fn new(text: &str, voice: impl Into<String>) -> Self {
        Self {
            text: truncate_chars(text, MAX_SPEECH_CHARS).to_string(),
            voice: voice.into(),
        }
    }
}

/// Encoded audio returned by the speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSpeech {
    /// Encoded audio bytes.
    pub audio: Vec<u8>,
    /// MIME type reported by the service.
    pub content_type: String,
}

/// Interface implemented by speech synthesis backends.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesize `request` into encoded audio.
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> Result<SynthesizedSpeech, UpstreamServiceError>;

    /// Voice used when the caller does not name one.
    fn default_voice(&self) -> &str;
}

/// Build the speech client selected by configuration.
pub fn build_speech_client(
    config: &Config,
) -> Result<Box<dyn SpeechClient + Send + Sync>, UpstreamServiceError> {
    let settings = SpeechSettings {
        base_url: config.speech_base_url.clone(),
        api_key: config.speech_api_key.clone(),
        model: config.speech_model.clone(),
        voice: config.speech_voice.clone(),
    };
    let timeout = Duration::from_secs(config.upstream_timeout_secs);
    tracing::debug!(provider = ?config.speech_provider, "Initialized speech client");
    Ok(match config.speech_provider {
        SpeechProvider::None => Box::new(DisabledSpeechClient {
            voice: settings.voice,
        }),
        SpeechProvider::ElevenLabs => Box::new(ElevenLabsSpeechClient {
            http: upstream::build_http_client(SERVICE, timeout)?,
            settings,
        }),
        SpeechProvider::OpenAI => Box::new(OpenAiSpeechClient {
            http: upstream::build_http_client(SERVICE, timeout)?,
            settings,
        }),
    })
}

#[derive(Debug, Clone)]
struct SpeechSettings {
    base_url: String,
    api_key: Option<String>,
    model: Option<String>,
    voice: String,
}

/// Placeholder used when no speech provider is configured.
pub struct DisabledSpeechClient {
    voice: String,
}

/// Client for the ElevenLabs text-to-speech API.
pub struct ElevenLabsSpeechClient {
    http: Client,
    settings: SpeechSettings,
}

/// Client for the OpenAI `/audio/speech` API.
pub struct OpenAiSpeechClient {
    http: Client,
    settings: SpeechSettings,
}

#[async_trait]
impl SpeechClient for DisabledSpeechClient {
    async fn synthesize(
        &self,
        _request: &SpeechRequest,
    ) -> Result<SynthesizedSpeech, UpstreamServiceError> {
        Err(UpstreamServiceError::NotConfigured(SERVICE))
    }

    fn default_voice(&self) -> &str {
        &self.voice
    }
}

#[async_trait]
impl SpeechClient for ElevenLabsSpeechClient {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> Result<SynthesizedSpeech, UpstreamServiceError> {
        let payload = json!({
            "text": request.text,
            "model_id": self
                .settings
                .model
                .as_deref()
                .unwrap_or(ELEVENLABS_DEFAULT_MODEL),
        });
        let url = upstream::endpoint(
            &self.settings.base_url,
            &format!("v1/text-to-speech/{}", request.voice),
        );

        let mut builder = self
            .http
            .post(url)
            .header(header::ACCEPT, DEFAULT_AUDIO_TYPE)
            .json(&payload);
        if let Some(key) = self.settings.api_key.as_deref() {
            builder = builder.header("xi-api-key", key);
        }

        read_audio(upstream::send(SERVICE, builder).await?).await
    }

    fn default_voice(&self) -> &str {
        &self.settings.voice
    }
}

#[async_trait]
impl SpeechClient for OpenAiSpeechClient {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> Result<SynthesizedSpeech, UpstreamServiceError> {
        let payload = json!({
            "model": self.settings.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL),
            "input": request.text,
            "voice": request.voice,
            "response_format": "mp3",
        });

        let mut builder = self
            .http
            .post(upstream::endpoint(&self.settings.base_url, "audio/speech"))
            .json(&payload);
        if let Some(key) = self.settings.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        read_audio(upstream::send(SERVICE, builder).await?).await
    }

    fn default_voice(&self) -> &str {
        &self.settings.voice
    }
}

async fn read_audio(
    response: reqwest::Response,
) -> Result<SynthesizedSpeech, UpstreamServiceError> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_AUDIO_TYPE)
        .to_string();
    let audio = response.bytes().await.map_err(|error| {
        UpstreamServiceError::invalid_response(SERVICE, format!("failed to read audio: {error}"))
    })?;
    if audio.is_empty() {
        return Err(UpstreamServiceError::invalid_response(
            SERVICE,
            "speech service returned no audio",
        ));
    }
    Ok(SynthesizedSpeech {
        audio: audio.to_vec(),
        content_type,
    })
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn settings(base_url: String) -> SpeechSettings {
        SpeechSettings {
            base_url,
            api_key: Some("voice-key".into()),
            model: None,
            voice: "default-voice".into(),
        }
    }

    fn http() -> Client {
        upstream::build_http_client(SERVICE, Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn request_text_is_capped() {
        let long = "ü".repeat(MAX_SPEECH_CHARS + 50);
        let request = SpeechRequest::new(&long, "v");
        assert_eq!(request.text.chars().count(), MAX_SPEECH_CHARS);

        let short = SpeechRequest::new("hello", "v");
        assert_eq!(short.text, "hello");
    }

    #[tokio::test]
    async fn elevenlabs_client_returns_audio() {
        let server = MockServer::start_async().await;
        let client = ElevenLabsSpeechClient {
            http: http(),
            settings: settings(server.base_url()),
        };

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/text-to-speech/voice-123")
                    .header("xi-api-key", "voice-key")
                    .json_body_partial(r#"{"text":"Hello there"}"#);
                then.status(200)
                    .header("content-type", "audio/mpeg")
                    .body([0x49u8, 0x44, 0x33, 0x04]);
            })
            .await;

        let speech = client
            .synthesize(&SpeechRequest::new("Hello there", "voice-123"))
            .await
            .expect("audio");
        mock.assert_async().await;
        assert_eq!(speech.audio, vec![0x49, 0x44, 0x33, 0x04]);
        assert_eq!(speech.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn openai_client_reports_failures() {
        let server = MockServer::start_async().await;
        let client = OpenAiSpeechClient {
            http: http(),
            settings: settings(server.base_url()),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/audio/speech");
                then.status(503).body("overloaded");
            })
            .await;

        let error = client
            .synthesize(&SpeechRequest::new("Hi", "alloy"))
            .await
            .expect_err("service unavailable");
        assert!(matches!(
            error,
            UpstreamServiceError::UnexpectedStatus { service: UpstreamService::Speech, .. }
        ));
    }

    #[tokio::test]
    async fn empty_audio_is_invalid() {
        let server = MockServer::start_async().await;
        let client = OpenAiSpeechClient {
            http: http(),
            settings: settings(server.base_url()),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/audio/speech");
                then.status(200).header("content-type", "audio/mpeg");
            })
            .await;

        let error = client
            .synthesize(&SpeechRequest::new("Hi", "alloy"))
            .await
            .expect_err("no audio");
        assert!(matches!(error, UpstreamServiceError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn disabled_client_is_not_configured() {
        let client = DisabledSpeechClient {
            voice: "none".into(),
        };
        let error = client
            .synthesize(&SpeechRequest::new("Hi", "none"))
            .await
            .expect_err("disabled");
        assert!(matches!(error, UpstreamServiceError::NotConfigured(UpstreamService::Speech)));
        assert_eq!(client.default_voice(), "none");
    }
}
