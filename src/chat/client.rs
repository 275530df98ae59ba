//! Chat completion adapters.
//!
//! The pipeline hands over one fully composed prompt and expects the raw completion text back.
//! Two wire formats are supported: OpenAI-compatible `/chat/completions` (the prompt travels as
//! a single user message) and Ollama's `/api/generate` with streaming disabled.

use crate::config::{ChatProvider, Config};
use crate::upstream::{self, UpstreamService, UpstreamServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SERVICE: UpstreamService = UpstreamService::Chat;

/// Interface implemented by chat completion backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `prompt` and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamServiceError>;
}

/// Build the chat client selected by configuration.
pub fn build_chat_client(
    config: &Config,
) -> Result<Box<dyn ChatClient + Send + Sync>, UpstreamServiceError> {
    let http = upstream::build_http_client(
        SERVICE,
        Duration::from_secs(config.upstream_timeout_secs),
    )?;
    let settings = ChatSettings {
        base_url: config.chat_base_url.clone(),
        model: config.chat_model.clone(),
        api_key: config.chat_api_key.clone(),
        temperature: config.chat_temperature,
    };
    tracing::debug!(
        provider = ?config.chat_provider,
        url = %settings.base_url,
        model = %settings.model,
        "Initialized chat client"
    );
    Ok(match config.chat_provider {
        ChatProvider::OpenAI => Box::new(OpenAiChatClient { http, settings }),
        ChatProvider::Ollama => Box::new(OllamaChatClient { http, settings }),
    })
}

#[derive(Debug, Clone)]
struct ChatSettings {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiChatClient {
    http: Client,
    settings: ChatSettings,
}

/// Client for a local Ollama runtime.
pub struct OllamaChatClient {
    http: Client,
    settings: ChatSettings,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default = "default_done")]
    done: bool,
}

fn default_done() -> bool {
    true
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamServiceError> {
        let mut payload = json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = self.settings.temperature {
            payload["temperature"] = json!(temperature);
        }

        let mut request = self
            .http
            .post(upstream::endpoint(&self.settings.base_url, "chat/completions"))
            .json(&payload);
        if let Some(key) = self.settings.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = upstream::send(SERVICE, request).await?;
        let body: CompletionResponse = response.json().await.map_err(|error| {
            UpstreamServiceError::invalid_response(
                SERVICE,
                format!("failed to decode completion: {error}"),
            )
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                UpstreamServiceError::invalid_response(SERVICE, "completion carried no content")
            })
    }
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamServiceError> {
        let mut payload = json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(temperature) = self.settings.temperature {
            payload["options"] = json!({ "temperature": temperature });
        }

        let mut request = self
            .http
            .post(upstream::endpoint(&self.settings.base_url, "api/generate"))
            .json(&payload);
        if let Some(key) = self.settings.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = upstream::send(SERVICE, request).await?;
        let body: GenerateResponse = response.json().await.map_err(|error| {
            UpstreamServiceError::invalid_response(
                SERVICE,
                format!("failed to decode Ollama response: {error}"),
            )
        })?;

        if !body.done {
            return Err(UpstreamServiceError::invalid_response(
                SERVICE,
                "Ollama response incomplete (streaming not supported)",
            ));
        }

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn settings(base_url: String, api_key: Option<&str>) -> ChatSettings {
        ChatSettings {
            base_url,
            model: "test-model".into(),
            api_key: api_key.map(str::to_string),
            temperature: Some(0.7),
        }
    }

    fn http() -> Client {
        upstream::build_http_client(SERVICE, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn openai_client_returns_first_choice() {
        let server = MockServer::start_async().await;
        let client = OpenAiChatClient {
            http: http(),
            settings: settings(server.url("/v1"), Some("secret")),
        };

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer secret")
                    .json_body_partial(r#"{"model":"test-model","messages":[{"role":"user","content":"Say hi"}]}"#);
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Hi!\nMETA: {}" } }
                    ]
                }));
            })
            .await;

        let text = client.complete("Say hi").await.expect("completion");
        mock.assert_async().await;
        assert_eq!(text, "Hi!\nMETA: {}");
    }

    #[tokio::test]
    async fn openai_client_reports_error_status() {
        let server = MockServer::start_async().await;
        let client = OpenAiChatClient {
            http: http(),
            settings: settings(server.base_url(), None),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body(r#"{"error":{"message":"rate limited"}}"#);
            })
            .await;

        let error = client.complete("hello").await.expect_err("error status");
        match error {
            UpstreamServiceError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status.as_u16(), 429);
                assert!(body.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn openai_client_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        let client = OpenAiChatClient {
            http: http(),
            settings: settings(server.base_url(), None),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client.complete("hello").await.expect_err("no content");
        assert!(matches!(error, UpstreamServiceError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaChatClient {
            http: http(),
            settings: settings(server.base_url(), None),
        };

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{"model":"test-model","stream":false}"#);
                then.status(200).json_body(json!({
                    "response": "Hello from llama",
                    "done": true
                }));
            })
            .await;

        let text = client.complete("Greet me").await.expect("completion");
        mock.assert_async().await;
        assert_eq!(text, "Hello from llama");
    }

    #[tokio::test]
    async fn ollama_client_rejects_malformed_body() {
        let server = MockServer::start_async().await;
        let client = OllamaChatClient {
            http: http(),
            settings: settings(server.base_url(), None),
        };

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body("<html>proxy error</html>");
            })
            .await;

        let error = client.complete("hi").await.expect_err("malformed");
        assert!(matches!(error, UpstreamServiceError::InvalidResponse { .. }));
    }
}
