use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CONTEXT_EXCERPT_CHARS: usize = 1500;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Rusty Companion server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Chat completion backend.
    pub chat_provider: ChatProvider,
    /// Base URL of the chat completion service.
    pub chat_base_url: String,
    /// Model identifier passed to the chat completion service.
    pub chat_model: String,
    /// Optional bearer token for the chat completion service.
    pub chat_api_key: Option<String>,
    /// Optional sampling temperature forwarded to the chat service.
    pub chat_temperature: Option<f32>,
    /// Speech synthesis backend.
    pub speech_provider: SpeechProvider,
    /// Base URL of the speech synthesis service.
    pub speech_base_url: String,
    /// Optional API key for the speech synthesis service.
    pub speech_api_key: Option<String>,
    /// Optional speech model identifier.
    pub speech_model: Option<String>,
    /// Voice used when a speech request does not name one.
    pub speech_voice: String,
    /// Request timeout applied to every upstream call.
    pub upstream_timeout_secs: u64,
    /// Per-document excerpt length used when composing chat context.
    pub context_excerpt_chars: usize,
    /// Upper bound on upload request bodies.
    pub max_upload_bytes: usize,
}

/// Supported chat completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    /// OpenAI-compatible `/chat/completions` endpoint.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

/// Supported speech synthesis backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    /// Speech synthesis disabled; every request is reported as unavailable.
    None,
    /// ElevenLabs text-to-speech API.
    ElevenLabs,
    /// OpenAI `/audio/speech` API.
    OpenAI,
}

impl ChatProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Ollama => "http://127.0.0.1:11434",
        }
    }
}

impl SpeechProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::None | Self::ElevenLabs => "https://api.elevenlabs.io",
            Self::OpenAI => "https://api.openai.com/v1",
        }
    }

    fn default_voice(self) -> &'static str {
        match self {
            Self::None | Self::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
            Self::OpenAI => "alloy",
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset so that an empty line in `.env` falls back to the
    /// documented default instead of failing to parse.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let chat_provider = optional("CHAT_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("CHAT_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(ChatProvider::OpenAI);
        let speech_provider = optional("SPEECH_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("SPEECH_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(SpeechProvider::None);

        Ok(Self {
            server_port: parse_optional(optional("SERVER_PORT"), "SERVER_PORT")?,
            chat_provider,
            chat_base_url: optional("CHAT_BASE_URL")
                .unwrap_or_else(|| chat_provider.default_base_url().to_string()),
            chat_model: optional("CHAT_MODEL")
                .ok_or_else(|| ConfigError::MissingVariable("CHAT_MODEL".into()))?,
            chat_api_key: optional("CHAT_API_KEY"),
            chat_temperature: parse_optional(optional("CHAT_TEMPERATURE"), "CHAT_TEMPERATURE")?,
            speech_provider,
            speech_base_url: optional("SPEECH_BASE_URL")
                .unwrap_or_else(|| speech_provider.default_base_url().to_string()),
            speech_api_key: optional("SPEECH_API_KEY"),
            speech_model: optional("SPEECH_MODEL"),
            speech_voice: optional("SPEECH_VOICE")
                .unwrap_or_else(|| speech_provider.default_voice().to_string()),
            upstream_timeout_secs: parse_optional(
                optional("UPSTREAM_TIMEOUT_SECS"),
                "UPSTREAM_TIMEOUT_SECS",
            )?
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            context_excerpt_chars: parse_optional(
                optional("CONTEXT_EXCERPT_CHARS"),
                "CONTEXT_EXCERPT_CHARS",
            )?
            .unwrap_or(DEFAULT_CONTEXT_EXCERPT_CHARS),
            max_upload_bytes: parse_optional(optional("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for ChatProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SpeechProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "disabled" => Ok(Self::None),
            "elevenlabs" => Ok(Self::ElevenLabs),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_port = ?config.server_port,
        chat_provider = ?config.chat_provider,
        chat_model = %config.chat_model,
        speech_provider = ?config.speech_provider,
        context_excerpt_chars = config.context_excerpt_chars,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_source(|key| values.get(key).cloned())
    }

    #[test]
    fn applies_defaults_when_only_model_is_set() {
        let config = load(&[("CHAT_MODEL", "gpt-4o-mini")]).expect("config");
        assert_eq!(config.chat_provider, ChatProvider::OpenAI);
        assert_eq!(config.chat_base_url, "https://api.openai.com/v1");
        assert_eq!(config.speech_provider, SpeechProvider::None);
        assert_eq!(config.context_excerpt_chars, 1500);
        assert_eq!(config.upstream_timeout_secs, 60);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert!(config.server_port.is_none());
        assert!(config.chat_api_key.is_none());
    }

    #[test]
    fn missing_chat_model_is_reported() {
        let error = load(&[]).expect_err("missing model");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "CHAT_MODEL"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[
            ("CHAT_MODEL", "llama3.1"),
            ("CHAT_PROVIDER", "Ollama"),
            ("CHAT_BASE_URL", "   "),
            ("SERVER_PORT", ""),
        ])
        .expect("config");
        assert_eq!(config.chat_provider, ChatProvider::Ollama);
        assert_eq!(config.chat_base_url, "http://127.0.0.1:11434");
        assert!(config.server_port.is_none());
    }

    #[test]
    fn speech_provider_selects_voice_defaults() {
        let config = load(&[("CHAT_MODEL", "m"), ("SPEECH_PROVIDER", "openai")]).expect("config");
        assert_eq!(config.speech_provider, SpeechProvider::OpenAI);
        assert_eq!(config.speech_voice, "alloy");
        assert_eq!(config.speech_base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let error = load(&[("CHAT_MODEL", "m"), ("CONTEXT_EXCERPT_CHARS", "many")])
            .expect_err("invalid excerpt size");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "CONTEXT_EXCERPT_CHARS"));

        let error = load(&[("CHAT_MODEL", "m"), ("CHAT_PROVIDER", "claude")])
            .expect_err("invalid provider");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "CHAT_PROVIDER"));
    }
}
