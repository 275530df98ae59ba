//! Shared HTTP plumbing for the chat completion and speech synthesis services.
//!
//! Every upstream failure is reported once, without retry: transport errors and timeouts become
//! [`UpstreamServiceError::Unreachable`], non-2xx responses become
//! [`UpstreamServiceError::UnexpectedStatus`].

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// External service a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamService {
    /// Chat completion service.
    Chat,
    /// Speech synthesis service.
    Speech,
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => f.write_str("chat"),
            Self::Speech => f.write_str("speech"),
        }
    }
}

/// Errors raised while calling an upstream service.
#[derive(Debug, Error)]
pub enum UpstreamServiceError {
    /// No provider is configured for the service.
    #[error("{0} service is not configured")]
    NotConfigured(UpstreamService),
    /// The request never produced a response (connection failure, timeout).
    #[error("{service} service unreachable: {message}")]
    Unreachable {
        /// Service that was called.
        service: UpstreamService,
        /// Transport diagnostic.
        message: String,
    },
    /// The service answered with a non-success status.
    #[error("{service} service returned {status}: {body}")]
    UnexpectedStatus {
        /// Service that was called.
        service: UpstreamService,
        /// HTTP status returned.
        status: StatusCode,
        /// Response body, if any.
        body: String,
    },
    /// The service answered successfully but the body was unusable.
    #[error("{service} service sent a malformed response: {message}")]
    InvalidResponse {
        /// Service that was called.
        service: UpstreamService,
        /// Decoding diagnostic.
        message: String,
    },
}

impl UpstreamServiceError {
    /// Service the failing request was addressed to.
    pub fn service(&self) -> UpstreamService {
        match self {
            Self::NotConfigured(service) => *service,
            Self::Unreachable { service, .. }
            | Self::UnexpectedStatus { service, .. }
            | Self::InvalidResponse { service, .. } => *service,
        }
    }

    pub(crate) fn invalid_response(service: UpstreamService, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

/// Build an HTTP client with the crate user agent and a request timeout.
pub(crate) fn build_http_client(
    service: UpstreamService,
    timeout: Duration,
) -> Result<Client, UpstreamServiceError> {
    Client::builder()
        .user_agent(concat!("rusty-companion/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|error| UpstreamServiceError::Unreachable {
            service,
            message: format!("failed to construct HTTP client: {error}"),
        })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Send a request and turn transport failures and non-2xx statuses into errors.
pub(crate) async fn send(
    service: UpstreamService,
    request: RequestBuilder,
) -> Result<Response, UpstreamServiceError> {
    let response = request.send().await.map_err(|error| {
        let message = if error.is_timeout() {
            format!("request timed out: {error}")
        } else {
            error.to_string()
        };
        tracing::warn!(%service, %message, "Upstream request failed");
        UpstreamServiceError::Unreachable { service, message }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%service, %status, "Upstream returned error status");
    Err(UpstreamServiceError::UnexpectedStatus {
        service,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes() {
        assert_eq!(
            endpoint("http://host/v1/", "/chat/completions"),
            "http://host/v1/chat/completions"
        );
        assert_eq!(endpoint("http://host", "api/generate"), "http://host/api/generate");
    }

    #[test]
    fn errors_report_their_service() {
        let error = UpstreamServiceError::UnexpectedStatus {
            service: UpstreamService::Speech,
            status: StatusCode::BAD_GATEWAY,
            body: "down".into(),
        };
        assert_eq!(error.service(), UpstreamService::Speech);
        assert_eq!(error.to_string(), "speech service returned 502 Bad Gateway: down");
        assert_eq!(
            UpstreamServiceError::NotConfigured(UpstreamService::Chat).to_string(),
            "chat service is not configured"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_reported() {
        let client =
            build_http_client(UpstreamService::Chat, Duration::from_millis(500)).expect("client");
        let error = send(UpstreamService::Chat, client.get("http://127.0.0.1:9/unreachable"))
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(
            error,
            UpstreamServiceError::Unreachable {
                service: UpstreamService::Chat,
                ..
            }
        ));
    }
}
