//! LlmClient (C9): provider-agnostic completion. Routes through the
//! provider's structured-output endpoint first, falls back to
//! `json_object` mode when the provider rejects `json_schema`, retries
//! transport failures, and bounds every call by a wall-clock timeout.

mod http_backend;
mod mock_backend;

pub use http_backend::HttpBackend;
pub use mock_backend::MockBackend;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_format: Value,
}

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned non-2xx status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed provider payload: {0}")]
    MalformedPayload(String),
}

impl LlmError {
    /// Whether the backend already exhausted its own retry budget for
    /// this error, i.e. whether the orchestrator could sensibly try
    /// again at the batch level. `Http` with a 5xx status and
    /// `Transport` are retried internally by `HttpBackend` before
    /// surfacing; if one still reaches the caller, retrying again at
    /// the batch level is the same kind of transient failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::Timeout(_)
        ) || matches!(self, LlmError::Http { status, .. } if (500..600).contains(status))
    }
}

/// Substrings a provider uses to reject the `json_schema` response
/// format; on seeing one, the caller falls back to `json_object` mode.
const JSON_SCHEMA_REJECTION_MARKERS: &[&str] = &[
    "Unsupported parameter",
    "Unknown parameter",
    "response_format",
    "text.format",
];

pub fn is_json_schema_rejection(message: &str) -> bool {
    JSON_SCHEMA_REJECTION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Issues the request, returning the assistant's raw JSON document
    /// as a string. Implementations are responsible for the
    /// json_schema/json_object routing and fallback described above.
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

/// Resolves a configured provider name to a concrete backend.
pub fn construct_backend(
    provider: &str,
    api_key: Option<String>,
    timeout: Duration,
) -> Box<dyn LlmBackend> {
    match provider {
        "mock" => Box::new(MockBackend::default()),
        _ => Box::new(HttpBackend::new(provider, api_key, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json_schema_rejection_markers() {
        assert!(is_json_schema_rejection(
            "Unsupported parameter: text.format"
        ));
        assert!(!is_json_schema_rejection("rate limited, try again"));
    }
}
