//! HTTP backend: a single OpenAI-compatible Chat Completions endpoint.
//! Prefers `response_format = {"type":"json_schema", ...}`; on a
//! rejection naming the format parameter, retries once with
//! `{"type":"json_object"}`. Transport failures and 5xx responses are
//! retried with exponential backoff, grounded on the teacher's
//! `HttpClient::execute_with_retry`; 4xx responses (other than a
//! format rejection) are never retried.

use crate::{LlmBackend, LlmError, LlmRequest, is_json_schema_rejection};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Maximum number of retry attempts for 5xx and network failures.
const MAX_RETRIES: u32 = 2;

/// Initial backoff duration for retries; doubles on each subsequent
/// attempt (1s, 2s).
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(provider: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let base_url = match provider {
            "openai" => "https://api.openai.com/v1/chat/completions".to_string(),
            other => other.to_string(),
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
            timeout,
        }
    }

    async fn dispatch_with_retry(
        &self,
        request: &LlmRequest,
        response_format: &serde_json::Value,
    ) -> Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.dispatch_once(request, response_format).await {
                Ok(content) => return Ok(content),
                Err(LlmError::Http { status, body }) if (500..600).contains(&status) => {
                    if attempt <= MAX_RETRIES {
                        tracing::warn!(attempt, status, "server error, retrying");
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(LlmError::Http { status, body });
                }
                Err(LlmError::Transport(message)) => {
                    if attempt <= MAX_RETRIES {
                        tracing::warn!(attempt, error = %message, "transport error, retrying");
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(LlmError::Transport(message));
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn dispatch_once(
        &self,
        request: &LlmRequest,
        response_format: &serde_json::Value,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": request.model,
            "temperature": request.temperature,
            "max_tokens": request.max_output_tokens,
            "response_format": response_format,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        });

        let mut req = self.client.post(&self.base_url).json(&body).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_content(&text)
    }
}

#[async_trait]
impl LlmBackend for HttpBackend {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        match self.dispatch_with_retry(request, &request.response_format).await {
            Ok(content) => Ok(content),
            Err(LlmError::Http { body, .. }) if is_json_schema_rejection(&body) => {
                tracing::warn!("json_schema rejected, falling back to json_object");
                let fallback = json!({"type": "json_object"});
                self.dispatch_with_retry(request, &fallback).await
            }
            Err(other) => Err(other),
        }
    }
}

fn extract_content(raw_body: &str) -> Result<String, LlmError> {
    let parsed: serde_json::Value = serde_json::from_str(raw_body)
        .map_err(|e| LlmError::MalformedPayload(e.to_string()))?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::MalformedPayload("missing choices[0].message.content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_content_from_chat_completions_shape() {
        let body = r#"{"choices":[{"message":{"content":"{\"items\":[]}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "{\"items\":[]}");
    }

    #[test]
    fn malformed_payload_is_an_error_not_a_panic() {
        assert!(extract_content("not json").is_err());
        assert!(extract_content("{}").is_err());
    }
}
