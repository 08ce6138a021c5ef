//! Anthropic Claude messages adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Secret;
use crate::error::{GenesisError, Result};

use super::provider::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind, describe_failure,
    http_client,
};

/// Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version.
const API_VERSION: &str = "2023-06-01";

/// Response token budget for generation requests.
const MAX_TOKENS: u32 = 4000;

/// Anthropic Claude adapter.
pub struct AnthropicAdapter {
    client: Client,
    api_key: Secret,
    model: String,
    base_url: String,
}

impl AnthropicAdapter {
    /// Create an adapter from a provider configuration.
    pub fn new(config: &ProviderConfiguration, timeout: Duration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: http_client(timeout)?,
            api_key: config.credential.clone(),
            model: config.model.clone(),
            base_url: config.base_url(DEFAULT_BASE_URL),
        })
    }

    /// Build headers for API requests.
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key.expose())
                .map_err(|e| GenesisError::Config(format!("Invalid API key: {}", e)))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn upstream(&self, message: impl Into<String>) -> GenesisError {
        GenesisError::upstream(ProviderKind::Anthropic, &self.model, message)
    }
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        debug!(model = %self.model, "Sending messages request");
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.upstream(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.upstream(describe_failure(response).await));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse API response: {}", e)))?;

        // Extract text from response
        api_response
            .content
            .into_iter()
            .find_map(|block| {
                if block.content_type == "text" {
                    Some(block.text)
                } else {
                    None
                }
            })
            .ok_or_else(|| self.upstream("No text in API response"))
    }

    /// There is no cheap probe endpoint; report readiness from configuration alone.
    async fn probe(&self) -> Result<HealthStatus> {
        Ok(HealthStatus::new(HealthState::Ready, "Configured and ready")
            .with_provider(ProviderKind::Anthropic.as_str())
            .with_model(&self.model))
    }
}

/// Messages API response structure.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Content block in API response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> AnthropicAdapter {
        let config = ProviderConfiguration::new(ProviderKind::Anthropic, "claude-3-haiku", "key-1");
        AnthropicAdapter::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_headers_carry_key_and_version() {
        let headers = adapter().build_headers().unwrap();
        assert_eq!(headers["x-api-key"], "key-1");
        assert_eq!(headers["anthropic-version"], API_VERSION);
    }

    #[tokio::test]
    async fn test_probe_is_optimistic() {
        // The default base URL is never contacted.
        let status = adapter().probe().await.unwrap();
        assert_eq!(status.status, HealthState::Ready);
        assert_eq!(status.model.as_deref(), Some("claude-3-haiku"));
    }

    #[test]
    fn test_first_text_block_wins() {
        let raw = r#"{"content": [{"type": "tool_use", "id": "t"}, {"type": "text", "text": "hello"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text = parsed.content.into_iter().find(|b| b.content_type == "text").map(|b| b.text);
        assert_eq!(text.as_deref(), Some("hello"));
    }
}
