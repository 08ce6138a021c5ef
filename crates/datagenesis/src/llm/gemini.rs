//! Google Gemini adapter.
//!
//! Gemini checks consume metered quota, so the probe here sends a real
//! prompt and `health::MeteredHealthMonitor` wraps the same client with a
//! cache and a quota-preserving readiness check.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Secret;
use crate::error::{GenesisError, Result};

use super::prompts;
use super::provider::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind, describe_failure,
    http_client,
};

/// Generative Language API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client bound to one Gemini model.
///
/// Switching models means building a new client.
pub struct GeminiClient {
    client: Client,
    api_key: Secret,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for `config.model`.
    pub fn new(config: &ProviderConfiguration, timeout: Duration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: http_client(timeout)?,
            api_key: config.credential.clone(),
            model: config.model.clone(),
            base_url: config.base_url(DEFAULT_BASE_URL),
        })
    }

    /// Model this client is bound to.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key.expose())
                .map_err(|e| GenesisError::Config(format!("Invalid API key: {}", e)))?,
        );
        Ok(headers)
    }

    fn upstream(&self, message: impl Into<String>) -> GenesisError {
        GenesisError::upstream(ProviderKind::Gemini, &self.model, message)
    }

    /// Generate text for a single prompt.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [
                {
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        debug!(model = %self.model, "Sending generateContent request");
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.upstream(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.upstream(describe_failure(response).await));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse API response: {}", e)))?;

        api_response
            .text()
            .ok_or_else(|| self.upstream("No text in Gemini response"))
    }
}

/// Gemini adapter used by the orchestrator.
pub struct GeminiAdapter {
    client: GeminiClient,
}

impl GeminiAdapter {
    /// Create an adapter from a provider configuration.
    pub fn new(config: &ProviderConfiguration, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config, timeout)?,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Underlying client.
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }
}

#[async_trait]
impl LlmAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        self.client.model_name()
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        self.client.generate_content(prompt).await
    }

    /// Sends a real prompt. Quota exhaustion is reported as a state, not an error.
    async fn probe(&self) -> Result<HealthStatus> {
        match self.client.generate_content(prompts::PROBE_PROMPT).await {
            Ok(_) => Ok(HealthStatus::new(HealthState::Online, "Connection successful")
                .with_provider(ProviderKind::Gemini.as_str())
                .with_model(self.model())),
            Err(e) if e.is_quota() => Ok(HealthStatus::from_error(&e)
                .with_provider(ProviderKind::Gemini.as_str())
                .with_model(self.model())),
            Err(e) => Err(e),
        }
    }
}

/// generateContent response structure.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let parts: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_parts_are_concatenated() {
        let raw = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "```json\n"}, {"text": "{}\n```"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("```json\n{}\n```"));
    }

    #[test]
    fn test_blocked_prompt_has_no_text() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_client_is_bound_to_model() {
        let config = ProviderConfiguration::new(ProviderKind::Gemini, "gemini-1.5-pro", "g-key");
        let adapter = GeminiAdapter::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(adapter.model(), "gemini-1.5-pro");
        assert_eq!(adapter.kind(), ProviderKind::Gemini);
    }
}
