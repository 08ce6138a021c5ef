//! Ollama local model adapter.
//!
//! Ollama runs models locally without API keys.
//! Install from: https://ollama.ai

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::DEFAULT_OLLAMA_HOST;
use crate::error::{GenesisError, Result};

use super::provider::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind, describe_failure,
    http_client,
};

/// Ollama adapter. No authentication.
pub struct OllamaAdapter {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaAdapter {
    /// Create an adapter from a provider configuration.
    ///
    /// The endpoint defaults to `http://localhost:11434`.
    pub fn new(config: &ProviderConfiguration, timeout: Duration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: http_client(timeout)?,
            model: config.model.clone(),
            base_url: config.base_url(DEFAULT_OLLAMA_HOST),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers for API requests.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn request_failed(&self, e: reqwest::Error) -> GenesisError {
        if e.is_connect() {
            self.upstream(format!(
                "Failed to connect to Ollama at {}. Is it running? Start with: ollama serve",
                self.base_url
            ))
        } else {
            self.upstream(format!("Ollama request failed: {}", e))
        }
    }

    fn upstream(&self, message: impl Into<String>) -> GenesisError {
        GenesisError::upstream(ProviderKind::Ollama, &self.model, message)
    }
}

#[async_trait]
impl LlmAdapter for OllamaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        debug!(model = %self.model, base_url = %self.base_url, "Sending generate request");
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        if !response.status().is_success() {
            let failure = describe_failure(response).await;

            // Check for model not found error
            if failure.contains("not found") {
                return Err(self.upstream(format!(
                    "Model '{}' not found. Pull it with: ollama pull {} ({})",
                    self.model, self.model, failure
                )));
            }
            return Err(self.upstream(failure));
        }

        let api_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(api_response.response)
    }

    async fn probe(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(self.upstream(describe_failure(response).await));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse Ollama tags: {}", e)))?;
        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();

        Ok(HealthStatus::new(HealthState::Online, "Connection successful")
            .with_provider(ProviderKind::Ollama.as_str())
            .with_model(&self.model)
            .with_extra("available_models", models))
    }
}

/// Ollama generate response structure.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama tags response structure.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
