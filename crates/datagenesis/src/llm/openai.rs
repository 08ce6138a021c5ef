//! OpenAI chat completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Secret;
use crate::error::{GenesisError, Result};

use super::provider::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind, describe_failure,
    http_client,
};

/// OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling temperature for generation requests.
const TEMPERATURE: f64 = 0.7;

/// OpenAI adapter. Authenticates with a bearer token.
pub struct OpenAiAdapter {
    client: Client,
    api_key: Secret,
    model: String,
    base_url: String,
}

impl OpenAiAdapter {
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
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
                .map_err(|e| GenesisError::Config(format!("Invalid API key: {}", e)))?,
        );
        Ok(headers)
    }

    fn upstream(&self, message: impl Into<String>) -> GenesisError {
        GenesisError::upstream(ProviderKind::OpenAi, &self.model, message)
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": TEMPERATURE
        });

        debug!(model = %self.model, "Sending chat completion request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.upstream(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.upstream(describe_failure(response).await));
        }

        let api_response: ChatCompletion = response
            .json()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse API response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.upstream("No response from OpenAI"))
    }

    async fn probe(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| self.upstream(format!("API request failed: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(self.upstream(describe_failure(response).await));
        }

        Ok(HealthStatus::new(HealthState::Online, "Connection successful")
            .with_provider(ProviderKind::OpenAi.as_str())
            .with_model(&self.model))
    }
}

/// Chat completions response structure.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
