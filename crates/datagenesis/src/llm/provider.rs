//! LLM adapter trait and shared provider types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Secret;
use crate::error::{GenesisError, Result};

/// Supported upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini (metered quota).
    Gemini,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Local Ollama server.
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
    ];

    /// Wire name of the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Model used when the caller does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash-exp",
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Ollama => "llama3.2",
        }
    }

    /// Returns true if the provider refuses unauthenticated requests.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(GenesisError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Everything needed to talk to one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfiguration {
    pub provider: ProviderKind,
    pub model: String,
    pub credential: Secret,
    /// Base URL override. Required only for non-default Ollama hosts.
    pub endpoint: Option<String>,
}

impl ProviderConfiguration {
    /// Create a configuration without an endpoint override.
    pub fn new(provider: ProviderKind, model: impl Into<String>, credential: impl Into<Secret>) -> Self {
        Self {
            provider,
            model: model.into(),
            credential: credential.into(),
            endpoint: None,
        }
    }

    /// Set the base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Check the configuration can be used to build an adapter.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(GenesisError::Config(format!(
                "No model given for provider {}",
                self.provider
            )));
        }
        if self.provider.requires_credential() && self.credential.is_empty() {
            return Err(GenesisError::Config(format!(
                "Missing API key for provider {}",
                self.provider
            )));
        }
        Ok(())
    }

    /// Endpoint with any trailing slash removed, or `default`.
    pub fn base_url(&self, default: &str) -> String {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Liveness/readiness state reported by a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// A real round trip succeeded.
    Online,
    /// Configured; no round trip was made.
    Ready,
    Error,
    /// Upstream reported rate limiting or quota exhaustion.
    QuotaExceeded,
}

/// Health report for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub message: String,

    /// When the status was computed (not when it was served from cache).
    pub checked_at: DateTime<Utc>,

    /// Provider-specific fields such as `available_models`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    /// Create a status stamped with the current time.
    pub fn new(status: HealthState, message: impl Into<String>) -> Self {
        Self {
            status,
            provider: None,
            model: None,
            message: message.into(),
            checked_at: Utc::now(),
            extra: Map::new(),
        }
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach a provider-specific field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Override the computation time.
    pub fn at(mut self, checked_at: DateTime<Utc>) -> Self {
        self.checked_at = checked_at;
        self
    }

    /// Convert a failed probe into a status, separating quota from other failures.
    pub fn from_error(err: &GenesisError) -> Self {
        if err.is_quota() {
            HealthStatus::new(
                HealthState::QuotaExceeded,
                format!("Quota exceeded: {}", err.detail()),
            )
        } else {
            HealthStatus::new(HealthState::Error, err.detail())
        }
    }

    /// Returns true for `online` and `ready`.
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Online | HealthState::Ready)
    }
}

/// Trait for provider adapters.
///
/// An adapter knows how to authenticate, build the provider's request for
/// "generate text from prompt", and unwrap the provider's response envelope.
/// Implementations must be thread-safe so one adapter can serve concurrent
/// calls.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Provider this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Model requests are sent to.
    fn model(&self) -> &str;

    /// Send a single prompt and return the textual payload only.
    ///
    /// A non-success status is a terminal failure for this call.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Check liveness/readiness of the provider.
    async fn probe(&self) -> Result<HealthStatus>;
}

/// Build the HTTP client shared by an adapter's requests.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenesisError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Status line plus body of a failed response, e.g. `HTTP 401 Unauthorized: {...}`.
pub(crate) async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        let err = "cohere".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, GenesisError::UnsupportedProvider(ref p) if p == "cohere"));
    }

    #[test]
    fn test_provider_kind_serde_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_configuration_requires_cloud_credential() {
        let config = ProviderConfiguration::new(ProviderKind::Anthropic, "claude", "");
        assert!(matches!(config.validate(), Err(GenesisError::Config(_))));

        let config = ProviderConfiguration::new(ProviderKind::Ollama, "llama3.2", "");
        assert!(config.validate().is_ok());

        let config = ProviderConfiguration::new(ProviderKind::OpenAi, " ", "sk");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_override() {
        let config = ProviderConfiguration::new(ProviderKind::Ollama, "llama3.2", "");
        assert_eq!(config.base_url("http://localhost:11434"), "http://localhost:11434");

        let config = config.with_endpoint("http://gpu-box:11434/");
        assert_eq!(config.base_url("http://localhost:11434"), "http://gpu-box:11434");
    }

    #[test]
    fn test_health_status_serializes_extra_fields_flat() {
        let status = HealthStatus::new(HealthState::Online, "Connection successful")
            .with_provider("ollama")
            .with_model("llama3.2")
            .with_extra("available_models", vec!["llama3.2", "mistral"]);
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["status"], "online");
        assert_eq!(value["available_models"][1], "mistral");
        assert!(status.is_healthy());
    }

    #[test]
    fn test_status_from_quota_error() {
        let err = GenesisError::upstream(ProviderKind::Gemini, "gemini-1.5-pro", "HTTP 429: quota");
        let status = HealthStatus::from_error(&err);
        assert_eq!(status.status, HealthState::QuotaExceeded);
        assert_eq!(status.message, "Quota exceeded: HTTP 429: quota");

        let err = GenesisError::upstream(ProviderKind::Gemini, "gemini-1.5-pro", "HTTP 500: boom");
        assert_eq!(HealthStatus::from_error(&err).status, HealthState::Error);
    }
}
