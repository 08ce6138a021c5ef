//! The AI orchestrator: one stable contract over every provider.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{DEFAULT_HTTP_TIMEOUT_SECS, Secret, Settings};
use crate::error::{GenesisError, Result};
use crate::llm::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind, build_adapter,
    extract_json, extract_json_as, prompts,
};
use crate::schema::{
    DataAnalysis, GenerationConfig, GenerationResult, PrivacyAssessment, RawGeneration, Record,
    SchemaDescriptor,
};

/// Domain assumed when the caller gives none.
pub const DEFAULT_DOMAIN: &str = "general";

/// Data shape assumed when the caller gives none.
pub const DEFAULT_DATA_TYPE: &str = "tabular";

/// A schema inference request.
#[derive(Debug, Clone)]
pub struct SchemaRequest {
    pub description: String,
    pub domain: String,
    pub data_type: String,
}

impl SchemaRequest {
    /// Request with the default domain and data type.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            domain: DEFAULT_DOMAIN.to_string(),
            data_type: DEFAULT_DATA_TYPE.to_string(),
        }
    }

    /// Set the domain hint.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the data type hint.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }
}

/// A fully built configuration and the adapter built from it.
struct ActiveProvider {
    config: ProviderConfiguration,
    adapter: Arc<dyn LlmAdapter>,
}

enum ProviderState {
    Unconfigured,
    /// Last `configure` failed; remembered for health reporting.
    Failed { provider: String, model: String },
    Active(Arc<ActiveProvider>),
}

/// Dispatches logical operations to the configured provider.
///
/// Configuration is swapped as a whole: calls in flight keep the
/// configuration/adapter pair they started with.
pub struct AiOrchestrator {
    state: RwLock<ProviderState>,
    timeout: Duration,
}

impl Default for AiOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AiOrchestrator {
    /// Create an unconfigured orchestrator.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Create an unconfigured orchestrator whose adapters use `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            state: RwLock::new(ProviderState::Unconfigured),
            timeout,
        }
    }

    /// Create an orchestrator and configure it from settings when they name a provider.
    pub fn from_settings(settings: &Settings) -> Self {
        let orchestrator = Self::with_timeout(settings.http_timeout);
        if let Some(provider) = settings.ai_provider.as_deref() {
            let kind = provider.parse::<ProviderKind>().ok();
            let model = settings
                .ai_model
                .clone()
                .or_else(|| kind.map(|k| k.default_model().to_string()))
                .unwrap_or_default();
            let credential = settings.credential_for(provider).cloned().unwrap_or_default();
            let endpoint = settings.ai_endpoint.clone().or_else(|| {
                (kind == Some(ProviderKind::Ollama)).then(|| settings.ollama_host.clone())
            });
            orchestrator.configure(provider, &model, credential, endpoint.as_deref());
        }
        orchestrator
    }

    /// Configure the provider. Returns false on failure.
    ///
    /// Any previous configuration is discarded, even when this call fails:
    /// afterwards the orchestrator is either configured as requested or not
    /// ready at all.
    pub fn configure(
        &self,
        provider: &str,
        model: &str,
        credential: impl Into<Secret>,
        endpoint: Option<&str>,
    ) -> bool {
        match self.try_configure(provider, model, credential, endpoint) {
            Ok(()) => true,
            Err(e) => {
                error!(provider, model, error = %e, "Failed to configure AI provider");
                false
            }
        }
    }

    /// Configure the provider, reporting why configuration failed.
    pub fn try_configure(
        &self,
        provider: &str,
        model: &str,
        credential: impl Into<Secret>,
        endpoint: Option<&str>,
    ) -> Result<()> {
        let built = provider.parse::<ProviderKind>().and_then(|kind| {
            let mut config = ProviderConfiguration::new(kind, model, credential);
            config.endpoint = endpoint.map(str::to_string);
            let adapter = build_adapter(&config, self.timeout)?;
            Ok(ActiveProvider { config, adapter })
        });

        match built {
            Ok(active) => {
                info!(provider = %active.config.provider, model, "AI service configured");
                self.replace(ProviderState::Active(Arc::new(active)));
                Ok(())
            }
            Err(e) => {
                self.replace(ProviderState::Failed {
                    provider: provider.to_string(),
                    model: model.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Install a prebuilt adapter, e.g. a mock or a custom transport.
    pub fn install(&self, config: ProviderConfiguration, adapter: Arc<dyn LlmAdapter>) {
        info!(provider = %config.provider, model = %config.model, "AI adapter installed");
        self.replace(ProviderState::Active(Arc::new(ActiveProvider { config, adapter })));
    }

    /// Returns true if a provider is configured.
    pub fn is_ready(&self) -> bool {
        self.active().is_some()
    }

    /// The active configuration, if any.
    pub fn current_configuration(&self) -> Option<ProviderConfiguration> {
        self.active().map(|active| active.config.clone())
    }

    fn replace(&self, next: ProviderState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = next;
    }

    fn active(&self) -> Option<Arc<ActiveProvider>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            ProviderState::Active(active) => Some(Arc::clone(active)),
            _ => None,
        }
    }

    fn require_active(&self) -> Result<Arc<ActiveProvider>> {
        self.active().ok_or(GenesisError::NotConfigured)
    }

    /// Check the configured provider.
    ///
    /// Never fails: probe errors are reported as `error` or `quota_exceeded`
    /// statuses. Makes no network call when unconfigured.
    pub async fn health_check(&self) -> HealthStatus {
        let Some(active) = self.active() else {
            let status = HealthStatus::new(HealthState::Error, "Service not configured");
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            return match &*state {
                ProviderState::Failed { provider, model } => {
                    status.with_provider(provider).with_model(model)
                }
                _ => status,
            };
        };

        match active.adapter.probe().await {
            Ok(status) => status,
            Err(e) => {
                warn!(provider = %active.config.provider, error = %e, "Health probe failed");
                HealthStatus::from_error(&e)
                    .with_provider(active.config.provider.as_str())
                    .with_model(&active.config.model)
            }
        }
    }

    /// Infer a schema from a natural-language description.
    ///
    /// # Errors
    /// - [`GenesisError::NotConfigured`] if no provider is configured
    /// - transport or quota errors from the provider
    /// - [`GenesisError::MalformedOutput`] if the model's answer is not the
    ///   requested JSON; this is not retried
    pub async fn generate_schema_from_natural_language(
        &self,
        request: &SchemaRequest,
    ) -> Result<GenerationResult> {
        let active = self.require_active()?;
        let prompt =
            prompts::schema_prompt(&request.description, &request.domain, &request.data_type);

        let text = active.adapter.send_prompt(&prompt).await?;
        let raw: RawGeneration = extract_json_as(&text)?;
        let result = raw.into_result();

        info!(
            provider = %active.config.provider,
            fields = result.schema.len(),
            domain = %result.detected_domain,
            "Generated schema"
        );
        Ok(result)
    }

    /// Generate synthetic records for a schema.
    ///
    /// The model must return a non-empty JSON array of objects; extra rows
    /// beyond `config.row_count` are dropped. Field names are not checked
    /// against the schema.
    pub async fn generate_synthetic_data(
        &self,
        schema: &SchemaDescriptor,
        config: &GenerationConfig,
        description: &str,
        source_data: Option<&[Value]>,
    ) -> Result<Vec<Record>> {
        let active = self.require_active()?;
        if config.row_count == 0 {
            return Err(GenesisError::Config("row_count must be at least 1".to_string()));
        }

        let prompt = prompts::synthetic_data_prompt(schema, config, description, source_data);
        let text = active.adapter.send_prompt(&prompt).await?;

        let mut records: Vec<Record> = match extract_json(&text)? {
            Value::Array(items) if !items.is_empty() => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(GenesisError::malformed(
                        format!("expected an object per record, got {}", other),
                        text.as_str(),
                    )),
                })
                .collect::<Result<_>>()?,
            _ => {
                error!(raw = %text, "Model did not return a non-empty record array");
                return Err(GenesisError::malformed(
                    "expected a non-empty JSON array of records",
                    text,
                ));
            }
        };
        records.truncate(config.row_count);

        info!(
            provider = %active.config.provider,
            records = records.len(),
            "Generated synthetic records"
        );
        Ok(records)
    }

    /// Analyze a dataset sample. Falls back to a default analysis on any failure.
    pub async fn analyze_dataset(&self, sample_data: &[Value]) -> DataAnalysis {
        let Some(active) = self.active() else {
            return DataAnalysis::default();
        };

        let prompt = prompts::analysis_prompt(sample_data);
        let analysis = match active.adapter.send_prompt(&prompt).await {
            Ok(text) => extract_json_as::<DataAnalysis>(&text),
            Err(e) => Err(e),
        };

        analysis.unwrap_or_else(|e| {
            warn!(error = %e, "Dataset analysis failed; using defaults");
            DataAnalysis::fallback(e.to_string())
        })
    }

    /// Assess privacy risks of a dataset sample. Falls back to a default assessment on any failure.
    pub async fn assess_privacy_risks(&self, data: &[Value]) -> PrivacyAssessment {
        let Some(active) = self.active() else {
            return PrivacyAssessment::unavailable();
        };

        let prompt = prompts::privacy_prompt(data);
        let assessment = match active.adapter.send_prompt(&prompt).await {
            Ok(text) => extract_json_as::<PrivacyAssessment>(&text),
            Err(e) => Err(e),
        };

        assessment.unwrap_or_else(|e| {
            warn!(error = %e, "Privacy assessment failed; using defaults");
            PrivacyAssessment::fallback(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockAdapter;
    use crate::schema::{FieldSpec, FieldType, RiskLevel};
    use serde_json::json;

    fn with_mock(mock: MockAdapter) -> (AiOrchestrator, Arc<MockAdapter>) {
        let mock = Arc::new(mock);
        let orchestrator = AiOrchestrator::new();
        orchestrator.install(
            ProviderConfiguration::new(mock.kind(), mock.model(), "key"),
            mock.clone(),
        );
        (orchestrator, mock)
    }

    #[test]
    fn test_configure_known_providers() {
        let orchestrator = AiOrchestrator::new();
        assert!(orchestrator.configure("openai", "gpt-4o", "sk-test", None));
        assert!(orchestrator.is_ready());

        let config = orchestrator.current_configuration().unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.model, "gpt-4o");

        assert!(orchestrator.configure("ollama", "llama3.2", "", Some("http://gpu-box:11434")));
        let config = orchestrator.current_configuration().unwrap();
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
    }

    #[test]
    fn test_unknown_provider_after_success_leaves_not_ready() {
        let orchestrator = AiOrchestrator::new();
        assert!(orchestrator.configure("anthropic", "claude-3-haiku", "key", None));
        assert!(orchestrator.is_ready());

        assert!(!orchestrator.configure("cohere", "command-r", "key", None));
        assert!(!orchestrator.is_ready());
        assert!(orchestrator.current_configuration().is_none());
    }

    #[test]
    fn test_missing_credential_is_configuration_failure() {
        let orchestrator = AiOrchestrator::new();
        let err = orchestrator
            .try_configure("gemini", "gemini-1.5-flash", "", None)
            .unwrap_err();
        assert!(matches!(err, GenesisError::Config(_)));
        assert!(!orchestrator.is_ready());
    }

    #[tokio::test]
    async fn test_health_check_unconfigured_reports_attempt() {
        let orchestrator = AiOrchestrator::new();
        let status = orchestrator.health_check().await;
        assert_eq!(status.status, HealthState::Error);
        assert_eq!(status.message, "Service not configured");
        assert!(status.provider.is_none());

        orchestrator.configure("mistral", "large", "key", None);
        let status = orchestrator.health_check().await;
        assert_eq!(status.provider.as_deref(), Some("mistral"));
        assert_eq!(status.model.as_deref(), Some("large"));
    }

    #[tokio::test]
    async fn test_health_check_converts_probe_errors() {
        let (orchestrator, _) =
            with_mock(MockAdapter::new(ProviderKind::OpenAi).with_probe_failure("HTTP 401: nope"));
        let status = orchestrator.health_check().await;
        assert_eq!(status.status, HealthState::Error);
        assert_eq!(status.message, "HTTP 401: nope");
        assert_eq!(status.provider.as_deref(), Some("openai"));

        let (orchestrator, _) = with_mock(
            MockAdapter::new(ProviderKind::Gemini).with_probe_failure("429 RESOURCE_EXHAUSTED"),
        );
        let status = orchestrator.health_check().await;
        assert_eq!(status.status, HealthState::QuotaExceeded);
        assert!(status.message.starts_with("Quota exceeded"));
    }

    #[tokio::test]
    async fn test_generate_schema_requires_configuration() {
        let orchestrator = AiOrchestrator::new();
        let result = orchestrator
            .generate_schema_from_natural_language(&SchemaRequest::new("users"))
            .await;
        assert!(matches!(result, Err(GenesisError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_generate_schema_from_fenced_output() {
        let reply = r#"Here you go:
```json
{
  "schema": {
    "email": {"type": "email", "description": "Login", "constraints": {"required": true, "unique": true}, "examples": ["a@b.io"]},
    "age": {"type": "number", "constraints": {"min": 18, "max": 99}}
  },
  "detected_domain": "saas",
  "estimated_rows": 5000,
  "relationships": [],
  "suggestions": ["keep emails unique"]
}
```"#;
        let (orchestrator, mock) =
            with_mock(MockAdapter::new(ProviderKind::Anthropic).with_response(reply));

        let request = SchemaRequest::new("app users").with_domain("software");
        let result = orchestrator
            .generate_schema_from_natural_language(&request)
            .await
            .unwrap();

        assert_eq!(result.schema.len(), 2);
        assert_eq!(result.schema["email"].field_type, FieldType::Email);
        assert!(result.schema["email"].constraints.unique);
        assert_eq!(result.schema["age"].constraints.min, Some(json!(18)));
        assert_eq!(result.detected_domain, "saas");
        assert_eq!(result.estimated_rows, 5000);
        assert!(mock.prompts()[0].contains("\"app users\""));
    }

    #[tokio::test]
    async fn test_generate_schema_keeps_model_field_order_and_loose_values() {
        let reply = r#"```json
{
  "schema": {
    "zeta_id": {"type": "uuid"},
    "signed_up": {"type": "date", "constraints": {"min": "2020-01-01", "max": "2024-12-31"}},
    "last_seen": {"type": "timestamp"},
    "location": {"type": "geo_point"},
    "age": {"type": "integer", "constraints": {"min": 18}}
  },
  "estimated_rows": "5000"
}
```"#;
        let (orchestrator, _) =
            with_mock(MockAdapter::new(ProviderKind::Gemini).with_response(reply));

        let request = SchemaRequest::new("members").with_domain("retail");
        let result = orchestrator
            .generate_schema_from_natural_language(&request)
            .await
            .unwrap();

        let names: Vec<&str> = result.schema.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta_id", "signed_up", "last_seen", "location", "age"]);
        assert_eq!(result.schema["signed_up"].constraints.min, Some(json!("2020-01-01")));
        assert_eq!(result.schema["last_seen"].field_type, FieldType::Datetime);
        assert_eq!(result.schema["location"].field_type, FieldType::String);
        assert_eq!(result.estimated_rows, 5000);
        assert_eq!(result.detected_domain, DEFAULT_DOMAIN);
    }

    #[tokio::test]
    async fn test_generate_schema_malformed_output_is_not_retried() {
        let (orchestrator, mock) = with_mock(
            MockAdapter::new(ProviderKind::Ollama)
                .with_response("Sorry, I can't do that.")
                .with_response(r#"{"schema": {}}"#),
        );

        let result = orchestrator
            .generate_schema_from_natural_language(&SchemaRequest::new("x"))
            .await;
        match result {
            Err(GenesisError::MalformedOutput { raw, .. }) => {
                assert_eq!(raw, "Sorry, I can't do that.")
            }
            other => panic!("expected malformed output, got {:?}", other),
        }
        assert_eq!(mock.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_synthetic_data_truncates_rows() {
        let reply = json!([{"id": 1}, {"id": 2}, {"id": 3}]).to_string();
        let (orchestrator, _) = with_mock(MockAdapter::new(ProviderKind::OpenAi).with_response(reply));

        let mut schema = SchemaDescriptor::new();
        schema.insert("id".to_string(), FieldSpec::new(FieldType::Number));
        let records = orchestrator
            .generate_synthetic_data(&schema, &GenerationConfig::with_rows(2), "ids", None)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_generate_synthetic_data_rejects_empty_or_scalar_rows() {
        let (orchestrator, _) = with_mock(
            MockAdapter::new(ProviderKind::OpenAi)
                .with_response("[]")
                .with_response("[1, 2]"),
        );
        let schema = SchemaDescriptor::new();
        let config = GenerationConfig::default();

        for _ in 0..2 {
            let result = orchestrator
                .generate_synthetic_data(&schema, &config, "", None)
                .await;
            assert!(matches!(result, Err(GenesisError::MalformedOutput { .. })));
        }
    }

    #[tokio::test]
    async fn test_analysis_and_privacy_fallbacks() {
        let orchestrator = AiOrchestrator::new();
        let analysis = orchestrator.analyze_dataset(&[json!({"a": 1})]).await;
        assert_eq!(analysis, DataAnalysis::default());
        let privacy = orchestrator.assess_privacy_risks(&[]).await;
        assert_eq!(privacy.risk_level, RiskLevel::Low);

        let (orchestrator, _) = with_mock(
            MockAdapter::new(ProviderKind::Gemini)
                .with_failure("HTTP 503: overloaded")
                .with_response("not json"),
        );
        let analysis = orchestrator.analyze_dataset(&[]).await;
        assert!(analysis.error.unwrap().contains("overloaded"));
        let privacy = orchestrator.assess_privacy_risks(&[]).await;
        assert_eq!(privacy.risk_level, RiskLevel::Medium);
        assert!(privacy.recommendations[0].starts_with("Privacy analysis error"));
    }

    #[tokio::test]
    async fn test_privacy_assessment_parsed() {
        let reply = r#"{"privacy_score": 40, "pii_detected": ["email"], "sensitive_attributes": [], "risk_level": "high", "recommendations": ["hash emails"]}"#;
        let (orchestrator, _) = with_mock(MockAdapter::new(ProviderKind::OpenAi).with_response(reply));
        let privacy = orchestrator.assess_privacy_risks(&[json!({"email": "x@y.z"})]).await;
        assert_eq!(privacy.privacy_score, 40.0);
        assert_eq!(privacy.risk_level, RiskLevel::High);
        assert_eq!(privacy.pii_detected, vec!["email"]);
    }

    #[test]
    fn test_from_settings_uses_ollama_host() {
        let settings = Settings {
            ai_provider: Some("ollama".to_string()),
            ollama_host: "http://gpu-box:11434".to_string(),
            ..Settings::default()
        };
        let orchestrator = AiOrchestrator::from_settings(&settings);
        let config = orchestrator.current_configuration().unwrap();
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
    }
}
