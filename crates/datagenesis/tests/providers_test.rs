//! Provider adapters against local fake upstream servers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use datagenesis::llm::{
    GeminiAdapter, HealthState, LlmAdapter, OllamaAdapter, ProviderConfiguration, ProviderKind,
};
use datagenesis::{AiOrchestrator, FieldType, GenesisError, SchemaRequest};

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

const SCHEMA_REPLY: &str = "Here is the schema:\n```json\n{\"schema\": {\"patient_id\": {\"type\": \"uuid\", \"description\": \"Patient id\"}, \"age\": {\"type\": \"integer\"}}, \"detected_domain\": \"healthcare\", \"estimated_rows\": 500}\n```";

// =============================================================================
// OpenAI
// =============================================================================

async fn openai_chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "user");
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"role": "assistant", "content": SCHEMA_REPLY}}]})),
    )
}

#[tokio::test]
async fn test_openai_schema_generation_end_to_end() {
    let base = spawn(Router::new().route("/chat/completions", post(openai_chat))).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("openai", "gpt-4o", "sk-test", Some(base.as_str())));

    let result = orchestrator
        .generate_schema_from_natural_language(&SchemaRequest::new("patients").with_domain("healthcare"))
        .await
        .unwrap();

    let fields: Vec<&str> = result.schema.keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["patient_id", "age"]);
    assert_eq!(result.schema["age"].field_type, FieldType::Number);
    assert_eq!(result.estimated_rows, 500);
    assert_eq!(result.detected_domain, "healthcare");
}

#[tokio::test]
async fn test_openai_wrong_key_is_transport_error() {
    let base = spawn(Router::new().route("/chat/completions", post(openai_chat))).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("openai", "gpt-4o", "sk-other", Some(base.as_str())));
    let err = orchestrator
        .generate_schema_from_natural_language(&SchemaRequest::new("patients"))
        .await
        .unwrap_err();

    match err {
        GenesisError::Transport { provider, message, .. } => {
            assert_eq!(provider, ProviderKind::OpenAi);
            assert!(message.contains("401"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_classified_as_quota() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"message": "Rate limit reached"}})),
            )
        }),
    );
    let base = spawn(router).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("openai", "gpt-4o", "sk-test", Some(base.as_str())));
    let err = orchestrator
        .generate_schema_from_natural_language(&SchemaRequest::new("orders"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenesisError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn test_openai_probe_lists_models() {
    let router = Router::new().route("/models", get(|| async { Json(json!({"data": []})) }));
    let base = spawn(router).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("openai", "gpt-4o", "sk-test", Some(base.as_str())));
    let status = orchestrator.health_check().await;
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(status.provider.as_deref(), Some("openai"));
}

#[tokio::test]
async fn test_probe_failure_becomes_error_status() {
    let router = Router::new().route(
        "/models",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
    );
    let base = spawn(router).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("openai", "gpt-4o", "sk-test", Some(base.as_str())));
    let status = orchestrator.health_check().await;
    assert_eq!(status.status, HealthState::Error);
    assert!(status.message.contains("upstream down"));
}

// =============================================================================
// Anthropic
// =============================================================================

#[tokio::test]
async fn test_anthropic_reads_first_text_block() {
    let router = Router::new().route(
        "/messages",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["x-api-key"], "ant-key");
            assert_eq!(headers["anthropic-version"], "2023-06-01");
            assert_eq!(body["max_tokens"], 4000);
            Json(json!({
                "content": [
                    {"type": "thinking", "text": "ignored"},
                    {"type": "text", "text": "[{\"name\": \"Ada\"}, {\"name\": \"Grace\"}]"}
                ]
            }))
        }),
    );
    let base = spawn(router).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("anthropic", "claude-sonnet-4-20250514", "ant-key", Some(base.as_str())));

    let schema = datagenesis::SchemaDescriptor::new();
    let config = datagenesis::GenerationConfig::with_rows(5);
    let records = orchestrator
        .generate_synthetic_data(&schema, &config, "people", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["name"], "Grace");
}

// =============================================================================
// Ollama
// =============================================================================

#[tokio::test]
async fn test_ollama_generate_and_tags() {
    let router = Router::new()
        .route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["stream"], false);
                Json(json!({"model": body["model"], "response": "{\"domain\": \"retail\", \"quality_score\": 72}", "done": true}))
            }),
        )
        .route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama3.2:latest"}, {"name": "mistral:7b"}]})) }),
        );
    let base = spawn(router).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("ollama", "llama3.2", "", Some(base.as_str())));

    let status = orchestrator.health_check().await;
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(status.extra["available_models"], json!(["llama3.2:latest", "mistral:7b"]));

    let analysis = orchestrator.analyze_dataset(&[json!({"sku": "A1"})]).await;
    assert_eq!(analysis.domain, "retail");
    assert_eq!(analysis.quality_score, 72.0);
    assert!(analysis.error.is_none());
}

#[tokio::test]
async fn test_ollama_connection_refused_is_friendly() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = ProviderConfiguration::new(ProviderKind::Ollama, "llama3.2", "").with_endpoint(&base);
    let adapter = OllamaAdapter::new(&config, Duration::from_secs(5)).unwrap();
    let err = adapter.send_prompt("hello").await.unwrap_err();
    assert!(err.to_string().contains("ollama serve"));
}

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone)]
struct GeminiFake {
    hits: Arc<AtomicUsize>,
    status: StatusCode,
}

async fn gemini_generate(
    State(fake): State<GeminiFake>,
    Path(call): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    fake.hits.fetch_add(1, Ordering::SeqCst);
    assert_eq!(headers["x-goog-api-key"], "g-key");
    assert!(call.ends_with(":generateContent"));
    if fake.status != StatusCode::OK {
        return (
            fake.status,
            Json(json!({"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "te"}, {"text": "st"}]}}]})),
    )
}

async fn spawn_gemini(status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/v1beta/models/:call", post(gemini_generate))
        .with_state(GeminiFake {
            hits: hits.clone(),
            status,
        });
    (spawn(router).await, hits)
}

#[tokio::test]
async fn test_gemini_concatenates_text_parts() {
    let (base, hits) = spawn_gemini(StatusCode::OK).await;
    let config = ProviderConfiguration::new(ProviderKind::Gemini, "gemini-1.5-flash", "g-key").with_endpoint(&base);
    let adapter = GeminiAdapter::new(&config, Duration::from_secs(5)).unwrap();

    assert_eq!(adapter.send_prompt("hi").await.unwrap(), "test");
    let status = adapter.probe().await.unwrap();
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_gemini_probe_reports_quota_state() {
    let (base, _) = spawn_gemini(StatusCode::TOO_MANY_REQUESTS).await;

    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("gemini", "gemini-2.0-flash-exp", "g-key", Some(base.as_str())));
    let status = orchestrator.health_check().await;
    assert_eq!(status.status, HealthState::QuotaExceeded);
    assert!(status.message.starts_with("Quota exceeded"));
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_unknown_provider_after_good_configuration_is_not_ready() {
    let orchestrator = AiOrchestrator::new();
    assert!(orchestrator.configure("ollama", "llama3.2", "", Some("http://127.0.0.1:9")));
    assert!(orchestrator.is_ready());

    assert!(!orchestrator.configure("cohere", "command-r", "key", None));
    assert!(!orchestrator.is_ready());
    assert!(orchestrator.current_configuration().is_none());

    let status = orchestrator.health_check().await;
    assert_eq!(status.status, HealthState::Error);
    assert_eq!(status.message, "Service not configured");
    assert_eq!(status.provider.as_deref(), Some("cohere"));

    let err = orchestrator
        .generate_schema_from_natural_language(&SchemaRequest::new("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenesisError::NotConfigured));
}

#[tokio::test]
async fn test_missing_cloud_credential_is_rejected() {
    let orchestrator = AiOrchestrator::new();
    let err = orchestrator.try_configure("anthropic", "claude-sonnet-4-20250514", "", None).unwrap_err();
    assert!(matches!(err, GenesisError::Config(_)));
    assert!(!orchestrator.is_ready());
}
