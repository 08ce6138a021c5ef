//! CLI command implementations.

pub mod analyze;
pub mod gemini;
pub mod generate;
pub mod health;
pub mod privacy;
pub mod schema;

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use datagenesis::llm::MockAdapter;
use datagenesis::{
    AiOrchestrator, HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind,
    Settings,
};
use serde_json::Value;

use crate::cli::ProviderArgs;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Build an orchestrator from flags, falling back to settings.
///
/// With `--mock`, the adapter answers every prompt with `mock_reply`.
pub fn orchestrator(
    args: &ProviderArgs,
    settings: &Settings,
    mock_reply: &str,
) -> Result<AiOrchestrator, Box<dyn std::error::Error>> {
    let orchestrator = AiOrchestrator::with_timeout(settings.http_timeout);

    let provider = args
        .provider
        .clone()
        .or_else(|| settings.ai_provider.clone());

    if args.mock {
        let kind = provider
            .as_deref()
            .and_then(|p| p.parse::<ProviderKind>().ok())
            .unwrap_or(ProviderKind::Ollama);
        let adapter = MockAdapter::new(kind).with_fallback(mock_reply);
        let config = ProviderConfiguration::new(kind, adapter.model(), "");
        orchestrator.install(config, Arc::new(adapter));
        return Ok(orchestrator);
    }

    let provider = provider.ok_or("No provider configured. Pass --provider or set AI_PROVIDER.")?;
    let kind = provider.parse::<ProviderKind>().ok();
    let model = args
        .model
        .clone()
        .or_else(|| settings.ai_model.clone())
        .or_else(|| kind.map(|k| k.default_model().to_string()))
        .unwrap_or_default();
    let credential = settings.credential_for(&provider).cloned().unwrap_or_default();
    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| settings.ai_endpoint.clone())
        .or_else(|| (kind == Some(ProviderKind::Ollama)).then(|| settings.ollama_host.clone()));

    orchestrator.try_configure(&provider, &model, credential, endpoint.as_deref())?;
    Ok(orchestrator)
}

/// Read a JSON document from disk.
pub fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Read a JSON array of records from disk.
pub fn read_records(path: &Path) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    match read_json(path)? {
        Value::Array(rows) => Ok(rows),
        _ => Err(format!("{} must contain a JSON array of records", path.display()).into()),
    }
}

/// Print a JSON value to stdout.
pub fn print_json(value: &impl serde::Serialize) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a colored one-line summary of a health status to stderr.
pub fn print_status(status: &HealthStatus) {
    let label = match status.status {
        HealthState::Online => "online".green().bold(),
        HealthState::Ready => "ready".green(),
        HealthState::QuotaExceeded => "quota exceeded".yellow().bold(),
        HealthState::Error => "error".red().bold(),
    };
    let target = match (&status.provider, &status.model) {
        (Some(p), Some(m)) => format!("{} / {}", p, m),
        (Some(p), None) => p.clone(),
        _ => "no provider".to_string(),
    };
    eprintln!("{} {} {}", label, target.white(), status.message.dimmed());
}
