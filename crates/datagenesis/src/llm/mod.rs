//! LLM provider integration.
//!
//! Every provider sits behind [`LlmAdapter`]: send a prompt, get text back,
//! probe health. Prompts and JSON recovery are shared, so the providers differ
//! only in transport and response envelope.
//!
//! # Supported Providers
//!
//! - **Gemini** - Google models via API key (metered quota)
//! - **OpenAI** - GPT models via bearer token
//! - **Anthropic** - Claude models via `x-api-key`
//! - **Ollama** - Local models, no API key needed
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use datagenesis::llm::{build_adapter, ProviderConfiguration, ProviderKind};
//!
//! # async fn run() -> datagenesis::Result<()> {
//! let config = ProviderConfiguration::new(ProviderKind::Ollama, "llama3.2", "");
//! let adapter = build_adapter(&config, Duration::from_secs(120))?;
//! let text = adapter.send_prompt("Name three fruits").await?;
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod extract;
mod gemini;
mod mock;
mod ollama;
mod openai;
pub mod prompts;
mod provider;

use std::sync::Arc;
use std::time::Duration;

pub use anthropic::AnthropicAdapter;
pub use extract::{extract_json, extract_json_as};
pub use gemini::{GeminiAdapter, GeminiClient};
pub use mock::MockAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use provider::{
    HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind,
};

use crate::error::Result;

/// Build the adapter for a configuration.
pub fn build_adapter(
    config: &ProviderConfiguration,
    timeout: Duration,
) -> Result<Arc<dyn LlmAdapter>> {
    let adapter: Arc<dyn LlmAdapter> = match config.provider {
        ProviderKind::Gemini => Arc::new(GeminiAdapter::new(config, timeout)?),
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(config, timeout)?),
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(config, timeout)?),
        ProviderKind::Ollama => Arc::new(OllamaAdapter::new(config, timeout)?),
    };
    Ok(adapter)
}
