//! Mock adapter for testing and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GenesisError, Result};

use super::provider::{HealthState, HealthStatus, LlmAdapter, ProviderKind};

/// A scripted reply.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Mock adapter that returns predictable responses.
///
/// Replies are consumed in order; once the script is exhausted the fallback
/// reply is returned for every further prompt. Every prompt is recorded.
pub struct MockAdapter {
    kind: ProviderKind,
    model: String,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    probe_failure: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockAdapter {
    /// Create a mock posing as `kind` that answers `{}` to everything.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: format!("mock-{}", kind),
            script: Mutex::new(VecDeque::new()),
            fallback: Reply::Text("{}".to_string()),
            probe_failure: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a text reply.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue an upstream failure with the given message.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Reply::Failure(message.into()));
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Reply::Text(text.into());
        self
    }

    /// Make every probe fail with the given message.
    pub fn with_probe_failure(mut self, message: impl Into<String>) -> Self {
        self.probe_failure = Some(message.into());
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    fn next_reply(&self) -> Reply {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl LlmAdapter for MockAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.next_reply() {
            Reply::Text(text) => Ok(text),
            Reply::Failure(message) => Err(GenesisError::upstream(self.kind, &self.model, message)),
        }
    }

    async fn probe(&self) -> Result<HealthStatus> {
        match &self.probe_failure {
            Some(message) => Err(GenesisError::upstream(self.kind, &self.model, message.clone())),
            None => Ok(HealthStatus::new(HealthState::Online, "Mock provider online")
                .with_provider(self.kind.as_str())
                .with_model(&self.model)),
        }
    }
}
