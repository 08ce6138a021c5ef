//! Error types for the DataGenesis library.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::llm::ProviderKind;

/// Signatures that mark an upstream error as rate limiting or quota exhaustion.
static QUOTA_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)429|quota|rate[\s_-]?limit").expect("valid quota regex"));

/// Main error type for DataGenesis operations.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Configuration error (missing credential, bad header value, client setup).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider name is not one of the supported kinds.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// An operation needed a configured provider and none is active.
    #[error("AI service not configured")]
    NotConfigured,

    /// Upstream call failed (non-success status or transport failure).
    #[error("{provider} error (model {model}): {message}")]
    Transport {
        provider: ProviderKind,
        model: String,
        message: String,
    },

    /// Upstream reported rate limiting or quota exhaustion.
    #[error("{provider} quota exceeded (model {model}): {message}")]
    QuotaExceeded {
        provider: ProviderKind,
        model: String,
        message: String,
    },

    /// Model answered but its payload was not the JSON we asked for.
    #[error("Invalid JSON response from AI model: {message}")]
    MalformedOutput { message: String, raw: String },

    /// Requested model is not in the allow-list.
    #[error("Model {requested} not available. Available models: {available:?}")]
    UnknownModel {
        requested: String,
        available: Vec<String>,
    },

    /// Embedding function failure.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index failure.
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error outside a provider call.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GenesisError {
    /// Build an upstream failure, reclassifying quota signatures.
    pub fn upstream(provider: ProviderKind, model: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_message(&message) {
            GenesisError::QuotaExceeded {
                provider,
                model: model.to_string(),
                message,
            }
        } else {
            GenesisError::Transport {
                provider,
                model: model.to_string(),
                message,
            }
        }
    }

    /// Build a malformed-output error that keeps the offending text.
    pub fn malformed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        GenesisError::MalformedOutput {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Upstream message without the provider/model prefix.
    pub fn detail(&self) -> String {
        match self {
            GenesisError::Transport { message, .. } | GenesisError::QuotaExceeded { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Returns true if this error means "try again later" rather than "broken".
    pub fn is_quota(&self) -> bool {
        match self {
            GenesisError::QuotaExceeded { .. } => true,
            GenesisError::Transport { message, .. } => is_quota_message(message),
            other => is_quota_message(&other.to_string()),
        }
    }
}

/// Returns true if an error message carries a rate-limit or quota marker.
pub fn is_quota_message(message: &str) -> bool {
    QUOTA_SIGNATURE.is_match(message)
}

/// Result type alias for DataGenesis operations.
pub type Result<T> = std::result::Result<T, GenesisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_signatures() {
        assert!(is_quota_message("HTTP 429 Too Many Requests"));
        assert!(is_quota_message("Resource has been exhausted (check QUOTA)"));
        assert!(is_quota_message("rate limit reached for requests"));
        assert!(is_quota_message("rate_limit_error"));
        assert!(!is_quota_message("HTTP 500: internal error"));
    }

    #[test]
    fn test_upstream_classification() {
        let err = GenesisError::upstream(ProviderKind::OpenAi, "gpt-4o", "HTTP 429: slow down");
        assert!(matches!(err, GenesisError::QuotaExceeded { .. }));
        assert!(err.is_quota());

        let err = GenesisError::upstream(ProviderKind::OpenAi, "gpt-4o", "HTTP 401: bad key");
        assert!(matches!(err, GenesisError::Transport { .. }));
        assert!(!err.is_quota());
        assert!(err.to_string().contains("gpt-4o"));
    }
}
