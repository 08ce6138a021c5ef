//! Process-level settings loaded once from the environment.

use std::fmt;
use std::time::Duration;

/// Default base URL of a local Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default TTL for cached health results of the metered provider.
pub const DEFAULT_HEALTH_CACHE_TTL_SECS: u64 = 300;

/// Default HTTP request timeout. Local models can be slow.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// An opaque credential. `Debug` and `Display` never reveal the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value, e.g. to build an auth header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if no credential was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Settings consumed from the environment at process start.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider selected at startup (`gemini`, `openai`, `anthropic`, `ollama`).
    pub ai_provider: Option<String>,
    /// Model selected at startup.
    pub ai_model: Option<String>,
    /// Base URL override for the selected provider.
    pub ai_endpoint: Option<String>,

    pub gemini_api_key: Option<Secret>,
    pub openai_api_key: Option<Secret>,
    pub anthropic_api_key: Option<Secret>,
    /// Base URL of the local Ollama server.
    pub ollama_host: String,

    pub pinecone_api_key: Option<Secret>,
    pub pinecone_environment: String,
    pub pinecone_index_name: String,
    /// Data-plane host of the index, e.g. `https://my-index-abc123.svc.us-east-1-aws.pinecone.io`.
    pub pinecone_host: Option<String>,

    /// TTL of the metered provider's health cache.
    pub health_cache_ttl: Duration,
    /// Request timeout applied to every HTTP client.
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_provider: None,
            ai_model: None,
            ai_endpoint: None,
            gemini_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            pinecone_api_key: None,
            pinecone_environment: "us-east-1-aws".to_string(),
            pinecone_index_name: "datagenesis-embeddings".to_string(),
            pinecone_host: None,
            health_cache_ttl: Duration::from_secs(DEFAULT_HEALTH_CACHE_TTL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset. Unparsable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| get(key).map(Secret::new);
        let secs = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(default))
        };

        let defaults = Self::default();
        Self {
            ai_provider: get("AI_PROVIDER"),
            ai_model: get("AI_MODEL"),
            ai_endpoint: get("AI_ENDPOINT"),
            gemini_api_key: secret("GEMINI_API_KEY"),
            openai_api_key: secret("OPENAI_API_KEY"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            pinecone_api_key: secret("PINECONE_API_KEY"),
            pinecone_environment: get("PINECONE_ENVIRONMENT")
                .unwrap_or(defaults.pinecone_environment),
            pinecone_index_name: get("PINECONE_INDEX_NAME")
                .unwrap_or(defaults.pinecone_index_name),
            pinecone_host: get("PINECONE_HOST"),
            health_cache_ttl: secs("HEALTH_CACHE_TTL_SECS", DEFAULT_HEALTH_CACHE_TTL_SECS),
            http_timeout: secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Credential configured for a provider, if any.
    pub fn credential_for(&self, provider: &str) -> Option<&Secret> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "gemini" => self.gemini_api_key.as_ref(),
            "openai" => self.openai_api_key.as_ref(),
            "anthropic" => self.anthropic_api_key.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings.ollama_host, DEFAULT_OLLAMA_HOST);
        assert_eq!(settings.pinecone_index_name, "datagenesis-embeddings");
        assert_eq!(settings.health_cache_ttl, Duration::from_secs(300));
        assert!(settings.gemini_api_key.is_none());
    }

    #[test]
    fn test_reads_credentials_and_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("OPENAI_API_KEY", "  "),
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("HEALTH_CACHE_TTL_SECS", "60"),
            ("HTTP_TIMEOUT_SECS", "not-a-number"),
        ]));

        assert_eq!(settings.gemini_api_key.as_ref().map(Secret::expose), Some("g-key"));
        assert!(settings.openai_api_key.is_none());
        assert_eq!(settings.ollama_host, "http://gpu-box:11434");
        assert_eq!(settings.health_cache_ttl, Duration::from_secs(60));
        assert_eq!(settings.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert!(settings.credential_for("Gemini").is_some());
        assert!(settings.credential_for("ollama").is_none());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("sk-very-secret");
        assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
        assert_eq!(format!("{:?}", Secret::default()), "Secret(<empty>)");
    }
}
