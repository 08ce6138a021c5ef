//! Health monitoring for the metered provider.
//!
//! Every real Gemini call consumes quota, so routine health checks are
//! answered from local state and cached for a TTL. Only
//! [`MeteredHealthMonitor::test_connection`] makes a real round trip, and its
//! result is never cached.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_HTTP_TIMEOUT_SECS, Secret, Settings};
use crate::error::{GenesisError, Result};
use crate::llm::{GeminiClient, HealthState, HealthStatus, ProviderConfiguration, ProviderKind, prompts};

/// Models the monitor may switch between.
pub const AVAILABLE_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-2.0-flash-exp",
    "gemini-1.0-pro",
];

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CachedHealth {
    stored_at: DateTime<Utc>,
    status: HealthStatus,
}

/// Single-entry cache of a health status with a wall-clock TTL.
pub struct HealthCache {
    ttl: Duration,
    entry: Mutex<Option<CachedHealth>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cached status if it was stored less than `ttl` before `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<HealthStatus> {
        let entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        let cached = entry.as_ref()?;
        // A clock that moved backwards counts as expired.
        let age = (now - cached.stored_at).to_std().ok()?;
        (age < self.ttl).then(|| cached.status.clone())
    }

    pub fn store(&self, status: HealthStatus, now: DateTime<Utc>) {
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CachedHealth {
            stored_at: now,
            status,
        });
    }

    pub fn invalidate(&self) {
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *entry = None;
    }
}

/// Outcome of a successful model switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSwitch {
    pub previous_model: String,
    pub current_model: String,
    pub available_models: Vec<String>,
}

struct MonitorState {
    model: String,
    client: Option<Arc<GeminiClient>>,
}

/// Quota-preserving health monitor for Gemini.
pub struct MeteredHealthMonitor {
    api_key: Option<Secret>,
    endpoint: Option<String>,
    timeout: Duration,
    state: RwLock<MonitorState>,
    cache: HealthCache,
    clock: Arc<dyn Clock>,
}

impl MeteredHealthMonitor {
    /// Create an uninitialized monitor for the default Gemini model.
    pub fn new(api_key: Option<Secret>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            state: RwLock::new(MonitorState {
                model: ProviderKind::Gemini.default_model().to_string(),
                client: None,
            }),
            cache: HealthCache::new(Duration::from_secs(crate::config::DEFAULT_HEALTH_CACHE_TTL_SECS)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a monitor from process settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut monitor = Self::new(settings.gemini_api_key.clone())
            .with_ttl(settings.health_cache_ttl)
            .with_timeout(settings.http_timeout);
        if settings.ai_provider.as_deref().map(str::trim) == Some("gemini") {
            monitor.endpoint = settings.ai_endpoint.clone();
        }
        monitor
    }

    /// Set the health cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = HealthCache::new(ttl);
        self
    }

    /// Set the HTTP timeout used by clients built from now on.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send requests to a different base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn build_client(&self, api_key: &Secret, model: &str) -> Result<GeminiClient> {
        let mut config = ProviderConfiguration::new(ProviderKind::Gemini, model, api_key.clone());
        config.endpoint = self.endpoint.clone();
        GeminiClient::new(&config, self.timeout)
    }

    /// Build the client for the current model. Returns false without an API key.
    pub fn initialize(&self) -> bool {
        let Some(api_key) = &self.api_key else {
            warn!("GEMINI_API_KEY not configured; metered provider unavailable");
            return false;
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match self.build_client(api_key, &state.model) {
            Ok(client) => {
                state.client = Some(Arc::new(client));
                info!(model = %state.model, "Gemini client initialized");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to initialize Gemini client");
                state.client = None;
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client().is_some()
    }

    /// Model the monitor is bound to.
    pub fn current_model(&self) -> String {
        self.state.read().unwrap_or_else(|e| e.into_inner()).model.clone()
    }

    /// The current client, for callers that want to generate with it.
    pub fn client(&self) -> Option<Arc<GeminiClient>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .client
            .clone()
    }

    /// Readiness from local state, served from cache within the TTL.
    ///
    /// Never contacts the provider.
    pub fn health_check(&self) -> HealthStatus {
        let now = self.clock.now();
        if let Some(cached) = self.cache.get(now) {
            debug!("Returning cached health status to save quota");
            return cached;
        }

        let status = self.optimistic_status().at(now);
        self.cache.store(status.clone(), now);
        status
    }

    fn optimistic_status(&self) -> HealthStatus {
        let model = self.current_model();
        let base = |state, message: &str| {
            HealthStatus::new(state, message)
                .with_provider(ProviderKind::Gemini.as_str())
                .with_model(&model)
        };

        if self.api_key.is_none() {
            return base(HealthState::Error, "API key not configured")
                .with_extra("api_key_configured", false)
                .with_extra("api_key_status", "missing");
        }
        if !self.is_initialized() {
            return base(HealthState::Error, "Service not initialized")
                .with_extra("api_key_configured", true)
                .with_extra("api_key_status", "configured");
        }
        base(HealthState::Ready, "Initialized and ready (quota-preserving mode)")
            .with_extra("api_key_configured", true)
            .with_extra("api_key_status", "configured")
            .with_extra("quota_preserved", true)
    }

    /// Make a real round trip. Consumes quota; never cached.
    pub async fn test_connection(&self) -> HealthStatus {
        let Some(client) = self.client() else {
            return HealthStatus::new(HealthState::Error, "Service not initialized")
                .with_provider(ProviderKind::Gemini.as_str());
        };

        info!(model = %client.model_name(), "Testing Gemini API connection (consuming quota)");
        let status = match client.generate_content(prompts::CONNECTION_TEST_PROMPT).await {
            Ok(_) => HealthStatus::new(HealthState::Online, "API connection successful")
                .with_extra("api_test", "passed"),
            Err(e) if e.is_quota() => HealthStatus::from_error(&e).with_extra("api_test", "failed"),
            Err(e) => HealthStatus::new(HealthState::Error, format!("Connection error: {}", e.detail()))
                .with_extra("api_test", "failed"),
        };
        status
            .with_provider(ProviderKind::Gemini.as_str())
            .with_model(client.model_name())
            .at(self.clock.now())
    }

    /// Rebind to another allowed model and drop the cached health status.
    pub fn switch_model(&self, model_name: &str) -> Result<ModelSwitch> {
        let Some(api_key) = &self.api_key else {
            return Err(GenesisError::Config("API key not configured".to_string()));
        };
        if !AVAILABLE_MODELS.contains(&model_name) {
            return Err(GenesisError::UnknownModel {
                requested: model_name.to_string(),
                available: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
            });
        }

        let client = self.build_client(api_key, model_name)?;
        let previous_model = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            let previous = if state.client.is_some() {
                state.model.clone()
            } else {
                "none".to_string()
            };
            state.model = model_name.to_string();
            state.client = Some(Arc::new(client));
            previous
        };
        self.cache.invalidate();

        info!(from = %previous_model, to = model_name, "Switched Gemini model");
        Ok(ModelSwitch {
            previous_model,
            current_model: model_name.to_string(),
            available_models: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
        })
    }
}
