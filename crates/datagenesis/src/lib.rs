//! DataGenesis: multi-provider LLM orchestration for synthetic data.
//!
//! One stable contract sits over Gemini, OpenAI, Anthropic and Ollama:
//! infer a schema from a description, generate records, analyze a dataset,
//! assess privacy risk. Model answers are recovered into typed results even
//! when wrapped in markdown fences or prose.
//!
//! # Core Pieces
//!
//! - **Orchestrator**: configure a provider at runtime, swap it atomically
//! - **Health monitor**: quota-preserving, cached readiness for metered providers
//! - **Embedding store**: similarity search over schemas and domain patterns
//!
//! # Example
//!
//! ```no_run
//! use datagenesis::{AiOrchestrator, SchemaRequest};
//!
//! # async fn run() -> datagenesis::Result<()> {
//! let orchestrator = AiOrchestrator::new();
//! orchestrator.configure("ollama", "llama3.2", "", Some("http://localhost:11434"));
//!
//! let request = SchemaRequest::new("patients with diagnosis and admission date")
//!     .with_domain("healthcare");
//! let result = orchestrator.generate_schema_from_natural_language(&request).await?;
//! println!("Fields: {}", result.schema.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod health;
pub mod llm;
pub mod schema;

mod orchestrator;

pub use crate::orchestrator::{AiOrchestrator, DEFAULT_DATA_TYPE, DEFAULT_DOMAIN, SchemaRequest};
pub use config::{Secret, Settings};
pub use embedding::{CrossDomainInsight, EmbeddingStore, SimilarDataset};
pub use error::{GenesisError, Result};
pub use health::{MeteredHealthMonitor, ModelSwitch};
pub use llm::{HealthState, HealthStatus, LlmAdapter, ProviderConfiguration, ProviderKind};
pub use schema::{
    DataAnalysis, FieldSpec, FieldType, GenerationConfig, GenerationResult, PrivacyAssessment,
    RiskLevel, SchemaDescriptor,
};
