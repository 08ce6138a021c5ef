//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// DataGenesis: multi-provider AI orchestration for synthetic data
#[derive(Parser)]
#[command(name = "datagenesis")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Provider selection; unset flags fall back to the environment.
#[derive(Args, Clone, Debug, Default)]
pub struct ProviderArgs {
    /// Provider: gemini, openai, anthropic or ollama (default: $AI_PROVIDER)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name (default: $AI_MODEL or the provider's default)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the provider API (default: $AI_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Answer from an offline mock adapter instead of a real provider
    #[arg(long, global = true)]
    pub mock: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the configured provider
    Health,

    /// Infer a schema from a natural-language description
    Schema {
        /// What the dataset should contain
        #[arg(value_name = "DESCRIPTION")]
        description: String,

        /// Domain hint (e.g., "healthcare", "finance")
        #[arg(short, long, default_value = "general")]
        domain: String,

        /// Data shape hint
        #[arg(long, default_value = "tabular")]
        data_type: String,
    },

    /// Generate synthetic records for a schema
    Generate {
        /// Schema file (JSON object of field name to field spec)
        #[arg(value_name = "SCHEMA_FILE")]
        schema: PathBuf,

        /// Number of rows to generate
        #[arg(short, long, default_value = "100")]
        rows: usize,

        /// Free-text description of the data
        #[arg(short, long, default_value = "")]
        description: String,

        /// Reference rows to imitate (JSON array)
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Analyze a dataset sample (JSON array of records)
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Assess privacy risks of a dataset sample (JSON array of records)
    Privacy {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Quota-preserving Gemini readiness check (no API call)
    GeminiHealth,

    /// Real Gemini round trip (consumes quota)
    GeminiTest,

    /// Switch the Gemini model and report readiness
    SwitchModel {
        /// One of the supported Gemini models
        #[arg(value_name = "MODEL")]
        model: String,
    },
}
