//! Canonical result shapes returned by the orchestrator.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::types::{SchemaDescriptor, null_as_default};

/// Row count assumed when the model does not estimate one.
pub const DEFAULT_ESTIMATED_ROWS: u64 = 10_000;

/// Row count requested when the caller does not specify one.
pub const DEFAULT_ROW_COUNT: usize = 100;

/// A single generated record.
pub type Record = Map<String, Value>;

/// Result of inferring a schema from a natural-language description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Inferred fields.
    pub schema: SchemaDescriptor,

    /// Domain the model recognized in the description.
    pub detected_domain: String,

    /// Model's estimate of a sensible dataset size.
    pub estimated_rows: u64,

    /// Relationships between fields, in prose.
    pub relationships: Vec<String>,

    /// Hints for downstream data generation.
    pub suggestions: Vec<String>,
}

/// Raw model payload for schema inference; every key is optional.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGeneration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: SchemaDescriptor,
    #[serde(default)]
    pub detected_domain: Option<String>,
    #[serde(default, deserialize_with = "lenient_row_estimate")]
    pub estimated_rows: Option<f64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub relationships: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub suggestions: Vec<String>,
}

/// Accept a list of anything; non-string items keep their JSON text.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Value> = null_as_default(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Row estimates arrive as numbers or numeric strings; anything else is ignored.
fn lenient_row_estimate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

impl RawGeneration {
    /// Fill in defaults for every key the model left out.
    pub(crate) fn into_result(self) -> GenerationResult {
        GenerationResult {
            schema: self.schema,
            detected_domain: self
                .detected_domain
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(general_domain),
            estimated_rows: self
                .estimated_rows
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.round() as u64)
                .unwrap_or(DEFAULT_ESTIMATED_ROWS),
            relationships: self.relationships,
            suggestions: self.suggestions,
        }
    }
}

/// Options for synthetic data generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of rows to request.
    #[serde(alias = "rowCount", default = "default_row_count")]
    pub row_count: usize,

    /// Free-form options forwarded to the prompt verbatim.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

fn default_row_count() -> usize {
    DEFAULT_ROW_COUNT
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            row_count: DEFAULT_ROW_COUNT,
            options: Map::new(),
        }
    }
}

impl GenerationConfig {
    /// Request a specific number of rows.
    pub fn with_rows(row_count: usize) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }

    /// Add a free-form option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Dataset-level analysis produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAnalysis {
    #[serde(default = "general_domain")]
    pub domain: String,

    /// Field name to detected type.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_types: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<Value>,

    /// Quality score on a 0-100 scale.
    #[serde(default = "default_quality_score")]
    pub quality_score: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub pii_detected: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,

    /// Set when the analysis fell back to defaults because of a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn general_domain() -> String {
    "general".to_string()
}

fn default_quality_score() -> f64 {
    85.0
}

impl Default for DataAnalysis {
    fn default() -> Self {
        Self {
            domain: general_domain(),
            data_types: Map::new(),
            relationships: Vec::new(),
            quality_score: default_quality_score(),
            pii_detected: false,
            suggestions: Vec::new(),
            error: None,
        }
    }
}

impl DataAnalysis {
    /// Default analysis annotated with the failure that produced it.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Overall re-identification risk of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Privacy assessment produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyAssessment {
    /// Privacy score on a 0-100 scale; higher is safer.
    pub privacy_score: f64,

    /// Fields that look like personally identifiable information.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pii_detected: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sensitive_attributes: Vec<String>,

    #[serde(default)]
    pub risk_level: RiskLevel,

    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

impl PrivacyAssessment {
    /// Assessment reported when no provider is configured.
    pub fn unavailable() -> Self {
        Self {
            privacy_score: 90.0,
            pii_detected: Vec::new(),
            sensitive_attributes: Vec::new(),
            risk_level: RiskLevel::Low,
            recommendations: vec!["AI service not available for privacy analysis".to_string()],
        }
    }

    /// Assessment reported when the model call or its output failed.
    pub fn fallback(error: impl std::fmt::Display) -> Self {
        Self {
            privacy_score: 85.0,
            pii_detected: Vec::new(),
            sensitive_attributes: Vec::new(),
            risk_level: RiskLevel::Medium,
            recommendations: vec![format!("Privacy analysis error: {}", error)],
        }
    }
}
