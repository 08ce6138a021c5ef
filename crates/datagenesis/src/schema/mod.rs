//! Schema and result types exchanged with callers.

mod results;
mod types;

pub use results::{
    DEFAULT_ESTIMATED_ROWS, DEFAULT_ROW_COUNT, DataAnalysis, GenerationConfig, GenerationResult,
    PrivacyAssessment, Record, RiskLevel,
};
pub(crate) use results::RawGeneration;
pub use types::{FieldConstraints, FieldSpec, FieldType, SchemaDescriptor};
