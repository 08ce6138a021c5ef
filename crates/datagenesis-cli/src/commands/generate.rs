//! Generate command - synthesize records for a schema file.

use std::path::PathBuf;

use colored::Colorize;
use datagenesis::{FieldType, GenerationConfig, SchemaDescriptor, Settings};
use serde_json::{Map, Value};

use super::{CommandResult, orchestrator, print_json, read_json, read_records};
use crate::cli::ProviderArgs;

pub async fn run(
    args: &ProviderArgs,
    settings: &Settings,
    schema_path: PathBuf,
    rows: usize,
    description: String,
    source: Option<PathBuf>,
) -> CommandResult {
    let schema: SchemaDescriptor = serde_json::from_value(read_json(&schema_path)?)?;
    let source_rows = source.as_deref().map(read_records).transpose()?;

    let mock_reply = serde_json::to_string(&placeholder_records(&schema, rows.min(5)))?;
    let orchestrator = orchestrator(args, settings, &mock_reply)?;

    let config = GenerationConfig::with_rows(rows);
    let records = orchestrator
        .generate_synthetic_data(&schema, &config, &description, source_rows.as_deref())
        .await?;

    eprintln!(
        "{} {} of {} requested records",
        "Generated".green().bold(),
        records.len().to_string().white().bold(),
        rows
    );
    print_json(&records)
}

/// Records built from field examples, used as the mock answer.
fn placeholder_records(schema: &SchemaDescriptor, rows: usize) -> Vec<Value> {
    (0..rows.max(1))
        .map(|i| {
            let record: Map<String, Value> = schema
                .iter()
                .map(|(name, spec)| {
                    let value = spec.examples.first().cloned().unwrap_or_else(|| match spec.field_type {
                        FieldType::Number => Value::from(i),
                        FieldType::Boolean => Value::from(i % 2 == 0),
                        other => Value::from(format!("{}_{}", other.as_str(), i)),
                    });
                    (name.clone(), value)
                })
                .collect();
            Value::Object(record)
        })
        .collect()
}
