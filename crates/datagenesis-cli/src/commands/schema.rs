//! Schema command - infer a schema from a natural-language description.

use colored::Colorize;
use datagenesis::{SchemaRequest, Settings};

use super::{CommandResult, orchestrator, print_json};
use crate::cli::ProviderArgs;

const MOCK_SCHEMA: &str = r#"```json
{
  "schema": {
    "id": {"type": "uuid", "description": "Record identifier", "constraints": {"required": true, "unique": true}},
    "name": {"type": "string", "description": "Display name", "examples": ["Ada Lovelace"]},
    "created_at": {"type": "datetime", "description": "Creation time"}
  },
  "detected_domain": "general",
  "estimated_rows": 1000,
  "relationships": [],
  "suggestions": ["Mock schema; run without --mock for a real provider"]
}
```"#;

pub async fn run(
    args: &ProviderArgs,
    settings: &Settings,
    description: String,
    domain: String,
    data_type: String,
    verbose: bool,
) -> CommandResult {
    let orchestrator = orchestrator(args, settings, MOCK_SCHEMA)?;
    let request = SchemaRequest::new(description)
        .with_domain(domain)
        .with_data_type(data_type);

    let result = orchestrator
        .generate_schema_from_natural_language(&request)
        .await?;

    eprintln!(
        "{} {} fields, domain {}",
        "Inferred".green().bold(),
        result.schema.len().to_string().white().bold(),
        result.detected_domain.cyan()
    );
    if verbose {
        for (name, spec) in &result.schema {
            eprintln!("  {:24} {:10} {}", name, spec.field_type.as_str(), spec.description.dimmed());
        }
    }

    print_json(&result)
}
