//! Prompt templates shared by every provider.

use serde_json::Value;

use crate::schema::{FieldType, GenerationConfig, SchemaDescriptor};

/// Rows of reference data included in a generation prompt.
const REFERENCE_ROWS: usize = 3;

/// Rows included in a dataset analysis prompt.
pub const ANALYSIS_SAMPLE_ROWS: usize = 5;

/// Rows included in a privacy assessment prompt.
pub const PRIVACY_SAMPLE_ROWS: usize = 3;

/// Prompt sent by health probes that need a real round trip.
pub const PROBE_PROMPT: &str = "test";

/// Prompt sent by the explicit connection test of the metered provider.
pub const CONNECTION_TEST_PROMPT: &str = "Say 'test'";

fn type_menu() -> String {
    FieldType::ALL
        .iter()
        .map(FieldType::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Build the schema inference prompt.
pub fn schema_prompt(description: &str, domain: &str, data_type: &str) -> String {
    format!(
        r#"Based on this natural language description, generate a detailed database schema.

## Request
- Description: "{description}"
- Domain: {domain}
- Data type: {data_type}

## Task
Create a comprehensive schema with:
1. Realistic field names that match the described data
2. Appropriate data types ({types})
3. Constraints where applicable (min/max values, required, unique)
4. Example values for each field
5. Domain-specific field suggestions

Respond with a JSON object with exactly this structure:
{{
  "schema": {{
    "field_name": {{
      "type": "{types}",
      "description": "Clear description of the field",
      "constraints": {{
        "min": number,
        "max": number,
        "required": boolean,
        "unique": boolean
      }},
      "examples": ["example1", "example2", "example3"]
    }}
  }},
  "detected_domain": "domain detected from the description",
  "estimated_rows": number,
  "relationships": ["description of data relationships"],
  "suggestions": ["suggestions for data generation"]
}}

Make sure the schema is realistic and comprehensive for: {description}"#,
        types = type_menu(),
    )
}

/// Build the synthetic data generation prompt.
pub fn synthetic_data_prompt(
    schema: &SchemaDescriptor,
    config: &GenerationConfig,
    description: &str,
    source_data: Option<&[Value]>,
) -> String {
    let reference = match source_data {
        Some(rows) if !rows.is_empty() => {
            let sample: Vec<&Value> = rows.iter().take(REFERENCE_ROWS).collect();
            format!(
                "\n## Reference Rows\nMatch the style and distributions of these real rows without copying them:\n{}\n",
                pretty(&sample)
            )
        }
        _ => String::new(),
    };

    format!(
        r#"Generate {rows} rows of realistic synthetic data based on this schema.

## Schema
{schema}

## Description
"{description}"

## Configuration
{config}
{reference}
## Task
Generate data that:
1. Follows the exact schema structure
2. Uses realistic values for each field type
3. Maintains data relationships and constraints
4. Ensures variety and realistic distribution
5. Follows domain-specific patterns when applicable

Return a JSON array of {rows} objects using exactly the field names from the schema."#,
        rows = config.row_count,
        schema = pretty(schema),
        config = pretty(config),
    )
}

/// Build the dataset analysis prompt.
pub fn analysis_prompt(sample_data: &[Value]) -> String {
    let sample: Vec<&Value> = sample_data.iter().take(ANALYSIS_SAMPLE_ROWS).collect();
    format!(
        r#"Analyze this dataset and provide comprehensive insights.

## Sample Data
{sample}

## Task
Provide analysis including:
1. Detected domain (healthcare, finance, retail, etc.)
2. Data types for each field
3. Potential relationships between fields
4. Quality assessment
5. PII detection
6. Suggestions for improvement

Respond with a JSON object:
{{
  "domain": "detected_domain",
  "data_types": {{}},
  "relationships": [],
  "quality_score": number_0_to_100,
  "pii_detected": boolean,
  "suggestions": []
}}"#,
        sample = pretty(&sample),
    )
}

/// Build the privacy assessment prompt.
pub fn privacy_prompt(data: &[Value]) -> String {
    let sample: Vec<&Value> = data.iter().take(PRIVACY_SAMPLE_ROWS).collect();
    format!(
        r#"Assess privacy risks in this dataset.

## Data Sample
{sample}

## Task
Check for:
1. PII (Personally Identifiable Information)
2. Sensitive attributes
3. Re-identification risks
4. Data linkage possibilities

Respond with a JSON object:
{{
  "privacy_score": number_0_to_100,
  "pii_detected": ["list of detected PII fields"],
  "sensitive_attributes": ["list of sensitive fields"],
  "risk_level": "low|medium|high",
  "recommendations": ["privacy improvement suggestions"]
}}"#,
        sample = pretty(&sample),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    #[test]
    fn test_schema_prompt_mentions_inputs_and_types() {
        let prompt = schema_prompt("customer orders for a bakery", "retail", "tabular");
        assert!(prompt.contains("\"customer orders for a bakery\""));
        assert!(prompt.contains("Domain: retail"));
        assert!(prompt.contains("string|number|boolean|date|datetime|email|phone|uuid|text"));
        assert!(prompt.contains("\"estimated_rows\": number"));
    }

    #[test]
    fn test_synthetic_prompt_limits_reference_rows() {
        let mut schema = SchemaDescriptor::new();
        schema.insert("sku".to_string(), FieldSpec::new(FieldType::String));
        let rows: Vec<Value> = (0..10).map(|i| json!({"sku": format!("ROW-{}", i)})).collect();

        let prompt = synthetic_data_prompt(&schema, &GenerationConfig::with_rows(7), "", Some(&rows));
        assert!(prompt.starts_with("Generate 7 rows"));
        assert!(prompt.contains("ROW-2"));
        assert!(!prompt.contains("ROW-3"));

        let prompt = synthetic_data_prompt(&schema, &GenerationConfig::default(), "", None);
        assert!(!prompt.contains("Reference Rows"));
    }

    #[test]
    fn test_analysis_and_privacy_prompts_sample_rows() {
        let rows: Vec<Value> = (0..8).map(|i| json!({"row": i})).collect();
        let analysis = analysis_prompt(&rows);
        assert!(analysis.contains("\"row\": 4"));
        assert!(!analysis.contains("\"row\": 5"));

        let privacy = privacy_prompt(&rows);
        assert!(privacy.contains("\"row\": 2"));
        assert!(!privacy.contains("\"row\": 3"));
    }
}
