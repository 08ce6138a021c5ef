//! Field-level schema types produced by schema inference.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Logical type of a generated field.
///
/// Type names the model invents outside this set read as [`FieldType::String`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Integer or decimal number.
    #[serde(alias = "integer", alias = "int", alias = "float", alias = "decimal")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
    /// Calendar date without time.
    Date,
    /// Date with time component.
    #[serde(alias = "timestamp")]
    Datetime,
    Email,
    Phone,
    Uuid,
    /// Long-form text.
    Text,
    /// Short free-form string.
    #[default]
    #[serde(other)]
    String,
}

impl FieldType {
    /// All supported types, in the order they are advertised to models.
    pub const ALL: [FieldType; 9] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Uuid,
        FieldType::Text,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Uuid => "uuid",
            FieldType::Text => "text",
        }
    }

    /// Returns true if this type is temporal.
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Datetime)
    }
}

/// Constraints suggested for a field.
///
/// Bounds are kept as the model wrote them: numbers for numeric fields,
/// strings such as `"2020-01-01"` for dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub unique: bool,
}

/// Description of a single field in a synthetic dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Logical type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Human-readable description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: FieldConstraints,

    /// Example values, in the order the model listed them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub examples: Vec<Value>,
}

impl FieldSpec {
    /// Create a field with the given type and no constraints.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: String::new(),
            constraints: FieldConstraints::default(),
            examples: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the constraints.
    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Append an example value.
    pub fn with_example(mut self, example: impl Into<Value>) -> Self {
        self.examples.push(example.into());
        self
    }
}

/// Models routinely emit `null` where a value was optional.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered mapping from field name to field description.
///
/// Field order follows the model output. Generated records are expected to
/// use exactly these field names, but nothing here enforces it.
pub type SchemaDescriptor = IndexMap<String, FieldSpec>;
