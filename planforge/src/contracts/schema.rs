//! Field-level schema contracts over JSON content.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Error raised when content violates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error message.
    pub message: String,
    /// Field that caused the error, if applicable.
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "Field '{}': {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// The JSON kind a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any value, including null.
    Any,
    /// A string.
    String,
    /// A number.
    Number,
    /// A boolean.
    Bool,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl FieldKind {
    /// Returns true if `value` has this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Returns the JSON kind name of a value.
#[must_use]
pub const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Top-level key.
    pub name: String,
    /// Required kind.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

/// A named set of field rules for one step's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContract {
    /// Contract name, usually the step id.
    pub name: String,
    /// Field rules, in declaration order.
    pub fields: Vec<FieldRule>,
}

impl SchemaContract {
    /// Creates an empty contract accepting any object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Adds an optional field; if present it must have `kind`.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Names of the required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|rule| rule.required)
            .map(|rule| rule.name.as_str())
    }

    /// Validates a complete value against the contract.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let object = value.as_object().ok_or_else(|| {
            ValidationError::new(format!(
                "Expected an object for '{}', found {}",
                self.name,
                kind_of(value)
            ))
        })?;

        for rule in &self.fields {
            match object.get(&rule.name) {
                None if rule.required => {
                    return Err(ValidationError::for_field(
                        &rule.name,
                        "Required field is missing",
                    ));
                }
                None => {}
                Some(field) if !rule.kind.matches(field) => {
                    return Err(ValidationError::for_field(
                        &rule.name,
                        format!("Expected {}, found {}", rule.kind.as_str(), kind_of(field)),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Renders the contract as a JSON Schema object for the generator.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for rule in &self.fields {
            let schema = match rule.kind {
                FieldKind::Any => json!({}),
                kind => json!({ "type": kind.as_str() }),
            };
            properties.insert(rule.name.clone(), schema);
        }

        json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": self.required_fields().collect::<Vec<_>>(),
        })
    }
}
