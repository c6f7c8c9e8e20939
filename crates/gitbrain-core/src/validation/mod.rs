//! Structural validation of message content before it is sent.

pub mod defaults;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{Content, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' has type {actual}, expected {expected}")]
    InvalidType {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid format for '{field}': {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Declared runtime type of a content field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    /// Integers are accepted too.
    Float,
    /// The integers 0 and 1 are accepted too.
    Bool,
    Array,
    Map,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Int, Value::Int(_)) => true,
            (FieldType::Float, Value::Float(_) | Value::Int(_)) => true,
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::Bool, Value::Int(0 | 1)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Map, Value::Map(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Array => "array",
            FieldType::Map => "map",
        };
        f.write_str(name)
    }
}

pub type FieldValidator = Arc<dyn Fn(&Value) -> Result<(), ValidationError> + Send + Sync>;

/// Structural rules for one message type.
#[derive(Clone)]
pub struct Schema {
    pub message_type: String,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub field_types: BTreeMap<String, FieldType>,
    pub validators: BTreeMap<String, FieldValidator>,
}

impl Schema {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            required_fields: Vec::new(),
            optional_fields: Vec::new(),
            field_types: BTreeMap::new(),
            validators: BTreeMap::new(),
        }
    }

    pub fn required(mut self, field: &str, field_type: FieldType) -> Self {
        self.required_fields.push(field.to_string());
        self.field_types.insert(field.to_string(), field_type);
        self
    }

    pub fn optional(mut self, field: &str, field_type: FieldType) -> Self {
        self.optional_fields.push(field.to_string());
        self.field_types.insert(field.to_string(), field_type);
        self
    }

    /// Attach a custom check that runs when `field` is present.
    pub fn check<F>(mut self, field: &str, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validators.insert(field.to_string(), Arc::new(validator));
        self
    }

    pub fn validate(&self, content: &Content) -> Result<(), ValidationError> {
        for field in &self.required_fields {
            if !content.contains_key(field) {
                return Err(ValidationError::MissingField(field.clone()));
            }
        }

        for (field, expected) in &self.field_types {
            if let Some(value) = content.get(field) {
                if !expected.matches(value) {
                    return Err(ValidationError::InvalidType {
                        field: field.clone(),
                        expected: *expected,
                        actual: value.type_name(),
                    });
                }
            }
        }

        for (field, validator) in &self.validators {
            if let Some(value) = content.get(field) {
                validator(value)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("message_type", &self.message_type)
            .field("required_fields", &self.required_fields)
            .field("optional_fields", &self.optional_fields)
            .field("field_types", &self.field_types)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of schemas keyed by message type.
///
/// Content whose `"type"` has no registered schema is accepted as-is.
#[derive(Debug, Clone, Default)]
pub struct MessageValidator {
    schemas: BTreeMap<String, Schema>,
}

impl MessageValidator {
    /// An empty registry: every typed message passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with schemas for the six built-in kinds.
    pub fn with_default_schemas() -> Self {
        let mut validator = Self::new();
        for schema in defaults::default_schemas() {
            validator.register_schema(schema);
        }
        validator
    }

    /// Register or replace the schema for its message type.
    pub fn register_schema(&mut self, schema: Schema) {
        self.schemas.insert(schema.message_type.clone(), schema);
    }

    pub fn schema(&self, message_type: &str) -> Option<&Schema> {
        self.schemas.get(message_type)
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    pub fn validate(&self, content: &Content) -> Result<(), ValidationError> {
        let message_type = content
            .message_type()
            .ok_or_else(|| ValidationError::MissingField("type".to_string()))?;

        match self.schemas.get(message_type) {
            Some(schema) => schema.validate(content),
            None => {
                tracing::debug!("No schema registered for '{message_type}', skipping validation");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_schema() -> Schema {
        Schema::new("note")
            .required("title", FieldType::String)
            .optional("pinned", FieldType::Bool)
            .optional("weight", FieldType::Float)
            .check("title", |v| match v.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err(ValidationError::invalid_value("title", "must not be blank")),
            })
    }

    fn validator() -> MessageValidator {
        let mut v = MessageValidator::new();
        v.register_schema(note_schema());
        v
    }

    #[test]
    fn test_missing_type() {
        let err = validator().validate(&Content::new()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("type".into()));
    }

    #[test]
    fn test_unregistered_type_bypasses_validation() {
        let content = Content::new().with("type", "memo").with("anything", 1i64);
        assert!(validator().validate(&content).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let content = Content::new().with("type", "note");
        assert_eq!(
            validator().validate(&content).unwrap_err(),
            ValidationError::MissingField("title".into())
        );
    }

    #[test]
    fn test_type_mismatch_reports_expected_and_actual() {
        let content = Content::new().with("type", "note").with("title", 5i64);
        match validator().validate(&content).unwrap_err() {
            ValidationError::InvalidType {
                field,
                expected,
                actual,
            } => {
                assert_eq!(field, "title");
                assert_eq!(expected, FieldType::String);
                assert_eq!(actual, "int");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_type_checks_run_before_custom_validators() {
        let content = Content::new()
            .with("type", "note")
            .with("title", "  ")
            .with("pinned", "yes");
        assert!(matches!(
            validator().validate(&content).unwrap_err(),
            ValidationError::InvalidType { .. }
        ));
    }

    #[test]
    fn test_custom_validator() {
        let content = Content::new().with("type", "note").with("title", "  ");
        assert!(matches!(
            validator().validate(&content).unwrap_err(),
            ValidationError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_bool_accepts_zero_and_one() {
        let ok = Content::new()
            .with("type", "note")
            .with("title", "t")
            .with("pinned", 1i64);
        assert!(validator().validate(&ok).is_ok());
        let bad = ok.with("pinned", 2i64);
        assert!(validator().validate(&bad).is_err());
    }

    #[test]
    fn test_float_accepts_int() {
        let content = Content::new()
            .with("type", "note")
            .with("title", "t")
            .with("weight", 3i64);
        assert!(validator().validate(&content).is_ok());
    }

    #[test]
    fn test_register_replaces_schema() {
        let mut v = validator();
        v.register_schema(Schema::new("note"));
        assert!(v.validate(&Content::new().with("type", "note")).is_ok());
        assert_eq!(v.registered_types(), vec!["note"]);
    }
}
