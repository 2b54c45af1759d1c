//! Validation Support
//!
//! Request input is checked against the [`ModelSchema`] before it reaches the
//! database: path segments and query parameters are parsed per field kind,
//! and JSON payloads may only name declared fields. Every failure is
//! collected into [`ValidationErrors`], which the HTTP layer turns into a
//! `422 Unprocessable Entity`.
//!
//! Type checking of payload values is left to the model's own `Deserialize`
//! implementation; see [`payload_error`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::schema::ModelSchema;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// One `field: message` line per error, in insertion order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was collected.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Reject payload keys that are not declared fields of the model.
///
/// # Errors
///
/// One [`ValidationError`] per unknown key.
pub fn reject_unknown_fields(
    schema: &ModelSchema,
    payload: &Map<String, Value>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for name in payload.keys() {
        if schema.field(name).is_none() {
            errors.add(ValidationError::new(name.as_str(), "unknown field"));
        }
    }
    errors.result()
}

/// Remove primary-key entries from a payload addressed at an existing row.
///
/// A key entry equal to the stored value is dropped silently; any other value
/// would move the row and is rejected.
///
/// # Errors
///
/// One [`ValidationError`] per key field whose payload value differs from
/// `stored`.
pub fn strip_key_fields(
    schema: &ModelSchema,
    payload: &mut Map<String, Value>,
    stored: &Map<String, Value>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for field in schema.key_fields() {
        if let Some(value) = payload.remove(field.name())
            && stored.get(field.name()) != Some(&value)
        {
            errors.add(ValidationError::new(
                field.name(),
                "primary key fields cannot be changed",
            ));
        }
    }
    errors.result()
}

/// Wrap a model deserialization failure as a validation error.
///
/// `serde_json` names the offending field in its message for missing fields;
/// type mismatches carry the expected type instead.
#[must_use]
pub fn payload_error(resource: &str, err: &serde_json::Error) -> ValidationErrors {
    ValidationError::new(resource, err.to_string()).into()
}
