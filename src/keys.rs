//! Primary-key values addressed by a request.
//!
//! Keys travel in the URL path, one segment per key field in declaration
//! order: `/memberships/5/7` addresses `(tenant, id) = (5, 7)`.

use std::fmt;

use crate::schema::{FieldValue, ModelSchema};
use crate::validation::{ValidationError, ValidationErrors};

/// An ordered primary-key value. Positions follow [`ModelSchema::key_fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValues(Vec<FieldValue>);

impl KeyValues {
    #[must_use]
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse one raw segment per key field.
    ///
    /// # Errors
    ///
    /// A segment count that differs from the key field count, or a segment
    /// that does not parse as its field's kind.
    pub fn parse(schema: &ModelSchema, segments: &[&str]) -> Result<Self, ValidationErrors> {
        let expected = schema.key_len();
        if segments.len() != expected {
            let names: Vec<_> = schema.key_fields().map(|field| field.name()).collect();
            return Err(ValidationError::new(
                "path",
                format!(
                    "expected {expected} key segment(s) ({}), got {}",
                    names.join("/"),
                    segments.len()
                ),
            )
            .into());
        }

        let mut errors = ValidationErrors::new();
        let mut values = Vec::with_capacity(expected);
        for (field, raw) in schema.key_fields().zip(segments) {
            match field.kind().parse(raw) {
                Ok(value) => values.push(value),
                Err(message) => errors.add(ValidationError::new(field.name(), message)),
            }
        }
        errors.result()?;
        Ok(Self(values))
    }

    /// Parse the slash-separated remainder of a keyed route. An empty path
    /// holds zero segments.
    ///
    /// # Errors
    ///
    /// See [`KeyValues::parse`].
    pub fn from_path(schema: &ModelSchema, path: &str) -> Result<Self, ValidationErrors> {
        let segments: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };
        Self::parse(schema, &segments)
    }

    /// Pair each value with its key field name.
    ///
    /// # Errors
    ///
    /// When the number of values does not match the key field count.
    pub fn named<'a>(
        &'a self,
        schema: &'a ModelSchema,
    ) -> Result<Vec<(&'a str, &'a FieldValue)>, ValidationErrors> {
        if self.len() != schema.key_len() {
            return Err(ValidationError::new(
                "key",
                format!(
                    "expected {} key value(s), got {}",
                    schema.key_len(),
                    self.len()
                ),
            )
            .into());
        }
        Ok(schema
            .key_fields()
            .map(|field| field.name())
            .zip(self.0.iter())
            .collect())
    }
}

impl<V: Into<FieldValue>, const N: usize> From<[V; N]> for KeyValues {
    fn from(values: [V; N]) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
