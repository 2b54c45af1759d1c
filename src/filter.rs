//! # Query-parameter filtering
//!
//! `GET /items?name=widget&active=true` becomes a [`Filters`] set of
//! equality constraints joined with AND. Parameter names must be declared
//! fields; unknown names and repeated names are rejected rather than
//! ignored, so a typo never silently widens a result set.

use sea_orm::{ColumnTrait, Condition, EntityTrait, IdenStatic, Iterable, Value};

use crate::schema::{FieldValue, ModelSchema};
use crate::validation::{ValidationError, ValidationErrors};

/// Equality constraints on declared fields, in the order given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, FieldValue)>,
}

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality constraint.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.push((field.into(), value.into()));
        self
    }

    /// Build filters from raw query parameters.
    ///
    /// # Errors
    ///
    /// Unknown field names, fields given more than once and values that do not
    /// parse as the field's kind. All problems are reported together.
    pub fn parse<I, K, V>(schema: &ModelSchema, params: I) -> Result<Self, ValidationErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut errors = ValidationErrors::new();
        let mut entries: Vec<(String, FieldValue)> = Vec::new();

        for (name, raw) in params {
            let name = name.as_ref();
            let Some(field) = schema.field(name) else {
                errors.add(ValidationError::new(name, "unknown filter field"));
                continue;
            };
            if entries.iter().any(|(existing, _)| existing == name) {
                errors.add(ValidationError::new(name, "filter given more than once"));
                continue;
            }
            match field.kind().parse(raw.as_ref()) {
                Ok(value) => entries.push((name.to_string(), value)),
                Err(message) => errors.add(ValidationError::new(name, message)),
            }
        }

        errors.result()?;
        Ok(Self { entries })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// AND together `column = value` for each named value of entity `E`.
///
/// An empty input yields an always-true condition.
///
/// # Errors
///
/// Names that are not columns of `E`.
pub fn equality_condition<'a, E, I>(entries: I) -> Result<Condition, ValidationErrors>
where
    E: EntityTrait,
    I: IntoIterator<Item = (&'a str, &'a FieldValue)>,
{
    let mut errors = ValidationErrors::new();
    let mut condition = Condition::all();

    for (name, value) in entries {
        match E::Column::iter().find(|column| column.as_str() == name) {
            Some(column) => condition = condition.add(column.eq(Value::from(value.clone()))),
            None => errors.add(ValidationError::new(name, "unknown filter field")),
        }
    }

    errors.result()?;
    Ok(condition)
}
