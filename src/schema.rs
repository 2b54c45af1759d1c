//! # Model Schema
//!
//! An explicit field-descriptor list for one entity: name, semantic kind,
//! nullability and primary-key membership of every column, in declaration
//! order. It is read once from the Sea-ORM entity metadata and consulted by
//! the repository (key and filter conditions), the route handlers (path and
//! query parsing) and the OpenAPI description.
//!
//! ```rust,ignore
//! let schema = ModelSchema::of::<todo::Entity>().with_resource_name("Todo");
//! assert_eq!(schema.key_fields().count(), 1);
//! ```

use sea_orm::{
    ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn,
    PrimaryKeyTrait, Value,
};
use std::fmt;
use uuid::Uuid;

/// Semantic type of a field, as far as text parsing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Float,
    Text,
    Uuid,
    Json,
    /// Dates, times, binary and driver-specific types. Values are passed to the
    /// database as text and left for it to coerce.
    Other,
}

impl FieldKind {
    /// Classify a Sea-ORM column type.
    #[must_use]
    pub fn from_column_type(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Boolean => Self::Boolean,
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => Self::Integer,
            // Exact numerics are matched as doubles. Postgres `numeric` equality
            // against a double bind can miss rows.
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
                Self::Float
            }
            ColumnType::Char(_)
            | ColumnType::String(_)
            | ColumnType::Text
            | ColumnType::Enum { .. } => Self::Text,
            ColumnType::Uuid => Self::Uuid,
            ColumnType::Json | ColumnType::JsonBinary => Self::Json,
            _ => Self::Other,
        }
    }

    /// Parse a path segment or query value.
    ///
    /// # Errors
    ///
    /// Returns a message naming the expected kind when `raw` does not parse.
    pub fn parse(self, raw: &str) -> Result<FieldValue, String> {
        match self {
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(format!("expected a boolean, got '{raw}'")),
            },
            Self::Integer => raw
                .trim()
                .parse()
                .map(FieldValue::Int)
                .map_err(|_| format!("expected an integer, got '{raw}'")),
            Self::Float => raw
                .trim()
                .parse()
                .map(FieldValue::Float)
                .map_err(|_| format!("expected a number, got '{raw}'")),
            Self::Uuid => Uuid::parse_str(raw.trim())
                .map(FieldValue::Uuid)
                .map_err(|_| format!("expected a UUID, got '{raw}'")),
            Self::Json => Err("JSON fields cannot be matched against a text value".to_string()),
            Self::Text | Self::Other => Ok(FieldValue::Text(raw.to_string())),
        }
    }
}

/// A scalar parsed from request text according to a [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Bool(v) => v.into(),
            FieldValue::Int(v) => v.into(),
            FieldValue::Float(v) => v.into(),
            FieldValue::Text(v) => v.into(),
            FieldValue::Uuid(v) => v.into(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// One declared field of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    nullable: bool,
    primary_key: bool,
    auto_increment: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks a key field whose value the database assigns on insert.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

/// Resource name plus the ordered field descriptors of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    resource_name: String,
    fields: Vec<FieldDescriptor>,
}

impl ModelSchema {
    #[must_use]
    pub fn new(resource_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            resource_name: resource_name.into(),
            fields,
        }
    }

    /// Read the schema of a Sea-ORM entity.
    ///
    /// Fields follow the `Column` declaration order and the resource name
    /// defaults to the table name. The auto-increment flag is only honoured
    /// for single-column keys.
    #[must_use]
    pub fn of<E: EntityTrait>() -> Self {
        let key_columns: Vec<String> = E::PrimaryKey::iter()
            .map(|key| key.into_column().as_str().to_string())
            .collect();
        let auto_increment =
            key_columns.len() == 1 && <E::PrimaryKey as PrimaryKeyTrait>::auto_increment();

        let fields = E::Column::iter()
            .map(|column| {
                let def = column.def();
                let mut field = FieldDescriptor::new(
                    column.as_str(),
                    FieldKind::from_column_type(def.get_column_type()),
                );
                if def.is_null() {
                    field = field.nullable();
                }
                if key_columns.iter().any(|key| key == column.as_str()) {
                    field = field.primary_key();
                    if auto_increment {
                        field = field.auto_increment();
                    }
                }
                field
            })
            .collect();

        Self::new(E::default().table_name(), fields)
    }

    /// Override the name used in error messages, logs and OpenAPI tags.
    #[must_use]
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = name.into();
        self
    }

    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Primary-key fields in declaration order.
    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.primary_key)
    }

    #[must_use]
    pub fn key_len(&self) -> usize {
        self.key_fields().count()
    }

    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.field(name).is_some_and(FieldDescriptor::is_primary_key)
    }
}
