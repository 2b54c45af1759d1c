//! # Repository
//!
//! [`CrudRepository`] is the seam between the HTTP layer and storage: six
//! single-purpose operations expressed in terms of the model's declared
//! fields. [`Repository`] implements it for any Sea-ORM entity whose `Model`
//! is `Serialize + Deserialize`.
//!
//! Payloads are JSON objects keyed by field name. They are checked against the
//! [`ModelSchema`] (unknown fields, primary-key changes) and then decoded with
//! the model's own `Deserialize`, which is where field types are enforced.
//!
//! Writes run in one transaction each; a transaction that is not committed
//! rolls back when dropped, so every early return releases it.
//!
//! ```rust,ignore
//! let items = Arc::new(Repository::<item::Entity>::new(db.clone()));
//! let created = items.create(json!({"id": 1, "name": "a"}).as_object().cloned().unwrap()).await?;
//! ```

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, IdenStatic, IntoActiveModel, Iterable, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::marker::PhantomData;

use crate::errors::RepositoryError;
use crate::filter::{Filters, equality_condition};
use crate::keys::KeyValues;
use crate::schema::{FieldKind, ModelSchema};
use crate::validation::{payload_error, reject_unknown_fields, strip_key_fields};

/// A JSON object keyed by field name.
pub type Payload = Map<String, Value>;

/// CRUD operations over one model type.
///
/// Every operation except [`list`](CrudRepository::list) addresses at most
/// one row through a complete primary-key value.
#[async_trait]
pub trait CrudRepository: Send + Sync + 'static {
    /// Row type returned to callers and serialized into responses.
    type Model: Serialize + Send + Sync;

    fn schema(&self) -> &ModelSchema;

    /// Fetch one row.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has `key`.
    async fn get(&self, key: &KeyValues) -> Result<Self::Model, RepositoryError>;

    /// Rows matching every filter, ordered by primary key.
    ///
    /// # Errors
    ///
    /// `Validation` for filter names that are not declared fields.
    async fn list(&self, filters: &Filters) -> Result<Vec<Self::Model>, RepositoryError>;

    /// Insert a new row from a complete payload.
    ///
    /// # Errors
    ///
    /// `Conflict` when the key (or another unique value) already exists,
    /// `Validation` for unknown, missing or mistyped fields.
    async fn create(&self, payload: Payload) -> Result<Self::Model, RepositoryError>;

    /// Overwrite every non-key field of an existing row.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Validation` when the payload names another key.
    async fn replace(
        &self,
        key: &KeyValues,
        payload: Payload,
    ) -> Result<Self::Model, RepositoryError>;

    /// Overwrite only the fields present in `partial`.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Validation` when the payload names another key.
    async fn patch(&self, key: &KeyValues, partial: Payload)
    -> Result<Self::Model, RepositoryError>;

    /// Remove a row. Deleting a missing row, including one deleted a moment
    /// ago, is `NotFound`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has `key`.
    async fn delete(&self, key: &KeyValues) -> Result<(), RepositoryError>;
}

/// Sea-ORM backed repository for entity `E`.
///
/// Holds only the connection handle and the schema; share it behind an `Arc`.
pub struct Repository<E> {
    db: DatabaseConnection,
    schema: ModelSchema,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            schema: self.schema.clone(),
            entity: PhantomData,
        }
    }
}

impl<E> Repository<E>
where
    E: EntityTrait + Send + Sync + 'static,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            schema: ModelSchema::of::<E>(),
            entity: PhantomData,
        }
    }

    /// Name used in errors, logs and OpenAPI tags instead of the table name.
    #[must_use]
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.schema = self.schema.with_resource_name(name);
        self
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn resource(&self) -> &str {
        self.schema.resource_name()
    }

    fn column(name: &str) -> Option<E::Column> {
        E::Column::iter().find(|column| column.as_str() == name)
    }

    fn key_condition(&self, key: &KeyValues) -> Result<Condition, RepositoryError> {
        let named = key.named(&self.schema)?;
        Ok(equality_condition::<E, _>(named)?)
    }

    async fn find_by_key<C>(&self, conn: &C, key: &KeyValues) -> Result<E::Model, RepositoryError>
    where
        C: ConnectionTrait + Sync,
    {
        let condition = self.key_condition(key)?;
        E::find()
            .filter(condition)
            .one(conn)
            .await?
            .ok_or_else(|| RepositoryError::not_found(self.resource(), key))
    }

    fn to_object(&self, model: &E::Model) -> Result<Payload, RepositoryError> {
        match serde_json::to_value(model) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(DbErr::Json(format!(
                "{} serialized to {other}, expected an object",
                self.resource()
            ))
            .into()),
            Err(err) => Err(DbErr::Json(err.to_string()).into()),
        }
    }

    fn from_object(&self, object: Payload) -> Result<E::Model, RepositoryError> {
        serde_json::from_value(Value::Object(object))
            .map_err(|err| payload_error(self.resource(), &err).into())
    }

    /// Map a failed update onto the repository taxonomy.
    fn update_error(&self, key: &KeyValues, err: DbErr) -> RepositoryError {
        match err {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => {
                RepositoryError::not_found(self.resource(), key)
            }
            other => RepositoryError::from_write(self.resource(), other),
        }
    }

    /// Persist `model`, sending only the `changed` columns.
    async fn write_back<C>(
        &self,
        conn: &C,
        key: &KeyValues,
        model: E::Model,
        changed: &[String],
    ) -> Result<E::Model, RepositoryError>
    where
        C: ConnectionTrait + Sync,
    {
        let mut active: E::ActiveModel = model.into_active_model();
        for name in changed {
            if let Some(column) = Self::column(name) {
                active.reset(column);
            }
        }
        active
            .update(conn)
            .await
            .map_err(|err| self.update_error(key, err))
    }
}

/// Stand-in value for a database-assigned key so the model can be decoded.
/// The column is marked not-set before the insert.
fn placeholder(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Integer => Value::from(0),
        FieldKind::Float => Value::from(0.0),
        FieldKind::Boolean => Value::Bool(false),
        FieldKind::Uuid => Value::String(uuid::Uuid::nil().to_string()),
        FieldKind::Text => Value::String(String::new()),
        FieldKind::Json | FieldKind::Other => Value::Null,
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl<E> CrudRepository for Repository<E>
where
    E: EntityTrait + Send + Sync + 'static,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    type Model = E::Model;

    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    async fn get(&self, key: &KeyValues) -> Result<E::Model, RepositoryError> {
        tracing::debug!(resource = %self.resource(), %key, "get");
        self.find_by_key(&self.db, key).await
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<E::Model>, RepositoryError> {
        tracing::debug!(resource = %self.resource(), filters = filters.len(), "list");
        let condition = equality_condition::<E, _>(filters.iter())?;

        let mut query = E::find().filter(condition);
        for field in self.schema.key_fields() {
            if let Some(column) = Self::column(field.name()) {
                query = query.order_by_asc(column);
            }
        }
        Ok(query.all(&self.db).await?)
    }

    async fn create(&self, mut payload: Payload) -> Result<E::Model, RepositoryError> {
        reject_unknown_fields(&self.schema, &payload)?;

        let generated: Vec<String> = self
            .schema
            .key_fields()
            .filter(|field| {
                field.is_auto_increment()
                    && payload.get(field.name()).is_none_or(Value::is_null)
            })
            .map(|field| field.name().to_string())
            .collect();
        for field in self.schema.key_fields() {
            if generated.iter().any(|name| name == field.name()) {
                payload.insert(field.name().to_string(), placeholder(field.kind()));
            }
        }

        let key_label = self
            .schema
            .key_fields()
            .map(|field| payload.get(field.name()).map(label).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("/");
        tracing::debug!(resource = %self.resource(), key = %key_label, "create");

        let model = self.from_object(payload)?;
        let mut active: E::ActiveModel = model.into_active_model();
        for column in E::Column::iter() {
            active.reset(column);
        }
        for name in &generated {
            if let Some(column) = Self::column(name) {
                active.not_set(column);
            }
        }

        let txn = self.db.begin().await?;

        if generated.is_empty() {
            let mut condition = Condition::all();
            for field in self.schema.key_fields() {
                if let Some(column) = Self::column(field.name())
                    && let Some(value) = active.get(column).into_value()
                {
                    condition = condition.add(column.eq(value));
                }
            }
            if E::find().filter(condition).one(&txn).await?.is_some() {
                return Err(RepositoryError::conflict(
                    self.resource(),
                    format!("primary key '{key_label}' is already taken"),
                ));
            }
        }

        let created = active
            .insert(&txn)
            .await
            .map_err(|err| RepositoryError::from_write(self.resource(), err))?;
        txn.commit().await?;
        Ok(created)
    }

    async fn replace(
        &self,
        key: &KeyValues,
        mut payload: Payload,
    ) -> Result<E::Model, RepositoryError> {
        tracing::debug!(resource = %self.resource(), %key, "replace");
        reject_unknown_fields(&self.schema, &payload)?;

        let txn = self.db.begin().await?;
        let existing = self.find_by_key(&txn, key).await?;
        let stored = self.to_object(&existing)?;
        strip_key_fields(&self.schema, &mut payload, &stored)?;

        for field in self.schema.key_fields() {
            if let Some(value) = stored.get(field.name()) {
                payload.insert(field.name().to_string(), value.clone());
            }
        }
        let model = self.from_object(payload)?;

        let changed: Vec<String> = self
            .schema
            .fields()
            .iter()
            .filter(|field| !field.is_primary_key())
            .map(|field| field.name().to_string())
            .collect();
        let updated = self.write_back(&txn, key, model, &changed).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn patch(
        &self,
        key: &KeyValues,
        mut partial: Payload,
    ) -> Result<E::Model, RepositoryError> {
        tracing::debug!(resource = %self.resource(), %key, fields = partial.len(), "patch");
        reject_unknown_fields(&self.schema, &partial)?;

        let txn = self.db.begin().await?;
        let existing = self.find_by_key(&txn, key).await?;
        let mut merged = self.to_object(&existing)?;
        strip_key_fields(&self.schema, &mut partial, &merged)?;

        if partial.is_empty() {
            return Ok(existing);
        }

        let changed: Vec<String> = partial.keys().cloned().collect();
        merged.extend(partial);
        let model = self.from_object(merged)?;

        let updated = self.write_back(&txn, key, model, &changed).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, key: &KeyValues) -> Result<(), RepositoryError> {
        tracing::debug!(resource = %self.resource(), %key, "delete");
        let condition = self.key_condition(key)?;

        let txn = self.db.begin().await?;
        let result = E::delete_many().filter(condition).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found(self.resource(), key));
        }
        txn.commit().await?;
        Ok(())
    }
}
