#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use crudwire::{Repository, add_crud_endpoints};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use sea_orm_migration::{MigrationName, MigrationTrait, MigratorTrait, SchemaManager};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub mod item_entity;
pub mod membership_entity;
pub mod task_entity;

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn items(db: &DatabaseConnection) -> Arc<Repository<item_entity::Entity>> {
    Arc::new(Repository::new(db.clone()))
}

pub fn tasks(db: &DatabaseConnection) -> Arc<Repository<task_entity::Entity>> {
    Arc::new(Repository::new(db.clone()).with_resource_name("Task"))
}

pub fn memberships(db: &DatabaseConnection) -> Arc<Repository<membership_entity::Entity>> {
    Arc::new(Repository::new(db.clone()))
}

pub fn setup_test_app(db: &DatabaseConnection) -> Router {
    let api = Router::new();
    let api = add_crud_endpoints(api, "/items", items(db));
    let api = add_crud_endpoints(api, "/tasks/", tasks(db));
    let api = add_crud_endpoints(api, "memberships", memberships(db));

    Router::new().nest("/api/v1", api)
}

/// Send one request and decode the JSON response body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Shorthand for building a payload from a `json!` object literal.
pub fn payload(value: Value) -> crudwire::Payload {
    match value {
        Value::Object(object) => object,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTestTables)]
    }
}

pub struct CreateTestTables;

impl MigrationName for CreateTestTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_test_tables"
    }
}

async fn create_table_for<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity))
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTestTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_table_for(manager, item_entity::Entity).await?;
        create_table_for(manager, task_entity::Entity).await?;
        create_table_for(manager, membership_entity::Entity).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["memberships", "tasks", "items"] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        Ok(())
    }
}
