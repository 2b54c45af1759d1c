//! # Endpoint registration
//!
//! [`crud_router`] wires a [`CrudRepository`] to six routes under a base path:
//!
//! | Verb   | Path               | Repository call |
//! |--------|--------------------|-----------------|
//! | GET    | `{base}`           | `list` (query parameters are filters) |
//! | POST   | `{base}`           | `create` → `201` |
//! | GET    | `{base}/{k1}/...`  | `get` |
//! | PUT    | `{base}/{k1}/...`  | `replace` |
//! | PATCH  | `{base}/{k1}/...`  | `patch` |
//! | DELETE | `{base}/{k1}/...`  | `delete` → `204` |
//!
//! Keyed routes capture the whole remainder of the path, so a request with
//! the wrong number of key segments reaches the handler and is answered with
//! `422` instead of falling through to a router-level `404`. `{base}/` with
//! no segment at all is routed separately to the same answer.
//!
//! ```rust,ignore
//! let items = Arc::new(Repository::<item::Entity>::new(db.clone()));
//! let app = add_crud_endpoints(Router::new(), "/items", items);
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::filter::Filters;
use crate::keys::KeyValues;
use crate::repository::{CrudRepository, Payload};

/// `/items/` and `items` both become `/items`; `/` becomes the empty prefix.
pub(crate) fn normalize_base(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

pub(crate) fn collection_path(base: &str) -> String {
    if base.is_empty() {
        "/".to_string()
    } else {
        base.to_string()
    }
}

fn item_path(base: &str) -> String {
    format!("{base}/{{*key}}")
}

/// `{base}/` with nothing after it. The catch-all never matches an empty
/// remainder, so this path gets its own route.
fn empty_key_path(base: &str) -> Option<String> {
    (!base.is_empty()).then(|| format!("{base}/"))
}

fn body_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::custom(rejection.status(), rejection.body_text())
}

/// Get one resource by its primary key.
///
/// # Errors
/// - `422` when the path does not hold one valid segment per key field.
/// - `404` when no row has that key.
pub async fn get_one<R>(
    State(repository): State<Arc<R>>,
    Path(key): Path<String>,
) -> Result<Json<R::Model>, ApiError>
where
    R: CrudRepository,
{
    let key = KeyValues::from_path(repository.schema(), &key)?;
    let item = repository.get(&key).await?;
    Ok(Json(item))
}

/// List resources, every query parameter being an equality filter.
///
/// # Errors
/// - `422` for unknown, repeated or mistyped filter parameters.
pub async fn get_all<R>(
    State(repository): State<Arc<R>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<R::Model>>, ApiError>
where
    R: CrudRepository,
{
    let filters = Filters::parse(repository.schema(), params)?;
    let items = repository.list(&filters).await?;
    Ok(Json(items))
}

/// Create one resource.
///
/// # Errors
/// - `409` when the key or another unique value is taken.
/// - `422` for unknown, missing or mistyped fields.
pub async fn create_one<R>(
    State(repository): State<Arc<R>>,
    payload: Result<Json<Payload>, JsonRejection>,
) -> Result<(StatusCode, Json<R::Model>), ApiError>
where
    R: CrudRepository,
{
    let Json(payload) = payload.map_err(body_rejection)?;
    let created = repository.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace every non-key field of one resource.
///
/// # Errors
/// - `404` when no row has that key.
/// - `422` for a bad path, an attempt to change the key, or invalid fields.
pub async fn replace_one<R>(
    State(repository): State<Arc<R>>,
    Path(key): Path<String>,
    payload: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<R::Model>, ApiError>
where
    R: CrudRepository,
{
    let key = KeyValues::from_path(repository.schema(), &key)?;
    let Json(payload) = payload.map_err(body_rejection)?;
    let updated = repository.replace(&key, payload).await?;
    Ok(Json(updated))
}

/// Update the fields present in the body, leaving the rest untouched.
///
/// # Errors
/// - `404` when no row has that key.
/// - `422` for a bad path, an attempt to change the key, or invalid fields.
pub async fn patch_one<R>(
    State(repository): State<Arc<R>>,
    Path(key): Path<String>,
    payload: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<R::Model>, ApiError>
where
    R: CrudRepository,
{
    let key = KeyValues::from_path(repository.schema(), &key)?;
    let Json(partial) = payload.map_err(body_rejection)?;
    let updated = repository.patch(&key, partial).await?;
    Ok(Json(updated))
}

/// Delete one resource.
///
/// # Errors
/// - `404` when no row has that key, including a second delete of the same key.
pub async fn delete_one<R>(
    State(repository): State<Arc<R>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError>
where
    R: CrudRepository,
{
    let key = KeyValues::from_path(repository.schema(), &key)?;
    repository.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Keyed request whose path holds no key segment at all.
///
/// # Errors
/// - `422` naming the expected key segments.
pub async fn missing_key<R>(State(repository): State<Arc<R>>) -> Result<StatusCode, ApiError>
where
    R: CrudRepository,
{
    KeyValues::from_path(repository.schema(), "")?;
    Err(ApiError::not_found(repository.schema().resource_name(), None))
}

/// Build a router holding the CRUD routes for `repository` under `base_path`.
///
/// The router carries its own state, so it merges into an application
/// router of any state type.
pub fn crud_router<R, S>(base_path: &str, repository: Arc<R>) -> Router<S>
where
    R: CrudRepository,
    S: Clone + Send + Sync + 'static,
{
    let base = normalize_base(base_path);
    let collection = collection_path(&base);
    let item = item_path(&base);

    tracing::info!(
        resource = %repository.schema().resource_name(),
        path = %collection,
        key_fields = repository.schema().key_len(),
        "registering CRUD endpoints"
    );

    let mut router = Router::new()
        .route(&collection, get(get_all::<R>).post(create_one::<R>))
        .route(
            &item,
            get(get_one::<R>)
                .put(replace_one::<R>)
                .patch(patch_one::<R>)
                .delete(delete_one::<R>),
        );
    if let Some(empty) = empty_key_path(&base) {
        router = router.route(
            &empty,
            get(missing_key::<R>)
                .put(missing_key::<R>)
                .patch(missing_key::<R>)
                .delete(missing_key::<R>),
        );
    }
    router.with_state(repository)
}

/// Register the CRUD routes for `repository` on `app`.
///
/// # Panics
///
/// When `app` already has a route at the same paths; see [`Router::merge`].
pub fn add_crud_endpoints<R, S>(app: Router<S>, base_path: &str, repository: Arc<R>) -> Router<S>
where
    R: CrudRepository,
    S: Clone + Send + Sync + 'static,
{
    app.merge(crud_router(base_path, repository))
}
