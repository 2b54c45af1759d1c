//! # crudwire
//!
//! Generic CRUD endpoints for Sea-ORM entities on Axum.
//!
//! A [`Repository`] performs get/list/create/replace/patch/delete for one
//! entity, driven by the entity's [`ModelSchema`]. [`add_crud_endpoints`]
//! exposes it over HTTP and [`crud_paths`] describes those routes in OpenAPI.
//!
//! ```rust,ignore
//! use crudwire::{Repository, add_crud_endpoints};
//! use std::sync::Arc;
//!
//! let items = Arc::new(Repository::<item::Entity>::new(db.clone()));
//! let app = add_crud_endpoints(Router::new(), "/items", items);
//! ```

pub mod errors;
pub mod filter;
pub mod keys;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod validation;

pub use errors::{ApiError, RepositoryError};
pub use filter::Filters;
pub use keys::KeyValues;
pub use openapi::crud_paths;
pub use repository::{CrudRepository, Payload, Repository};
pub use routes::{add_crud_endpoints, crud_router};
pub use schema::{FieldDescriptor, FieldKind, FieldValue, ModelSchema};
pub use validation::{ValidationError, ValidationErrors};
