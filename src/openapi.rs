//! OpenAPI description of the generated endpoints.
//!
//! [`crud_paths`] mirrors what [`crate::routes::crud_router`] registers, with
//! one typed path parameter per key field and one optional query parameter per
//! filterable field. Merge the result into an application document:
//!
//! ```rust,ignore
//! let mut doc = OpenApiBuilder::new().build();
//! doc.paths.merge(crud_paths("/items", items.schema()));
//! ```

use utoipa::openapi::{
    Content, ContentBuilder, KnownFormat, ObjectBuilder, Paths, RefOr, Required, Response,
    ResponseBuilder, Schema, SchemaFormat,
    path::{HttpMethod, Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn},
    request_body::RequestBodyBuilder,
    schema::{ArrayBuilder, Type},
};

use crate::routes::{collection_path, normalize_base};
use crate::schema::{FieldDescriptor, FieldKind, ModelSchema};

fn schema_type(kind: FieldKind) -> Option<Type> {
    match kind {
        FieldKind::Boolean => Some(Type::Boolean),
        FieldKind::Integer => Some(Type::Integer),
        FieldKind::Float => Some(Type::Number),
        FieldKind::Text | FieldKind::Uuid | FieldKind::Other => Some(Type::String),
        FieldKind::Json => None,
    }
}

fn field_schema(field: &FieldDescriptor) -> RefOr<Schema> {
    let mut builder = ObjectBuilder::new();
    if let Some(ty) = schema_type(field.kind()) {
        builder = builder.schema_type(ty);
    }
    if field.kind() == FieldKind::Uuid {
        builder = builder.format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid)));
    }
    RefOr::T(Schema::Object(builder.build()))
}

/// JSON object schema of one model row. Non-nullable fields are required.
#[must_use]
pub fn model_schema(schema: &ModelSchema) -> RefOr<Schema> {
    let mut object = ObjectBuilder::new()
        .schema_type(Type::Object)
        .title(Some(schema.resource_name()));
    for field in schema.fields() {
        object = object.property(field.name(), field_schema(field));
        if !field.is_nullable() {
            object = object.required(field.name());
        }
    }
    RefOr::T(Schema::Object(object.build()))
}

fn json_content(schema: RefOr<Schema>) -> Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn key_parameters(schema: &ModelSchema) -> Vec<Parameter> {
    schema
        .key_fields()
        .map(|field| {
            ParameterBuilder::new()
                .name(field.name())
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(field_schema(field)))
                .build()
        })
        .collect()
}

fn error_response(description: &str) -> Response {
    ResponseBuilder::new().description(description).build()
}

fn operation(schema: &ModelSchema, operation_id: &str, summary: String) -> OperationBuilder {
    let resource = schema.resource_name();
    OperationBuilder::new()
        .tag(resource)
        .operation_id(Some(format!("{operation_id}_{resource}")))
        .summary(Some(summary))
}

fn list_operation(schema: &ModelSchema) -> Operation {
    let resource = schema.resource_name();
    let mut builder = operation(
        schema,
        "find",
        format!("Find all {resource} items that match every filter value"),
    );
    for field in schema.fields().iter().filter(|f| f.kind() != FieldKind::Json) {
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(field.name())
                .parameter_in(ParameterIn::Query)
                .required(Required::False)
                .schema(Some(field_schema(field))),
        );
    }
    let items = ArrayBuilder::new().items(model_schema(schema)).build();
    builder
        .response(
            "200",
            ResponseBuilder::new()
                .description(format!("Matching {resource} items"))
                .content("application/json", json_content(RefOr::T(Schema::Array(items))))
                .build(),
        )
        .response("422", error_response("Unknown or malformed filter"))
        .build()
}

fn create_operation(schema: &ModelSchema) -> Operation {
    let resource = schema.resource_name();
    operation(schema, "create", format!("Create a new {resource} item"))
        .request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", json_content(model_schema(schema)))
                .required(Some(Required::True))
                .build(),
        ))
        .response(
            "201",
            ResponseBuilder::new()
                .description(format!("The created {resource} item"))
                .content("application/json", json_content(model_schema(schema)))
                .build(),
        )
        .response("409", error_response("An item with the same key already exists"))
        .response("422", error_response("Invalid payload"))
        .build()
}

fn keyed_operation(
    schema: &ModelSchema,
    operation_id: &str,
    summary: String,
    body: bool,
    success: (&str, &str),
) -> Operation {
    let mut builder = operation(schema, operation_id, summary);
    for parameter in key_parameters(schema) {
        builder = builder.parameter(parameter);
    }
    if body {
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content("application/json", json_content(model_schema(schema)))
                .required(Some(Required::True))
                .build(),
        ));
    }
    let (status, description) = success;
    let mut response = ResponseBuilder::new().description(description);
    if status == "200" {
        response = response.content("application/json", json_content(model_schema(schema)));
    }
    builder
        .response(status, response.build())
        .response("404", error_response("Item not found"))
        .response("422", error_response("Malformed key or payload"))
        .build()
}

/// Template of the keyed route, e.g. `/memberships/{tenant}/{id}`.
#[must_use]
pub fn item_template(base_path: &str, schema: &ModelSchema) -> String {
    let mut path = normalize_base(base_path);
    for field in schema.key_fields() {
        path.push_str("/{");
        path.push_str(field.name());
        path.push('}');
    }
    path
}

/// Path items for the routes registered under `base_path`.
#[must_use]
pub fn crud_paths(base_path: &str, schema: &ModelSchema) -> Paths {
    let resource = schema.resource_name();
    let collection = collection_path(&normalize_base(base_path));
    let item = item_template(base_path, schema);

    let mut paths = Paths::new();
    paths.add_path_operation(&collection, vec![HttpMethod::Get], list_operation(schema));
    paths.add_path_operation(&collection, vec![HttpMethod::Post], create_operation(schema));
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Get],
        keyed_operation(
            schema,
            "get",
            format!("Get a {resource} item by its primary key"),
            false,
            ("200", "The requested item"),
        ),
    );
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Put],
        keyed_operation(
            schema,
            "update",
            format!("Update all the attributes of a given {resource} item"),
            true,
            ("200", "The updated item"),
        ),
    );
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Patch],
        keyed_operation(
            schema,
            "patch",
            format!("Update one or more attributes of a given {resource} item"),
            true,
            ("200", "The updated item"),
        ),
    );
    paths.add_path_operation(
        &item,
        vec![HttpMethod::Delete],
        keyed_operation(
            schema,
            "delete",
            format!("Delete a {resource} item by its primary key"),
            false,
            ("204", "Item deleted"),
        ),
    );
    paths
}
