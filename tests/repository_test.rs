// Repository operations called directly, without the HTTP layer.

use crudwire::{CrudRepository, Filters, KeyValues, RepositoryError};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

mod common;
use common::{item_entity, items, memberships, payload, setup_test_db, tasks};

#[tokio::test]
async fn test_create_then_get_returns_same_row() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = items(&db);

    let created = repo
        .create(payload(json!({"id": 1, "name": "a"})))
        .await
        .unwrap();
    assert_eq!(
        created,
        item_entity::Model {
            id: 1,
            name: "a".to_string()
        }
    );

    let fetched = repo.get(&KeyValues::from([1])).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = items(&db);

    let err = repo.get(&KeyValues::from([42])).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { ref key, .. } if key == "42"));
}

#[tokio::test]
async fn test_empty_patch_leaves_row_unchanged() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = tasks(&db);

    let created = repo
        .create(payload(json!({"title": "t", "priority": 1, "done": false})))
        .await
        .unwrap();
    let key = KeyValues::from([created.id]);

    let patched = repo.patch(&key, payload(json!({}))).await.unwrap();
    assert_eq!(patched, created);

    // A key-only patch with the same value is also a no-op
    let patched = repo
        .patch(&key, payload(json!({"id": created.id})))
        .await
        .unwrap();
    assert_eq!(patched, created);
    assert_eq!(repo.get(&key).await.unwrap(), created);
}

#[tokio::test]
async fn test_patch_only_touches_present_fields() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = tasks(&db);

    let created = repo
        .create(payload(
            json!({"title": "t", "priority": 1, "done": false, "note": "n"}),
        ))
        .await
        .unwrap();
    let key = KeyValues::from([created.id]);

    let patched = repo
        .patch(&key, payload(json!({"done": true, "note": null})))
        .await
        .unwrap();
    assert!(patched.done);
    assert_eq!(patched.note, None);
    assert_eq!(patched.title, "t");
    assert_eq!(patched.priority, 1);
}

#[tokio::test]
async fn test_replace_with_other_key_leaves_row_unchanged() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = items(&db);

    repo.create(payload(json!({"id": 1, "name": "a"})))
        .await
        .unwrap();

    let err = repo
        .replace(&KeyValues::from([1]), payload(json!({"id": 2, "name": "b"})))
        .await
        .unwrap_err();
    let errors = match err {
        RepositoryError::Validation(errors) => errors,
        other => panic!("expected a validation error, got {other:?}"),
    };
    assert_eq!(errors.errors()[0].field, "id");

    let row = repo.get(&KeyValues::from([1])).await.unwrap();
    assert_eq!(row.name, "a");
    assert!(repo.get(&KeyValues::from([2])).await.is_err());

    let rows = item_entity::Entity::find()
        .count(repo.connection())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_delete_twice() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = memberships(&db);

    repo.create(payload(json!({"tenant": 5, "id": 7, "role": "admin"})))
        .await
        .unwrap();

    let key = KeyValues::from([5, 7]);
    repo.delete(&key).await.unwrap();
    assert!(matches!(
        repo.delete(&key).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_key_is_conflict() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = memberships(&db);

    repo.create(payload(json!({"tenant": 5, "id": 7, "role": "admin"})))
        .await
        .unwrap();
    // Same id under another tenant is a different row
    repo.create(payload(json!({"tenant": 6, "id": 7, "role": "admin"})))
        .await
        .unwrap();

    let err = repo
        .create(payload(json!({"tenant": 5, "id": 7, "role": "viewer"})))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));
    assert!(err.to_string().contains("5/7"));
}

#[tokio::test]
async fn test_list_with_filters() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = memberships(&db);

    for (tenant, id, role) in [(1, 1, "admin"), (1, 2, "viewer"), (2, 1, "viewer")] {
        repo.create(payload(json!({"tenant": tenant, "id": id, "role": role})))
            .await
            .unwrap();
    }

    let all = repo.list(&Filters::new()).await.unwrap();
    assert_eq!(all.len(), 3);

    let viewers = repo
        .list(&Filters::new().equals("role", "viewer"))
        .await
        .unwrap();
    let keys: Vec<_> = viewers.iter().map(|m| (m.tenant, m.id)).collect();
    assert_eq!(keys, vec![(1, 2), (2, 1)]);

    let err = repo
        .list(&Filters::new().equals("colour", "red"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
}

#[tokio::test]
async fn test_resource_name_appears_in_errors() {
    let db = setup_test_db()
        .await
        .expect("Failed to setup test database");
    let repo = tasks(&db);

    assert_eq!(repo.schema().resource_name(), "Task");
    let err = repo.get(&KeyValues::from([9])).await.unwrap_err();
    assert_eq!(err.to_string(), "Task '9' not found");
}
