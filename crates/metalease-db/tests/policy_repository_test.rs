//! Integration tests for the Policy repository and applied-policy
//! associations using in-memory SurrealDB.

use metalease_core::error::MetaleaseError;
use metalease_core::models::policy::{CreatePolicy, UpdatePolicy};
use metalease_core::repository::PolicyRepository;
use metalease_db::repository::SurrealPolicyRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    metalease_db::run_migrations(&db).await.unwrap();
    db
}

fn policy_input(project_id: &str, name: &str) -> CreatePolicy {
    CreatePolicy {
        project_id: project_id.into(),
        name: name.into(),
        properties: Some(serde_json::json!({ "max_lease_days": 30 })),
    }
}

#[tokio::test]
async fn create_get_update_policy() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(policy_input("project-a", "default"))
        .await
        .unwrap();
    assert_eq!(policy.name, "default");
    assert_eq!(policy.properties["max_lease_days"], 30);

    let fetched = repo.get(policy.id).await.unwrap();
    assert_eq!(fetched.id, policy.id);

    let updated = repo
        .update(
            policy.id,
            UpdatePolicy {
                name: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.properties["max_lease_days"], 30); // unchanged
}

#[tokio::test]
async fn list_policies_by_project() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    repo.create(policy_input("project-a", "one")).await.unwrap();
    repo.create(policy_input("project-a", "two")).await.unwrap();
    repo.create(policy_input("project-b", "other"))
        .await
        .unwrap();

    let all = repo.get_all().await.unwrap();
    assert_eq!(all.len(), 3);

    let for_a = repo.get_all_by_project("project-a").await.unwrap();
    assert_eq!(for_a.len(), 2);
}

#[tokio::test]
async fn duplicate_policy_name_in_project_rejected() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    repo.create(policy_input("project-a", "default"))
        .await
        .unwrap();
    let result = repo.create(policy_input("project-a", "default")).await;
    assert!(result.is_err(), "duplicate name should be rejected");
}

#[tokio::test]
async fn apply_and_fetch_by_composite_key() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(policy_input("project-a", "default"))
        .await
        .unwrap();

    let applied = repo.apply_to_node("node-1718", policy.id).await.unwrap();
    assert_eq!(applied.node_uuid, "node-1718");
    assert_eq!(applied.policy_id, policy.id);
    assert_eq!(applied.project_id, "project-a");

    let fetched = repo.get_applied("node-1718", policy.id).await.unwrap();
    assert_eq!(fetched.node_uuid, applied.node_uuid);
    assert_eq!(fetched.policy_id, applied.policy_id);

    let by_project = repo.get_all_applied_by_project("project-a").await.unwrap();
    assert_eq!(by_project.len(), 1);
}

#[tokio::test]
async fn applying_same_policy_to_node_twice_rejected() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(policy_input("project-a", "default"))
        .await
        .unwrap();

    repo.apply_to_node("node-1718", policy.id).await.unwrap();
    let result = repo.apply_to_node("node-1718", policy.id).await;
    assert!(result.is_err(), "composite key should be unique");
}

#[tokio::test]
async fn apply_unknown_policy_fails() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let err = repo
        .apply_to_node("node-1718", uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));
}

#[tokio::test]
async fn remove_from_node_leaves_policy() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(policy_input("project-a", "default"))
        .await
        .unwrap();
    repo.apply_to_node("node-1718", policy.id).await.unwrap();

    repo.remove_from_node("node-1718", policy.id).await.unwrap();

    let err = repo.get_applied("node-1718", policy.id).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));

    // The policy itself survives.
    assert!(repo.get(policy.id).await.is_ok());
}

#[tokio::test]
async fn destroy_policy_cascades_associations() {
    let db = setup().await;
    let repo = SurrealPolicyRepository::new(db);

    let policy = repo
        .create(policy_input("project-a", "default"))
        .await
        .unwrap();
    repo.apply_to_node("node-1", policy.id).await.unwrap();
    repo.apply_to_node("node-2", policy.id).await.unwrap();

    repo.destroy(policy.id).await.unwrap();

    let err = repo.get(policy.id).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));
    assert!(repo.get_all_applied().await.unwrap().is_empty());
}
