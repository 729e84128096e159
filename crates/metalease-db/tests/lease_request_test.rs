//! Integration tests for the LeaseRequest repository using in-memory
//! SurrealDB.

use chrono::{DateTime, Duration, TimeZone, Utc};
use metalease_core::error::MetaleaseError;
use metalease_core::models::lease_request::{
    CreateLeaseRequest, LeaseRequestStatus, UpdateLeaseRequest,
};
use metalease_core::repository::LeaseRequestRepository;
use metalease_db::repository::SurrealLeaseRequestRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    metalease_db::run_migrations(&db).await.unwrap();
    db
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 7, 16, 19, 20, 30).unwrap()
}

fn request_input(project_id: &str) -> CreateLeaseRequest {
    CreateLeaseRequest {
        project_id: project_id.into(),
        start_time: t0(),
        end_time: t0() + Duration::days(10),
        properties: None,
    }
}

#[tokio::test]
async fn create_starts_as_requested() {
    let db = setup().await;
    let repo = SurrealLeaseRequestRepository::new(db);

    let request = repo.create(request_input("project-a")).await.unwrap();
    assert_eq!(request.status, LeaseRequestStatus::Requested);

    let fetched = repo.get(request.id).await.unwrap();
    assert_eq!(fetched.id, request.id);
    assert_eq!(fetched.status, LeaseRequestStatus::Requested);
}

#[tokio::test]
async fn create_rejects_empty_project() {
    let db = setup().await;
    let repo = SurrealLeaseRequestRepository::new(db);

    let err = repo.create(request_input("")).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Validation { .. }));
}

#[tokio::test]
async fn update_status_to_granted() {
    let db = setup().await;
    let repo = SurrealLeaseRequestRepository::new(db);

    let request = repo.create(request_input("project-a")).await.unwrap();
    let updated = repo
        .update(
            request.id,
            UpdateLeaseRequest {
                status: Some(LeaseRequestStatus::Granted),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, LeaseRequestStatus::Granted);
    assert!(updated.updated_at >= request.updated_at);
}

#[tokio::test]
async fn list_by_project() {
    let db = setup().await;
    let repo = SurrealLeaseRequestRepository::new(db);

    repo.create(request_input("project-a")).await.unwrap();
    repo.create(request_input("project-a")).await.unwrap();
    repo.create(request_input("project-b")).await.unwrap();

    assert_eq!(repo.get_all().await.unwrap().len(), 3);
    assert_eq!(repo.get_all_by_project("project-a").await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_unknown_request_is_not_found() {
    let db = setup().await;
    let repo = SurrealLeaseRequestRepository::new(db);

    let err = repo.get(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));
}
