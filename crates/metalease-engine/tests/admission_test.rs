//! Integration tests for the admission controller against in-memory
//! SurrealDB.

use chrono::{DateTime, Duration, TimeZone, Utc};
use metalease_core::error::MetaleaseError;
use metalease_core::models::offer::CreateOffer;
use metalease_core::repository::{LeasedNodeRepository, OfferRepository};
use metalease_db::repository::{SurrealLeasedNodeRepository, SurrealOfferRepository};
use metalease_engine::admission::{AdmissionController, AdmissionRequest};
use metalease_engine::config::EngineConfig;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Controller = AdmissionController<SurrealOfferRepository<Db>, SurrealLeasedNodeRepository<Db>>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 7, 16, 19, 20, 30).unwrap()
}

/// Spin up in-memory DB, run migrations, publish one 100-day offer.
async fn setup() -> (Controller, SurrealLeasedNodeRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    metalease_db::run_migrations(&db).await.unwrap();

    let offers = SurrealOfferRepository::new(db.clone());
    offers
        .create(CreateOffer {
            project_id: "project-owner".into(),
            resource_type: "baremetal_node".into(),
            resource_uuid: "node-1718".into(),
            start_time: t0(),
            end_time: t0() + Duration::days(100),
            properties: None,
        })
        .await
        .unwrap();

    let nodes = SurrealLeasedNodeRepository::new(db);
    let controller = AdmissionController::new(offers, nodes.clone(), EngineConfig::default());
    (controller, nodes)
}

fn request(from_day: i64, to_day: i64) -> AdmissionRequest {
    AdmissionRequest {
        resource_type: "baremetal_node".into(),
        resource_uuid: "node-1718".into(),
        start_time: t0() + Duration::days(from_day),
        end_time: t0() + Duration::days(to_day),
        project_id: "project-tenant".into(),
        request_id: None,
    }
}

#[tokio::test]
async fn grants_lease_inside_free_window() {
    let (controller, _nodes) = setup().await;

    let node = controller.request_lease(request(10, 20)).await.unwrap();
    assert_eq!(node.resource_uuid, "node-1718");
    assert_eq!(node.project_id, "project-tenant");
    assert_eq!(node.start_time, t0() + Duration::days(10));
}

#[tokio::test]
async fn grants_exact_offer_window() {
    let (controller, _nodes) = setup().await;
    assert!(controller.request_lease(request(0, 100)).await.is_ok());
}

#[tokio::test]
async fn rejects_window_outside_offer() {
    let (controller, _nodes) = setup().await;

    let err = controller.request_lease(request(90, 110)).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Conflict { .. }));
}

#[tokio::test]
async fn rejects_overlap_with_committed_lease() {
    let (controller, _nodes) = setup().await;

    controller.request_lease(request(10, 20)).await.unwrap();

    let err = controller.request_lease(request(15, 25)).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Conflict { .. }));
}

#[tokio::test]
async fn rejects_window_spanning_a_conflict_gap() {
    let (controller, _nodes) = setup().await;

    controller.request_lease(request(40, 50)).await.unwrap();

    // [30, 60) is covered by the union of the free windows [0, 40) and
    // [50, 100) but fits in neither alone.
    let err = controller.request_lease(request(30, 60)).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Conflict { .. }));
}

#[tokio::test]
async fn back_to_back_grants_are_admitted() {
    let (controller, _nodes) = setup().await;

    controller.request_lease(request(10, 20)).await.unwrap();
    controller.request_lease(request(20, 30)).await.unwrap();
    controller.request_lease(request(0, 10)).await.unwrap();
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let (controller, _nodes) = setup().await;

    let mut req = request(10, 20);
    req.resource_uuid = "node-unknown".into();

    let err = controller.request_lease(req).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));
}

#[tokio::test]
async fn empty_window_rejected_before_io() {
    let (controller, _nodes) = setup().await;

    let err = controller.request_lease(request(20, 20)).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Validation { .. }));

    let err = controller.request_lease(request(20, 10)).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Validation { .. }));
}

#[tokio::test]
async fn empty_resource_identifier_rejected() {
    let (controller, _nodes) = setup().await;

    let mut req = request(10, 20);
    req.resource_uuid = String::new();

    let err = controller.request_lease(req).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::Validation { .. }));
}

#[tokio::test]
async fn release_returns_interval_to_free_pool() {
    let (controller, _nodes) = setup().await;

    let node = controller.request_lease(request(10, 20)).await.unwrap();
    controller.release(node.id).await.unwrap();

    // The same window is admittable again.
    controller.request_lease(request(10, 20)).await.unwrap();

    let err = controller.release(node.id).await.unwrap_err();
    assert!(matches!(err, MetaleaseError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_overlapping_admissions_grant_at_most_one() {
    let (controller, nodes) = setup().await;

    // Two racing requests for overlapping windows on the same resource.
    let (a, b) = tokio::join!(
        controller.request_lease(request(10, 20)),
        controller.request_lease(request(15, 25)),
    );

    let granted = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, 1, "exactly one of the racers may win: {a:?} {b:?}");

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser.unwrap_err(),
        MetaleaseError::Conflict { .. }
    ));

    // The winner's grant is the only committed lease.
    assert_eq!(nodes.get_all().await.unwrap().len(), 1);
}
