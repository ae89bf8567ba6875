use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use lifeline_domain::entities::{
    Actor, ActorStatus, EmergencyKind, EmergencyRequest, GeoLocation, RequestStatus, VehicleInfo,
};
use lifeline_domain::repositories::{ActorRepository, RequestRepository};
use lifeline_infrastructure::database::run_migrations;
use lifeline_infrastructure::{SqliteActorRepository, SqliteRequestRepository};

async fn setup_pool() -> SqlitePool {
    // 内存库必须限制为单连接，否则每个连接各有一份空库
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn sample_user() -> Actor {
    Actor::new_user("Asha Verma", Some("9876543210".to_string()))
}

fn sample_captain() -> Actor {
    Actor::new_captain("Ravi Kumar", Some("9123456789".to_string())).with_vehicle(VehicleInfo {
        color: "White".to_string(),
        plate: "KA01AB1234".to_string(),
        capacity: 4,
        vehicle_type: "car".to_string(),
    })
}

fn sample_request(requester: &Actor) -> EmergencyRequest {
    EmergencyRequest::new(
        requester,
        GeoLocation {
            lat: 10.0,
            lng: 20.0,
            address: Some("MG Road".to_string()),
        },
        EmergencyKind::Medical,
        "chest pain",
    )
}

#[tokio::test]
async fn test_actor_round_trip() {
    let pool = setup_pool().await;
    let repo = SqliteActorRepository::new(pool);

    let captain = sample_captain();
    repo.create(&captain).await.unwrap();

    let loaded = repo.get_by_id(captain.id).await.unwrap().unwrap();
    assert_eq!(loaded.full_name, "Ravi Kumar");
    assert_eq!(loaded.kind, captain.kind);
    assert_eq!(loaded.vehicle, captain.vehicle);
    assert_eq!(loaded.location, None);
}

#[tokio::test]
async fn test_actor_update_persists_location() {
    let pool = setup_pool().await;
    let repo = SqliteActorRepository::new(pool);

    let mut captain = sample_captain();
    repo.create(&captain).await.unwrap();

    captain.location = Some(lifeline_domain::entities::Coordinates::new(12.9, 77.6));
    repo.update(&captain).await.unwrap();

    let loaded = repo.get_by_id(captain.id).await.unwrap().unwrap();
    let location = loaded.location.unwrap();
    assert!((location.lat - 12.9).abs() < f64::EPSILON);
    assert!((location.lng - 77.6).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_find_active_captains_filters_kind_and_status() {
    let pool = setup_pool().await;
    let repo = SqliteActorRepository::new(pool);

    let user = sample_user();
    let active = sample_captain();
    let mut inactive = sample_captain();
    inactive.status = ActorStatus::Inactive;

    repo.create(&user).await.unwrap();
    repo.create(&active).await.unwrap();
    repo.create(&inactive).await.unwrap();

    let captains = repo.find_active_captains().await.unwrap();
    assert_eq!(captains.len(), 1);
    assert_eq!(captains[0].id, active.id);
}

#[tokio::test]
async fn test_request_round_trip() {
    let pool = setup_pool().await;
    let actor_repo = SqliteActorRepository::new(pool.clone());
    let repo = SqliteRequestRepository::new(pool);

    let user = sample_user();
    actor_repo.create(&user).await.unwrap();

    let request = sample_request(&user);
    repo.create(&request).await.unwrap();

    let loaded = repo.get_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, RequestStatus::Pending);
    assert_eq!(loaded.requester_name, "Asha Verma");
    assert_eq!(loaded.location.address.as_deref(), Some("MG Road"));
    assert_eq!(loaded.assigned_captain_id, None);
    assert!(!loaded.response.accepted);
}

#[tokio::test]
async fn test_get_missing_request_returns_none() {
    let pool = setup_pool().await;
    let repo = SqliteRequestRepository::new(pool);
    assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_try_assign_is_first_writer_wins() {
    let pool = setup_pool().await;
    let repo = SqliteRequestRepository::new(pool);

    let user = sample_user();
    let request = sample_request(&user);
    repo.create(&request).await.unwrap();

    let first_captain = Uuid::new_v4();
    let second_captain = Uuid::new_v4();

    let assigned = repo
        .try_assign(request.id, first_captain, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(assigned.status, RequestStatus::Accepted);
    assert_eq!(assigned.assigned_captain_id, Some(first_captain));
    assert!(assigned.response.accepted);
    assert!(assigned.response.responded_at.is_some());

    // 第二次条件更新不命中任何行
    let lost = repo
        .try_assign(request.id, second_captain, Utc::now())
        .await
        .unwrap();
    assert!(lost.is_none());

    let loaded = repo.get_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(loaded.assigned_captain_id, Some(first_captain));
}

#[tokio::test]
async fn test_update_status_from_requires_matching_state() {
    let pool = setup_pool().await;
    let repo = SqliteRequestRepository::new(pool);

    let user = sample_user();
    let request = sample_request(&user);
    repo.create(&request).await.unwrap();

    // 期望状态不匹配时不更新
    let missed = repo
        .update_status_from(
            request.id,
            RequestStatus::Accepted,
            RequestStatus::Completed,
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(missed.is_none());

    let updated = repo
        .update_status_from(
            request.id,
            RequestStatus::Pending,
            RequestStatus::Cancelled,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_list_queries_sorted_newest_first() {
    let pool = setup_pool().await;
    let repo = SqliteRequestRepository::new(pool);

    let user = sample_user();
    let mut older = sample_request(&user);
    older.created_at = Utc::now() - chrono::Duration::minutes(5);
    let newer = sample_request(&user);

    repo.create(&older).await.unwrap();
    repo.create(&newer).await.unwrap();

    let by_requester = repo.find_by_requester(user.id).await.unwrap();
    assert_eq!(by_requester.len(), 2);
    assert_eq!(by_requester[0].id, newer.id);
    assert_eq!(by_requester[1].id, older.id);

    let captain_id = Uuid::new_v4();
    repo.try_assign(newer.id, captain_id, Utc::now())
        .await
        .unwrap()
        .unwrap();

    let by_captain = repo.find_by_captain(captain_id).await.unwrap();
    assert_eq!(by_captain.len(), 1);
    assert_eq!(by_captain[0].id, newer.id);
}
