use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use lifeline_core::{DispatchError, DispatchResult};
use lifeline_dispatcher::{CreateRequestInput, DispatchCoordinator, Notifier};
use lifeline_domain::entities::{
    Actor, ActorKind, Coordinates, EmergencyKind, EmergencyRequest, RequestStatus,
};
use lifeline_domain::events::NotificationEvent;
use lifeline_domain::ports::{
    GeocodingService, LiveGateway, RouteEstimate, RouteService, SessionId, SessionRegistry,
};
use lifeline_domain::repositories::{ActorRepository, RequestRepository};
use lifeline_infrastructure::{
    InMemoryActorRepository, InMemoryRequestRepository, InMemorySessionRegistry,
};

/// 记录所有投递的测试网关，可配置若干失效会话
#[derive(Default)]
struct RecordingGateway {
    delivered: Mutex<Vec<(SessionId, NotificationEvent)>>,
    dead_sessions: Mutex<HashSet<SessionId>>,
}

impl RecordingGateway {
    fn mark_dead(&self, session: &str) {
        self.dead_sessions
            .lock()
            .unwrap()
            .insert(session.to_string());
    }

    fn delivered(&self) -> Vec<(SessionId, NotificationEvent)> {
        self.delivered.lock().unwrap().clone()
    }

    fn delivered_to(&self, session: &str) -> Vec<NotificationEvent> {
        self.delivered()
            .into_iter()
            .filter(|(s, _)| s == session)
            .map(|(_, e)| e)
            .collect()
    }
}

#[async_trait]
impl LiveGateway for RecordingGateway {
    async fn send(&self, session: &SessionId, event: &NotificationEvent) -> DispatchResult<()> {
        if self.dead_sessions.lock().unwrap().contains(session) {
            return Err(DispatchError::delivery_error(format!(
                "session {session} is gone"
            )));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((session.clone(), event.clone()));
        Ok(())
    }
}

struct StaticGeocoder {
    address: Option<String>,
}

#[async_trait]
impl GeocodingService for StaticGeocoder {
    async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> Option<String> {
        self.address.clone()
    }
}

struct StaticRoute {
    estimate: Option<RouteEstimate>,
}

#[async_trait]
impl RouteService for StaticRoute {
    async fn distance_and_eta(
        &self,
        _origin: &Coordinates,
        _destination: &Coordinates,
    ) -> Option<RouteEstimate> {
        self.estimate.clone()
    }
}

/// create 恒定失败的仓储包装，用于验证"持久化失败则零广播"
struct FailingCreateRepository {
    inner: InMemoryRequestRepository,
}

#[async_trait]
impl RequestRepository for FailingCreateRepository {
    async fn create(&self, _request: &EmergencyRequest) -> DispatchResult<EmergencyRequest> {
        Err(DispatchError::database_error("disk full"))
    }
    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<EmergencyRequest>> {
        self.inner.get_by_id(id).await
    }
    async fn try_assign(
        &self,
        id: Uuid,
        captain_id: Uuid,
        responded_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        self.inner.try_assign(id, captain_id, responded_at).await
    }
    async fn update_status_from(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        self.inner
            .update_status_from(id, from, to, updated_at)
            .await
    }
    async fn find_by_requester(&self, requester_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        self.inner.find_by_requester(requester_id).await
    }
    async fn find_by_captain(&self, captain_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        self.inner.find_by_captain(captain_id).await
    }
}

struct Harness {
    coordinator: Arc<DispatchCoordinator>,
    actor_repo: Arc<InMemoryActorRepository>,
    request_repo: Arc<InMemoryRequestRepository>,
    registry: Arc<InMemorySessionRegistry>,
    gateway: Arc<RecordingGateway>,
}

fn build_harness(
    geocoder_address: Option<&str>,
    route: Option<RouteEstimate>,
) -> Harness {
    let actor_repo = Arc::new(InMemoryActorRepository::new());
    let request_repo = Arc::new(InMemoryRequestRepository::new());
    let registry = Arc::new(InMemorySessionRegistry::new());
    let gateway = Arc::new(RecordingGateway::default());

    let notifier = Notifier::new(registry.clone(), gateway.clone());
    let coordinator = Arc::new(DispatchCoordinator::new(
        actor_repo.clone(),
        request_repo.clone(),
        registry.clone(),
        notifier,
        Arc::new(StaticGeocoder {
            address: geocoder_address.map(String::from),
        }),
        Arc::new(StaticRoute { estimate: route }),
    ));

    Harness {
        coordinator,
        actor_repo,
        request_repo,
        registry,
        gateway,
    }
}

async fn add_user(harness: &Harness, name: &str) -> Actor {
    let user = Actor::new_user(name, Some("9876543210".to_string()));
    harness.actor_repo.create(&user).await.unwrap();
    user
}

async fn add_online_captain(harness: &Harness, name: &str, session: &str) -> Actor {
    let captain = Actor::new_captain(name, Some("9123456789".to_string()));
    harness.actor_repo.create(&captain).await.unwrap();
    harness
        .registry
        .register(captain.id, ActorKind::Captain, session.to_string())
        .await;
    captain
}

fn medical_input(lat: f64, lng: f64) -> CreateRequestInput {
    CreateRequestInput {
        lat,
        lng,
        kind: EmergencyKind::Medical,
        description: "chest pain".to_string(),
    }
}

#[tokio::test]
async fn test_create_broadcast_and_first_acceptance_scenario() {
    let harness = build_harness(Some("MG Road, Bengaluru"), None);
    let user = add_user(&harness, "Asha Verma").await;
    let r1 = add_online_captain(&harness, "Ravi Kumar", "sess-r1").await;
    let r2 = add_online_captain(&harness, "Sunil Rao", "sess-r2").await;

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.requester_id, user.id);
    assert!(created.location.address.is_some());
    assert_eq!(harness.request_repo.count(), 1);

    // 两名在线救援者各收到一条 alert，requestId 一致
    for session in ["sess-r1", "sess-r2"] {
        let events = harness.gateway.delivered_to(session);
        assert_eq!(events.len(), 1, "captain at {session} should get one alert");
        assert_eq!(events[0].event_name(), "emergency-alert");
        assert_eq!(events[0].request_id(), created.id);
    }

    // R1 抢单成功
    let accepted = harness
        .coordinator
        .accept_request(r1.id, created.id)
        .await
        .unwrap();
    assert_eq!(accepted.request.status, RequestStatus::Accepted);
    assert_eq!(accepted.request.assigned_captain_id, Some(r1.id));
    assert!(accepted.request.response.accepted);

    // R2 晚到，拿到明确的拒绝
    let rejected = harness.coordinator.accept_request(r2.id, created.id).await;
    assert!(matches!(
        rejected,
        Err(DispatchError::AlreadyProcessed { id }) if id == created.id
    ));

    // 指派不被第二次尝试覆盖
    let stored = harness
        .request_repo
        .get_by_id(created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.assigned_captain_id, Some(r1.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_acceptance_wins_under_concurrency() {
    let harness = build_harness(Some("MG Road"), None);
    let user = add_user(&harness, "Asha Verma").await;

    let mut captain_ids = Vec::new();
    for i in 0..8 {
        let captain =
            add_online_captain(&harness, &format!("Captain {i}"), &format!("sess-{i}")).await;
        captain_ids.push(captain.id);
    }

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for captain_id in captain_ids.clone() {
        let coordinator = harness.coordinator.clone();
        let request_id = created.id;
        handles.push(tokio::spawn(async move {
            coordinator.accept_request(captain_id, request_id).await
        }));
    }

    let mut winners = Vec::new();
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(accepted) => winners.push(accepted.request.assigned_captain_id.unwrap()),
            Err(DispatchError::AlreadyProcessed { .. }) => rejections += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one captain must win");
    assert_eq!(rejections, 7);

    let stored = harness
        .request_repo
        .get_by_id(created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.assigned_captain_id, Some(winners[0]));
    assert_eq!(stored.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn test_no_broadcast_when_persistence_fails() {
    let actor_repo = Arc::new(InMemoryActorRepository::new());
    let registry = Arc::new(InMemorySessionRegistry::new());
    let gateway = Arc::new(RecordingGateway::default());
    let failing_repo = Arc::new(FailingCreateRepository {
        inner: InMemoryRequestRepository::new(),
    });

    let coordinator = DispatchCoordinator::new(
        actor_repo.clone(),
        failing_repo,
        registry.clone(),
        Notifier::new(registry.clone(), gateway.clone()),
        Arc::new(StaticGeocoder { address: None }),
        Arc::new(StaticRoute { estimate: None }),
    );

    let user = Actor::new_user("Asha Verma", None);
    actor_repo.create(&user).await.unwrap();
    let captain = Actor::new_captain("Ravi Kumar", None);
    actor_repo.create(&captain).await.unwrap();
    registry
        .register(captain.id, ActorKind::Captain, "sess-c".to_string())
        .await;

    let result = coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await;
    assert!(matches!(result, Err(DispatchError::DatabaseOperation(_))));
    assert!(
        gateway.delivered().is_empty(),
        "no alert may be sent for a request that was never persisted"
    );
}

#[tokio::test]
async fn test_address_degrades_to_coordinate_placeholder() {
    let harness = build_harness(None, None);
    let user = add_user(&harness, "Asha Verma").await;

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(12.34, 56.78))
        .await
        .unwrap();

    let address = created.location.address.unwrap();
    assert_eq!(address, "Location at 12.340000, 56.780000");
    assert!(address.contains("12.34"));
    assert!(address.contains("56.78"));
}

#[tokio::test]
async fn test_invalid_coordinates_rejected_before_persistence() {
    let harness = build_harness(Some("somewhere"), None);
    let user = add_user(&harness, "Asha Verma").await;

    let result = harness
        .coordinator
        .create_request(user.id, medical_input(95.0, 20.0))
        .await;
    assert!(matches!(result, Err(DispatchError::InvalidLocation(_))));
    assert_eq!(harness.request_repo.count(), 0);
}

#[tokio::test]
async fn test_delivery_isolation_with_dead_session() {
    let harness = build_harness(Some("MG Road"), None);
    let user = add_user(&harness, "Asha Verma").await;
    let _c1 = add_online_captain(&harness, "Captain One", "sess-1").await;
    let _c2 = add_online_captain(&harness, "Captain Two", "sess-2").await;
    let _c3 = add_online_captain(&harness, "Captain Three", "sess-3").await;
    harness.gateway.mark_dead("sess-2");

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(harness.gateway.delivered_to("sess-1").len(), 1);
    assert_eq!(harness.gateway.delivered_to("sess-2").len(), 0);
    assert_eq!(harness.gateway.delivered_to("sess-3").len(), 1);
}

#[tokio::test]
async fn test_accept_succeeds_with_offline_requester() {
    let harness = build_harness(Some("MG Road"), None);
    let user = add_user(&harness, "Asha Verma").await;
    let captain = add_online_captain(&harness, "Ravi Kumar", "sess-c").await;

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    // 请求者从未注册会话，通知静默丢弃，接单本身成功
    let accepted = harness
        .coordinator
        .accept_request(captain.id, created.id)
        .await
        .unwrap();
    assert_eq!(accepted.request.status, RequestStatus::Accepted);

    let accepted_events: Vec<_> = harness
        .gateway
        .delivered()
        .into_iter()
        .filter(|(_, e)| e.event_name() == "emergency-accepted")
        .collect();
    assert!(accepted_events.is_empty());
}

#[tokio::test]
async fn test_accept_notifies_online_requester_with_route() {
    let harness = build_harness(
        Some("MG Road"),
        Some(RouteEstimate {
            distance_text: "4.2 km".to_string(),
            duration_text: "11 mins".to_string(),
        }),
    );
    let user = add_user(&harness, "Asha Verma").await;
    harness
        .registry
        .register(user.id, ActorKind::User, "sess-user".to_string())
        .await;

    let mut captain = add_online_captain(&harness, "Ravi Kumar", "sess-c").await;
    captain.location = Some(Coordinates::new(12.9, 77.6));
    harness.actor_repo.update(&captain).await.unwrap();

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    let accepted = harness
        .coordinator
        .accept_request(captain.id, created.id)
        .await
        .unwrap();
    assert_eq!(
        accepted.route,
        Some(RouteEstimate {
            distance_text: "4.2 km".to_string(),
            duration_text: "11 mins".to_string(),
        })
    );

    let events = harness.gateway.delivered_to("sess-user");
    assert_eq!(events.len(), 1);
    match &events[0] {
        NotificationEvent::EmergencyAccepted(payload) => {
            assert_eq!(payload.request_id, created.id);
            assert_eq!(payload.captain_name, "Ravi Kumar");
            assert_eq!(payload.eta, "11 mins");
            assert_eq!(payload.distance.as_deref(), Some("4.2 km"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_accepted_request_cannot_be_reassigned() {
    let harness = build_harness(Some("MG Road"), None);
    let user = add_user(&harness, "Asha Verma").await;
    let winner = add_online_captain(&harness, "Winner", "sess-w").await;
    let late = add_online_captain(&harness, "Late", "sess-l").await;

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    harness
        .coordinator
        .accept_request(winner.id, created.id)
        .await
        .unwrap();

    // 无论谁再次调用，包括赢家自己，都必须收到 AlreadyProcessed
    for captain_id in [late.id, winner.id] {
        let result = harness
            .coordinator
            .accept_request(captain_id, created.id)
            .await;
        assert!(matches!(
            result,
            Err(DispatchError::AlreadyProcessed { .. })
        ));
    }
}

#[tokio::test]
async fn test_accept_missing_request_is_not_found() {
    let harness = build_harness(None, None);
    let captain = add_online_captain(&harness, "Ravi Kumar", "sess-c").await;

    let result = harness
        .coordinator
        .accept_request(captain.id, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(DispatchError::RequestNotFound { .. })));
}

#[tokio::test]
async fn test_status_update_follows_transition_table() {
    let harness = build_harness(Some("MG Road"), None);
    let user = add_user(&harness, "Asha Verma").await;
    harness
        .registry
        .register(user.id, ActorKind::User, "sess-user".to_string())
        .await;
    let captain = add_online_captain(&harness, "Ravi Kumar", "sess-c").await;

    let created = harness
        .coordinator
        .create_request(user.id, medical_input(10.0, 20.0))
        .await
        .unwrap();

    // pending 不能直接完成
    let result = harness
        .coordinator
        .update_status(created.id, RequestStatus::Completed)
        .await;
    assert!(matches!(
        result,
        Err(DispatchError::InvalidTransition { .. })
    ));

    // accepted 必须经由抢单路径
    let result = harness
        .coordinator
        .update_status(created.id, RequestStatus::Accepted)
        .await;
    assert!(matches!(
        result,
        Err(DispatchError::InvalidTransition { .. })
    ));

    harness
        .coordinator
        .accept_request(captain.id, created.id)
        .await
        .unwrap();

    let completed = harness
        .coordinator
        .update_status(created.id, RequestStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, RequestStatus::Completed);

    // 终态之后一切流转被拒绝
    let result = harness
        .coordinator
        .update_status(created.id, RequestStatus::Cancelled)
        .await;
    assert!(matches!(
        result,
        Err(DispatchError::InvalidTransition { .. })
    ));

    let status_events: Vec<_> = harness
        .gateway
        .delivered_to("sess-user")
        .into_iter()
        .filter(|e| e.event_name() == "emergency-status-updated")
        .collect();
    assert_eq!(status_events.len(), 1);
    match &status_events[0] {
        NotificationEvent::EmergencyStatusUpdated(payload) => {
            assert_eq!(payload.status, RequestStatus::Completed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_queries_scoped_to_actor() {
    let harness = build_harness(Some("MG Road"), None);
    let user_a = add_user(&harness, "User A").await;
    let user_b = add_user(&harness, "User B").await;
    let captain = add_online_captain(&harness, "Ravi Kumar", "sess-c").await;

    let request_a = harness
        .coordinator
        .create_request(user_a.id, medical_input(10.0, 20.0))
        .await
        .unwrap();
    harness
        .coordinator
        .create_request(user_b.id, medical_input(11.0, 21.0))
        .await
        .unwrap();

    harness
        .coordinator
        .accept_request(captain.id, request_a.id)
        .await
        .unwrap();

    let user_a_requests = harness.coordinator.list_by_requester(user_a.id).await.unwrap();
    assert_eq!(user_a_requests.len(), 1);
    assert_eq!(user_a_requests[0].id, request_a.id);

    let captain_requests = harness.coordinator.list_by_captain(captain.id).await.unwrap();
    assert_eq!(captain_requests.len(), 1);
    assert_eq!(captain_requests[0].id, request_a.id);
}
