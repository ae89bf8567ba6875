//! In-memory repository implementations
//!
//! Used by the embedded zero-config mode and by tests that need
//! repositories without a database. The conditional writes perform the
//! same check-and-set as the SQLite repositories, inside a single lock
//! guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use lifeline_core::DispatchResult;
use lifeline_domain::entities::{Actor, CaptainResponse, EmergencyRequest, RequestStatus};
use lifeline_domain::repositories::{ActorRepository, RequestRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryActorRepository {
    actors: Arc<Mutex<HashMap<Uuid, Actor>>>,
}

impl InMemoryActorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actors(actors: Vec<Actor>) -> Self {
        let map = actors.into_iter().map(|a| (a.id, a)).collect();
        Self {
            actors: Arc::new(Mutex::new(map)),
        }
    }

    pub fn count(&self) -> usize {
        self.actors.lock().unwrap().len()
    }
}

#[async_trait]
impl ActorRepository for InMemoryActorRepository {
    async fn create(&self, actor: &Actor) -> DispatchResult<Actor> {
        let mut actors = self.actors.lock().unwrap();
        actors.insert(actor.id, actor.clone());
        Ok(actor.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<Actor>> {
        Ok(self.actors.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, actor: &Actor) -> DispatchResult<Actor> {
        let mut actors = self.actors.lock().unwrap();
        let mut updated = actor.clone();
        updated.updated_at = Utc::now();
        actors.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn find_active_captains(&self) -> DispatchResult<Vec<Actor>> {
        let actors = self.actors.lock().unwrap();
        Ok(actors
            .values()
            .filter(|a| a.is_active_captain())
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestRepository {
    requests: Arc<Mutex<HashMap<Uuid, EmergencyRequest>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn create(&self, request: &EmergencyRequest) -> DispatchResult<EmergencyRequest> {
        let mut requests = self.requests.lock().unwrap();
        requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<EmergencyRequest>> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    async fn try_assign(
        &self,
        id: Uuid,
        captain_id: Uuid,
        responded_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        let mut requests = self.requests.lock().unwrap();
        // 检查与写入在同一把锁内完成
        match requests.get_mut(&id) {
            Some(request) if request.status == RequestStatus::Pending => {
                request.status = RequestStatus::Accepted;
                request.assigned_captain_id = Some(captain_id);
                request.response = CaptainResponse {
                    accepted: true,
                    responded_at: Some(responded_at),
                };
                request.updated_at = responded_at;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status_from(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        let mut requests = self.requests.lock().unwrap();
        match requests.get_mut(&id) {
            Some(request) if request.status == from => {
                request.status = to;
                request.updated_at = updated_at;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_by_requester(&self, requester_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        let requests = self.requests.lock().unwrap();
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_captain(&self, captain_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        let requests = self.requests.lock().unwrap();
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| r.assigned_captain_id == Some(captain_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
