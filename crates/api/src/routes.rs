use axum::{
    routing::{any, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lifeline_dispatcher::DispatchCoordinator;
use lifeline_domain::ports::SessionRegistry;
use lifeline_domain::repositories::ActorRepository;
use lifeline_infrastructure::WsSessionHub;

use crate::auth::JwtService;
use crate::handlers::{
    emergency::{
        accept_emergency, create_emergency, get_emergency, list_captain_emergencies,
        list_user_emergencies, update_emergency_status,
    },
    health::health_check,
};
use crate::ws::ws_handler;

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DispatchCoordinator>,
    pub actor_repo: Arc<dyn ActorRepository>,
    pub registry: Arc<dyn SessionRegistry>,
    pub hub: Arc<WsSessionHub>,
    pub auth: Arc<JwtService>,
}

/// 创建API路由
pub fn create_routes(state: AppState, cors_enabled: bool) -> Router {
    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 救援请求API
        .route("/api/emergency/create", post(create_emergency))
        .route("/api/emergency/accept", post(accept_emergency))
        .route("/api/emergency/{id}/status", put(update_emergency_status))
        .route("/api/emergency/{id}", get(get_emergency))
        .route("/api/emergency/user/{id}", get(list_user_emergencies))
        .route("/api/emergency/captain/{id}", get(list_captain_emergencies))
        // 实时通道
        .route("/ws", any(ws_handler))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
