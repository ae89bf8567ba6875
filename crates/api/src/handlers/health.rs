use axum::extract::State;
use serde_json::json;

use lifeline_domain::ports::SessionRegistry;

use crate::response::success;
use crate::routes::AppState;

/// 健康检查
pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let online = state.registry.online_count().await;
    success(json!({
        "status": "ok",
        "online_actors": online,
    }))
}
