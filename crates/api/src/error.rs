use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use lifeline_core::DispatchError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("认证错误: {0}")]
    Authentication(#[from] crate::auth::AuthError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, String, &'static str, Vec<&'static str>) {
        match self {
            ApiError::Dispatch(DispatchError::RequestNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("救援请求 {id} 不存在"),
                "REQUEST_NOT_FOUND",
                vec!["请检查请求ID是否正确"],
            ),
            ApiError::Dispatch(DispatchError::ActorNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("账户 {id} 不存在"),
                "ACTOR_NOT_FOUND",
                vec!["请检查账户ID是否正确"],
            ),
            ApiError::Dispatch(DispatchError::AlreadyProcessed { id }) => (
                StatusCode::CONFLICT,
                format!("救援请求 {id} 已被其他救援者接单"),
                "ALREADY_PROCESSED",
                vec!["使用 GET /api/emergency/{id} 查看当前状态"],
            ),
            ApiError::Dispatch(DispatchError::InvalidTransition { from, to }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("不允许从 {from} 流转到 {to}"),
                "INVALID_TRANSITION",
                vec!["使用 GET /api/emergency/{id} 查看当前状态"],
            ),
            ApiError::Dispatch(DispatchError::InvalidLocation(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("位置参数无效: {msg}"),
                "INVALID_LOCATION",
                vec!["请提供 -90..90 的纬度与 -180..180 的经度"],
            ),
            ApiError::Dispatch(DispatchError::Unauthorized) | ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "未授权的访问".to_string(),
                "UNAUTHORIZED",
                vec!["请携带有效的 Bearer Token"],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                "BAD_REQUEST",
                vec![],
            ),
            // 其余内部错误一律收敛为通用提示，不暴露细节
            ApiError::Dispatch(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.user_message().to_string(),
                "INTERNAL_ERROR",
                vec!["请稍后重试"],
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_type, suggestions) = self.status_and_body();

        if status.is_server_error() {
            tracing::error!("API内部错误: {}", self);
        } else {
            tracing::debug!("API请求被拒绝: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "type": error_type,
                "message": message,
                "suggestions": suggestions,
            },
            "timestamp": chrono::Utc::now(),
        }));

        (status, body).into_response()
    }
}
