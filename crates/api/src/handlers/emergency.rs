use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lifeline_dispatcher::CreateRequestInput;
use lifeline_domain::entities::{EmergencyKind, EmergencyRequest, RequestStatus};
use lifeline_domain::events::ETA_PLACEHOLDER;

use crate::auth::{AuthActor, AuthCaptain, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, success};
use crate::routes::AppState;

/// 创建救援请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyRequest {
    pub location: LocationInput,
    #[serde(default)]
    pub emergency_type: EmergencyKind,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lng: f64,
}

/// 救援者抢单
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptEmergencyRequest {
    pub request_id: Uuid,
}

/// 状态更新
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

/// 抢单响应：请求本体加上尽力估算的距离/到达时间
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub request: EmergencyRequest,
    pub eta: String,
    pub distance: Option<String>,
}

pub async fn create_emergency(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateEmergencyRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if request.description.trim().is_empty() {
        return Err(ApiError::BadRequest("救援描述不能为空".to_string()));
    }

    let emergency = state
        .coordinator
        .create_request(
            user.id,
            CreateRequestInput {
                lat: request.location.lat,
                lng: request.location.lng,
                kind: request.emergency_type,
                description: request.description,
            },
        )
        .await?;

    Ok(created(emergency))
}

pub async fn accept_emergency(
    State(state): State<AppState>,
    AuthCaptain(captain): AuthCaptain,
    Json(request): Json<AcceptEmergencyRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let accepted = state
        .coordinator
        .accept_request(captain.id, request.request_id)
        .await?;

    let (eta, distance) = match accepted.route {
        Some(route) => (route.duration_text, Some(route.distance_text)),
        None => (ETA_PLACEHOLDER.to_string(), None),
    };

    Ok(success(AcceptedResponse {
        request: accepted.request,
        eta,
        distance,
    }))
}

pub async fn update_emergency_status(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let updated = state.coordinator.update_status(id, request.status).await?;
    Ok(success(updated))
}

pub async fn get_emergency(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    Path(id): Path<Uuid>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let emergency = state.coordinator.get_request(id).await?;
    Ok(success(emergency))
}

pub async fn list_user_emergencies(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let emergencies = state.coordinator.list_by_requester(user_id).await?;
    Ok(success(emergencies))
}

pub async fn list_captain_emergencies(
    State(state): State<AppState>,
    AuthCaptain(_captain): AuthCaptain,
    Path(captain_id): Path<Uuid>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let emergencies = state.coordinator.list_by_captain(captain_id).await?;
    Ok(success(emergencies))
}
