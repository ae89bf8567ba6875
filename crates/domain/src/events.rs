//! 推送事件
//!
//! 通过实时通道下发给用户/救援者的事件定义，事件名与载荷即线上协议。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Actor, EmergencyKind, EmergencyRequest, GeoLocation, RequestStatus, VehicleInfo};
use crate::ports::RouteEstimate;

pub const ETA_PLACEHOLDER: &str = "Calculating...";

/// 实时推送事件，序列化后即为线上帧格式 `{"event": ..., "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum NotificationEvent {
    EmergencyAlert(AlertPayload),
    EmergencyAccepted(AcceptedPayload),
    EmergencyStatusUpdated(StatusUpdatedPayload),
}

/// 广播给全部在线救援者的请求快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub request_id: Uuid,
    pub requester_name: String,
    pub requester_phone: String,
    pub location: GeoLocation,
    pub emergency_type: EmergencyKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// 接单成功后发给请求者的救援者信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedPayload {
    pub request_id: Uuid,
    pub captain_name: String,
    pub captain_phone: String,
    pub vehicle_details: Option<VehicleInfo>,
    pub eta: String,
    pub distance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatedPayload {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub updated_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn alert(request: &EmergencyRequest) -> Self {
        NotificationEvent::EmergencyAlert(AlertPayload {
            request_id: request.id,
            requester_name: request.requester_name.clone(),
            requester_phone: request.requester_phone.clone(),
            location: request.location.clone(),
            emergency_type: request.kind,
            description: request.description.clone(),
            created_at: request.created_at,
        })
    }

    pub fn accepted(
        request: &EmergencyRequest,
        captain: &Actor,
        route: Option<RouteEstimate>,
    ) -> Self {
        let (eta, distance) = match route {
            Some(estimate) => (estimate.duration_text, Some(estimate.distance_text)),
            None => (ETA_PLACEHOLDER.to_string(), None),
        };
        NotificationEvent::EmergencyAccepted(AcceptedPayload {
            request_id: request.id,
            captain_name: captain.full_name.clone(),
            captain_phone: captain.display_phone(),
            vehicle_details: captain.vehicle.clone(),
            eta,
            distance,
        })
    }

    pub fn status_updated(request: &EmergencyRequest) -> Self {
        NotificationEvent::EmergencyStatusUpdated(StatusUpdatedPayload {
            request_id: request.id,
            status: request.status,
            updated_at: request.updated_at,
        })
    }

    /// 线上事件名
    pub fn event_name(&self) -> &'static str {
        match self {
            NotificationEvent::EmergencyAlert(_) => "emergency-alert",
            NotificationEvent::EmergencyAccepted(_) => "emergency-accepted",
            NotificationEvent::EmergencyStatusUpdated(_) => "emergency-status-updated",
        }
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            NotificationEvent::EmergencyAlert(p) => p.request_id,
            NotificationEvent::EmergencyAccepted(p) => p.request_id,
            NotificationEvent::EmergencyStatusUpdated(p) => p.request_id,
        }
    }
}
