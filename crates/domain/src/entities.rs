use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 账户类型：普通用户或救援者（司机）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    User,
    Captain,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::User => "user",
            ActorKind::Captain => "captain",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    Active,
    Inactive,
}

impl ActorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorStatus::Active => "active",
            ActorStatus::Inactive => "inactive",
        }
    }
}

/// 车辆信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub color: String,
    pub plate: String,
    pub capacity: u32,
    pub vehicle_type: String,
}

/// 经纬度坐标
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// 地址解析失败时的兜底描述，保留6位小数
    pub fn placeholder_address(&self) -> String {
        format!("Location at {:.6}, {:.6}", self.lat, self.lng)
    }
}

/// 带可选地址的位置信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

impl GeoLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// 账户实体，用户与救援者共用一套字段
///
/// 实时连接句柄不在实体上：账户ID到连接的映射由会话注册表独占维护。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub kind: ActorKind,
    pub full_name: String,
    pub phone: Option<String>,
    pub status: ActorStatus,
    pub vehicle: Option<VehicleInfo>,
    /// 救援者最近上报的位置，用于接单后的距离估算
    pub location: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Actor {
    pub fn new_user(full_name: impl Into<String>, phone: Option<String>) -> Self {
        Self::new(ActorKind::User, full_name, phone)
    }

    pub fn new_captain(full_name: impl Into<String>, phone: Option<String>) -> Self {
        Self::new(ActorKind::Captain, full_name, phone)
    }

    fn new(kind: ActorKind, full_name: impl Into<String>, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            full_name: full_name.into(),
            phone,
            status: ActorStatus::Active,
            vehicle: None,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_vehicle(mut self, vehicle: VehicleInfo) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn is_active_captain(&self) -> bool {
        self.kind == ActorKind::Captain && self.status == ActorStatus::Active
    }

    /// 联系电话，与历史数据保持一致的占位串
    pub fn display_phone(&self) -> String {
        self.phone
            .clone()
            .unwrap_or_else(|| "Not provided".to_string())
    }
}

/// 救援请求类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyKind {
    Medical,
    Accident,
    Other,
}

impl Default for EmergencyKind {
    fn default() -> Self {
        EmergencyKind::Medical
    }
}

impl EmergencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyKind::Medical => "medical",
            EmergencyKind::Accident => "accident",
            EmergencyKind::Other => "other",
        }
    }
}

/// 救援请求状态
///
/// 状态只允许单向推进，封闭的流转表见 `can_transition_to`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// 允许的状态流转：
    /// pending -> accepted | cancelled
    /// accepted -> completed | cancelled
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Cancelled) | (Accepted, Completed) | (Accepted, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

/// 救援者响应元数据，与状态、指派人一同原子更新
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptainResponse {
    pub accepted: bool,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Default for CaptainResponse {
    fn default() -> Self {
        Self {
            accepted: false,
            responded_at: None,
        }
    }
}

/// 救援请求实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    /// 创建时刻的请求者姓名快照，后续资料修改不回溯历史记录
    pub requester_name: String,
    pub requester_phone: String,
    pub location: GeoLocation,
    pub kind: EmergencyKind,
    pub description: String,
    pub status: RequestStatus,
    pub assigned_captain_id: Option<Uuid>,
    pub response: CaptainResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmergencyRequest {
    /// 创建处于 pending 状态的新请求，请求者资料在此刻快照
    pub fn new(
        requester: &Actor,
        location: GeoLocation,
        kind: EmergencyKind,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            requester_id: requester.id,
            requester_name: requester.full_name.clone(),
            requester_phone: requester.display_phone(),
            location,
            kind,
            description: description.into(),
            status: RequestStatus::Pending,
            assigned_captain_id: None,
            response: CaptainResponse::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
