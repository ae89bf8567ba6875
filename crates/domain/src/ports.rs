//! 对外协作方端口
//!
//! 会话注册、实时推送通道与外部地图服务的抽象接口，具体实现位于 infrastructure。

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{ActorKind, Coordinates};
use crate::events::NotificationEvent;
use lifeline_core::DispatchResult;

/// 实时连接的不透明句柄
pub type SessionId = String;

/// 会话注册表：账户ID到实时连接的唯一映射
///
/// 注册幂等，重连覆盖旧句柄；断线即清理。`resolve` 不区分
/// “从未连接”与“已断开”，两者都返回 None。
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn register(&self, actor_id: Uuid, kind: ActorKind, session: SessionId);
    async fn resolve(&self, actor_id: Uuid) -> Option<SessionId>;
    async fn unregister(&self, actor_id: Uuid);
    /// 按连接句柄清理，断线回调使用
    async fn unregister_session(&self, session: &SessionId);
    async fn online_count(&self) -> usize;
}

/// 实时推送通道
#[async_trait]
pub trait LiveGateway: Send + Sync {
    async fn send(&self, session: &SessionId, event: &NotificationEvent) -> DispatchResult<()>;
}

/// 逆地理编码服务，网络失败一律返回 None
#[async_trait]
pub trait GeocodingService: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub distance_text: String,
    pub duration_text: String,
}

/// 距离/到达时间估算服务，失败一律返回 None
#[async_trait]
pub trait RouteService: Send + Sync {
    async fn distance_and_eta(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Option<RouteEstimate>;
}
