//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{Actor, EmergencyRequest, RequestStatus};
use lifeline_core::DispatchResult;

/// 账户仓储抽象
#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn create(&self, actor: &Actor) -> DispatchResult<Actor>;
    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<Actor>>;
    async fn update(&self, actor: &Actor) -> DispatchResult<Actor>;
    /// 救援请求广播的候选集：kind = captain 且 status = active
    async fn find_active_captains(&self) -> DispatchResult<Vec<Actor>>;
}

/// 救援请求仓储抽象
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(&self, request: &EmergencyRequest) -> DispatchResult<EmergencyRequest>;
    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<EmergencyRequest>>;
    /// 条件指派：仅当请求仍为 pending 时一次性写入
    /// status/assigned_captain_id/response，返回 None 表示竞争失败。
    ///
    /// 这是"先到先得"保证的唯一写入路径，实现必须是原子的
    /// compare-and-swap，不允许读取后再写回。
    async fn try_assign(
        &self,
        id: Uuid,
        captain_id: Uuid,
        responded_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>>;
    /// 条件状态更新：仅当当前状态仍为 `from` 时更新为 `to`，
    /// 返回 None 表示状态已被并发修改。
    async fn update_status_from(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>>;
    async fn find_by_requester(&self, requester_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>>;
    async fn find_by_captain(&self, captain_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>>;
}
