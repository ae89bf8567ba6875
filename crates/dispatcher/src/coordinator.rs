//! 调度协调器
//!
//! 串联救援请求从创建、广播、抢单到状态推进的完整协议。
//! 广播严格发生在持久化成功之后；指派通过存储层的条件更新完成，
//! 保证并发抢单时恰好一个救援者成功。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lifeline_core::{DispatchError, DispatchResult};
use lifeline_domain::entities::{
    Coordinates, EmergencyKind, EmergencyRequest, GeoLocation, RequestStatus,
};
use lifeline_domain::events::NotificationEvent;
use lifeline_domain::ports::{GeocodingService, RouteEstimate, RouteService, SessionRegistry};
use lifeline_domain::repositories::{ActorRepository, RequestRepository};

use crate::notifier::Notifier;

/// 创建救援请求的入参
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
    pub lat: f64,
    pub lng: f64,
    pub kind: EmergencyKind,
    pub description: String,
}

/// 抢单结果：请求本体加上尽力计算的距离/到达时间
#[derive(Debug, Clone)]
pub struct AcceptedRequest {
    pub request: EmergencyRequest,
    pub route: Option<RouteEstimate>,
}

pub struct DispatchCoordinator {
    actor_repo: Arc<dyn ActorRepository>,
    request_repo: Arc<dyn RequestRepository>,
    registry: Arc<dyn SessionRegistry>,
    notifier: Notifier,
    geocoder: Arc<dyn GeocodingService>,
    routes: Arc<dyn RouteService>,
}

impl DispatchCoordinator {
    pub fn new(
        actor_repo: Arc<dyn ActorRepository>,
        request_repo: Arc<dyn RequestRepository>,
        registry: Arc<dyn SessionRegistry>,
        notifier: Notifier,
        geocoder: Arc<dyn GeocodingService>,
        routes: Arc<dyn RouteService>,
    ) -> Self {
        Self {
            actor_repo,
            request_repo,
            registry,
            notifier,
            geocoder,
            routes,
        }
    }

    /// 创建救援请求并向全部在线救援者广播
    ///
    /// 地址解析失败时降级为坐标占位串，请求永远带有位置描述。
    /// 广播对每个接收方尽力而为，任何投递失败都不影响创建结果。
    pub async fn create_request(
        &self,
        requester_id: Uuid,
        input: CreateRequestInput,
    ) -> DispatchResult<EmergencyRequest> {
        let coords = Coordinates::new(input.lat, input.lng);
        if !coords.is_valid() {
            return Err(DispatchError::invalid_location(format!(
                "坐标超出范围: {}, {}",
                input.lat, input.lng
            )));
        }

        let requester = self
            .actor_repo
            .get_by_id(requester_id)
            .await?
            .ok_or(DispatchError::ActorNotFound { id: requester_id })?;

        // 外部地址解析发生在持久化之前，失败不阻断创建
        let address = match self.geocoder.reverse_geocode(coords.lat, coords.lng).await {
            Some(address) => address,
            None => {
                debug!("坐标 {}, {} 地址解析失败，使用占位地址", coords.lat, coords.lng);
                coords.placeholder_address()
            }
        };

        let request = EmergencyRequest::new(
            &requester,
            GeoLocation {
                lat: coords.lat,
                lng: coords.lng,
                address: Some(address),
            },
            input.kind,
            input.description,
        );

        // 先落库再广播，持久化失败时不会发出任何告警事件
        let created = self.request_repo.create(&request).await?;
        info!(
            "救援请求 {} 已创建: 请求者 {}, 类型 {:?}",
            created.id, created.requester_id, created.kind
        );

        self.broadcast_alert(&created).await;

        Ok(created)
    }

    /// 向全部符合条件的在线救援者广播告警
    async fn broadcast_alert(&self, request: &EmergencyRequest) {
        let captains = match self.actor_repo.find_active_captains().await {
            Ok(captains) => captains,
            Err(e) => {
                // 请求已经存在，候选集查询失败只能放弃本轮广播
                warn!("查询在线救援者失败，跳过请求 {} 的广播: {}", request.id, e);
                return;
            }
        };

        let mut eligible = Vec::new();
        for captain in &captains {
            if self.registry.resolve(captain.id).await.is_some() {
                eligible.push(captain.id);
            }
        }

        let event = NotificationEvent::alert(request);
        let delivered = self.notifier.broadcast(&eligible, &event).await;
        info!(
            "请求 {} 的告警已广播: 候选 {} 人，在线 {} 人，送达 {} 人",
            request.id,
            captains.len(),
            eligible.len(),
            delivered
        );
    }

    /// 救援者抢单，先到先得
    ///
    /// 指派通过仓储的条件更新完成：并发抢单时恰好一个调用成功，
    /// 其余得到 `AlreadyProcessed`。距离估算与请求者通知都在
    /// 指派提交之后执行，失败不回滚指派。
    pub async fn accept_request(
        &self,
        captain_id: Uuid,
        request_id: Uuid,
    ) -> DispatchResult<AcceptedRequest> {
        let captain = self
            .actor_repo
            .get_by_id(captain_id)
            .await?
            .ok_or(DispatchError::ActorNotFound { id: captain_id })?;

        let request = self
            .request_repo
            .get_by_id(request_id)
            .await?
            .ok_or(DispatchError::RequestNotFound { id: request_id })?;

        if !request.is_pending() {
            return Err(DispatchError::AlreadyProcessed { id: request_id });
        }

        let assigned = self
            .request_repo
            .try_assign(request_id, captain.id, Utc::now())
            .await?
            .ok_or(DispatchError::AlreadyProcessed { id: request_id })?;

        info!("救援请求 {} 已由 {} 接单", assigned.id, captain.id);

        // 接单已提交，距离估算失败只影响事件里的展示字段
        let route = match &captain.location {
            Some(origin) => {
                self.routes
                    .distance_and_eta(origin, &assigned.location.coordinates())
                    .await
            }
            None => {
                debug!("救援者 {} 无位置上报，跳过距离估算", captain.id);
                None
            }
        };

        let event = NotificationEvent::accepted(&assigned, &captain, route.clone());
        self.notifier.notify_actor(assigned.requester_id, &event).await;

        Ok(AcceptedRequest {
            request: assigned,
            route,
        })
    }

    /// 推进救援请求状态
    ///
    /// 状态流转受封闭流转表约束；accepted 只能经由抢单路径进入。
    /// 更新成功后通知在线的请求者，离线则静默丢弃。
    pub async fn update_status(
        &self,
        request_id: Uuid,
        new_status: RequestStatus,
    ) -> DispatchResult<EmergencyRequest> {
        let request = self
            .request_repo
            .get_by_id(request_id)
            .await?
            .ok_or(DispatchError::RequestNotFound { id: request_id })?;

        // 指派必须走 accept_request，否则会绕过先到先得的条件写入
        if new_status == RequestStatus::Accepted
            || !request.status.can_transition_to(new_status)
        {
            return Err(DispatchError::invalid_transition(
                request.status.as_str(),
                new_status.as_str(),
            ));
        }

        let updated = self
            .request_repo
            .update_status_from(request_id, request.status, new_status, Utc::now())
            .await?
            .ok_or_else(|| {
                // 并发修改抢先落库，观察到的流转已不成立
                DispatchError::invalid_transition(request.status.as_str(), new_status.as_str())
            })?;

        info!(
            "救援请求 {} 状态更新: {} -> {}",
            updated.id,
            request.status.as_str(),
            updated.status.as_str()
        );

        let event = NotificationEvent::status_updated(&updated);
        self.notifier.notify_actor(updated.requester_id, &event).await;

        Ok(updated)
    }

    pub async fn get_request(&self, request_id: Uuid) -> DispatchResult<EmergencyRequest> {
        self.request_repo
            .get_by_id(request_id)
            .await?
            .ok_or(DispatchError::RequestNotFound { id: request_id })
    }

    pub async fn list_by_requester(
        &self,
        requester_id: Uuid,
    ) -> DispatchResult<Vec<EmergencyRequest>> {
        self.request_repo.find_by_requester(requester_id).await
    }

    pub async fn list_by_captain(&self, captain_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        self.request_repo.find_by_captain(captain_id).await
    }
}
