//! 通知扇出
//!
//! 按账户ID解析在线会话并推送事件。投递是尽力而为的：
//! 目标不在线直接跳过，单个接收方失败不影响其余接收方，
//! 任何情况下都不向调用方抛错。

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use lifeline_domain::events::NotificationEvent;
use lifeline_domain::ports::{LiveGateway, SessionRegistry};

#[derive(Clone)]
pub struct Notifier {
    registry: Arc<dyn SessionRegistry>,
    gateway: Arc<dyn LiveGateway>,
}

impl Notifier {
    pub fn new(registry: Arc<dyn SessionRegistry>, gateway: Arc<dyn LiveGateway>) -> Self {
        Self { registry, gateway }
    }

    /// 向单个账户推送事件，返回是否成功投递
    pub async fn notify_actor(&self, actor_id: Uuid, event: &NotificationEvent) -> bool {
        let Some(session) = self.registry.resolve(actor_id).await else {
            debug!("账户 {} 不在线，跳过 {} 推送", actor_id, event.event_name());
            return false;
        };

        match self.gateway.send(&session, event).await {
            Ok(()) => {
                debug!("已向账户 {} 推送 {} 事件", actor_id, event.event_name());
                true
            }
            Err(e) => {
                warn!(
                    "向账户 {} 推送 {} 事件失败: {}",
                    actor_id,
                    event.event_name(),
                    e
                );
                false
            }
        }
    }

    /// 向一组账户广播事件，返回成功投递的数量
    pub async fn broadcast(&self, actor_ids: &[Uuid], event: &NotificationEvent) -> usize {
        let mut delivered = 0;
        for actor_id in actor_ids {
            if self.notify_actor(*actor_id, event).await {
                delivered += 1;
            }
        }
        delivered
    }
}
