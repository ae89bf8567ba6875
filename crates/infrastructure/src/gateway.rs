//! WebSocket 会话中枢
//!
//! 维护连接句柄到发送端的映射，把通知事件序列化成
//! `{"event": ..., "data": ...}` 帧后写入对应连接。
//! 发送端由 API 层的 WebSocket 任务挂载与摘除。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use lifeline_core::{DispatchError, DispatchResult};
use lifeline_domain::events::NotificationEvent;
use lifeline_domain::ports::{LiveGateway, SessionId};

#[derive(Debug, Default)]
pub struct WsSessionHub {
    senders: RwLock<HashMap<SessionId, mpsc::UnboundedSender<String>>>,
}

impl WsSessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载一条连接的发送端
    pub async fn attach(&self, session: SessionId, sender: mpsc::UnboundedSender<String>) {
        let mut senders = self.senders.write().await;
        senders.insert(session.clone(), sender);
        debug!("会话 {} 已挂载，当前连接数 {}", session, senders.len());
    }

    /// 摘除一条连接的发送端
    pub async fn detach(&self, session: &SessionId) {
        let mut senders = self.senders.write().await;
        if senders.remove(session).is_some() {
            debug!("会话 {} 已摘除，当前连接数 {}", session, senders.len());
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.senders.read().await.len()
    }
}

#[async_trait]
impl LiveGateway for WsSessionHub {
    async fn send(&self, session: &SessionId, event: &NotificationEvent) -> DispatchResult<()> {
        let frame = serde_json::to_string(event)?;

        let senders = self.senders.read().await;
        let Some(sender) = senders.get(session) else {
            return Err(DispatchError::delivery_error(format!(
                "会话 {session} 不存在或已关闭"
            )));
        };

        sender.send(frame).map_err(|_| {
            warn!("会话 {} 的发送通道已关闭", session);
            DispatchError::delivery_error(format!("会话 {session} 的发送通道已关闭"))
        })?;
        Ok(())
    }
}
