//! 会话注册表实现
//!
//! 进程内并发安全的账户ID到连接句柄映射。注册幂等、重连覆盖、
//! 断线按句柄清理，生命周期随应用启动创建、随应用退出销毁。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use lifeline_domain::entities::ActorKind;
use lifeline_domain::ports::{SessionId, SessionRegistry};

#[derive(Debug, Default)]
struct RegistryState {
    by_actor: HashMap<Uuid, SessionId>,
    by_session: HashMap<SessionId, Uuid>,
}

/// 基于 RwLock<HashMap> 的注册表实现
#[derive(Debug, Default)]
pub struct InMemorySessionRegistry {
    state: RwLock<RegistryState>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(&self, actor_id: Uuid, kind: ActorKind, session: SessionId) {
        let mut state = self.state.write().await;
        // 重连覆盖旧句柄，反向索引同步替换
        if let Some(stale) = state.by_actor.remove(&actor_id) {
            state.by_session.remove(&stale);
        }
        state.by_session.insert(session.clone(), actor_id);
        state.by_actor.insert(actor_id, session.clone());
        debug!("账户 {} ({:?}) 绑定会话 {}", actor_id, kind, session);
    }

    async fn resolve(&self, actor_id: Uuid) -> Option<SessionId> {
        let state = self.state.read().await;
        state.by_actor.get(&actor_id).cloned()
    }

    async fn unregister(&self, actor_id: Uuid) {
        let mut state = self.state.write().await;
        if let Some(session) = state.by_actor.remove(&actor_id) {
            state.by_session.remove(&session);
            debug!("账户 {} 的会话 {} 已注销", actor_id, session);
        }
    }

    async fn unregister_session(&self, session: &SessionId) {
        let mut state = self.state.write().await;
        if let Some(actor_id) = state.by_session.remove(session) {
            // 仅当该句柄仍是账户的当前句柄时才清除正向映射，
            // 避免断线回调晚于重连时误删新句柄
            let is_current = state
                .by_actor
                .get(&actor_id)
                .map(|current| current == session)
                .unwrap_or(false);
            if is_current {
                state.by_actor.remove(&actor_id);
            }
            debug!("会话 {} 已清理", session);
        }
    }

    async fn online_count(&self) -> usize {
        self.state.read().await.by_actor.len()
    }
}
