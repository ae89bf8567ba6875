//! WebSocket 接入
//!
//! 连接建立后由 `join` 帧声明账户身份并登记会话；断开时按会话句柄
//! 清理注册表，不会留下可能投递到死连接的陈旧句柄。

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lifeline_domain::entities::{ActorKind, Coordinates};
use lifeline_domain::ports::{SessionId, SessionRegistry};
use lifeline_domain::repositories::ActorRepository;

use crate::routes::AppState;

/// 客户端上行帧
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
enum InboundFrame {
    Join(JoinPayload),
    UpdateLocationCaptain(LocationUpdatePayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    user_id: Uuid,
    user_type: ActorKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationUpdatePayload {
    user_id: Uuid,
    location: Coordinates,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id: SessionId = Uuid::new_v4().to_string();
    info!("WebSocket 连接建立: {}", session_id);

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    state.hub.attach(session_id.clone(), outbound_tx).await;

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, &session_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("会话 {} 读取失败: {}", session_id, e);
                        break;
                    }
                }
            }
        }
    }

    // 断线清理：摘除发送端并清除注册表里的句柄
    state.hub.detach(&session_id).await;
    state.registry.unregister_session(&session_id).await;
    info!("WebSocket 连接断开: {}", session_id);
}

async fn handle_frame(state: &AppState, session_id: &SessionId, text: &str) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("会话 {} 发来无法解析的帧: {}", session_id, e);
            return;
        }
    };

    match frame {
        InboundFrame::Join(payload) => {
            state
                .registry
                .register(payload.user_id, payload.user_type, session_id.clone())
                .await;
        }
        InboundFrame::UpdateLocationCaptain(payload) => {
            match state.actor_repo.get_by_id(payload.user_id).await {
                Ok(Some(mut actor)) => {
                    actor.location = Some(payload.location);
                    if let Err(e) = state.actor_repo.update(&actor).await {
                        warn!("更新救援者 {} 位置失败: {}", payload.user_id, e);
                    }
                }
                Ok(None) => {
                    warn!("收到未知账户 {} 的位置上报", payload.user_id);
                }
                Err(e) => {
                    warn!("查询账户 {} 失败: {}", payload.user_id, e);
                }
            }
        }
    }
}
