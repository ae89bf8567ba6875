use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::broadcast;
use tracing::info;

/// 启动 HTTP/WebSocket 服务，收到关闭信号后优雅退出
pub async fn serve(
    router: Router,
    bind_address: &str,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("监听地址绑定失败: {bind_address}"))?;
    info!("API服务监听于 {}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("API服务收到关闭信号");
        })
        .await
        .context("API服务运行失败")?;

    Ok(())
}
