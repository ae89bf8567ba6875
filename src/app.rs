use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;

use lifeline_api::{create_routes, AppState, JwtService};
use lifeline_core::AppConfig;
use lifeline_dispatcher::{DispatchCoordinator, Notifier};
use lifeline_domain::ports::{GeocodingService, RouteService, SessionRegistry};
use lifeline_domain::repositories::{ActorRepository, RequestRepository};
use lifeline_infrastructure::database;
use lifeline_infrastructure::{
    GoogleMapsClient, InMemorySessionRegistry, SqliteActorRepository, SqliteRequestRepository,
    WsSessionHub,
};

/// 应用实例，负责装配各组件并驱动服务运行
pub struct Application {
    config: AppConfig,
    state: AppState,
}

impl Application {
    /// 按配置装配全部组件
    ///
    /// 会话注册表与连接中枢在此处创建并注入，生命周期与应用一致。
    pub async fn new(config: AppConfig) -> Result<Self> {
        let pool = database::connect(&config.database)
            .await
            .context("数据库连接失败")?;
        database::run_migrations(&pool)
            .await
            .context("数据库结构初始化失败")?;

        let actor_repo: Arc<dyn ActorRepository> =
            Arc::new(SqliteActorRepository::new(pool.clone()));
        let request_repo: Arc<dyn RequestRepository> =
            Arc::new(SqliteRequestRepository::new(pool));

        let registry: Arc<dyn SessionRegistry> = Arc::new(InMemorySessionRegistry::new());
        let hub = Arc::new(WsSessionHub::new());

        let maps = Arc::new(GoogleMapsClient::new(&config.maps));
        let geocoder: Arc<dyn GeocodingService> = maps.clone();
        let routes: Arc<dyn RouteService> = maps;

        let notifier = Notifier::new(registry.clone(), hub.clone());
        let coordinator = Arc::new(DispatchCoordinator::new(
            actor_repo.clone(),
            request_repo,
            registry.clone(),
            notifier,
            geocoder,
            routes,
        ));

        let auth = Arc::new(JwtService::new(&config.auth));

        let state = AppState {
            coordinator,
            actor_repo,
            registry,
            hub,
            auth,
        };

        info!("应用组件装配完成");
        Ok(Self { config, state })
    }

    /// 运行服务直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let router = create_routes(self.state.clone(), self.config.api.cors_enabled);
        lifeline_api::serve(router, &self.config.api.bind_address, shutdown_rx).await
    }
}
