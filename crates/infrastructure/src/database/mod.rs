//! 数据库连接与结构初始化

pub mod sqlite;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use lifeline_core::config::DatabaseConfig;
use lifeline_core::DispatchResult;

/// 建立 SQLite 连接池
pub async fn connect(config: &DatabaseConfig) -> DispatchResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .connect(&config.url)
        .await?;
    info!("数据库连接池已建立: {}", config.url);
    Ok(pool)
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS actors (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        full_name TEXT NOT NULL,
        phone TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        vehicle TEXT,
        lat REAL,
        lng REAL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS requests (
        id TEXT PRIMARY KEY,
        requester_id TEXT NOT NULL,
        requester_name TEXT NOT NULL,
        requester_phone TEXT NOT NULL,
        lat REAL NOT NULL,
        lng REAL NOT NULL,
        address TEXT,
        kind TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        assigned_captain_id TEXT,
        response_accepted INTEGER NOT NULL DEFAULT 0,
        responded_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_requests_requester ON requests(requester_id)",
    "CREATE INDEX IF NOT EXISTS idx_requests_captain ON requests(assigned_captain_id)",
    "CREATE INDEX IF NOT EXISTS idx_actors_kind_status ON actors(kind, status)",
];

/// 初始化表结构，幂等
pub async fn run_migrations(pool: &SqlitePool) -> DispatchResult<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("数据库结构初始化完成");
    Ok(())
}
