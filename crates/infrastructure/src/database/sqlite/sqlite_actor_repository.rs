use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use lifeline_core::DispatchResult;
use lifeline_domain::entities::{Actor, ActorKind, ActorStatus, Coordinates, VehicleInfo};
use lifeline_domain::repositories::ActorRepository;

use super::parse_uuid;

const ACTOR_COLUMNS: &str =
    "id, kind, full_name, phone, status, vehicle, lat, lng, created_at, updated_at";

pub struct SqliteActorRepository {
    pool: SqlitePool,
}

impl SqliteActorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_actor(row: &sqlx::sqlite::SqliteRow) -> DispatchResult<Actor> {
        let id: String = row.try_get("id")?;
        let vehicle: Option<String> = row.try_get("vehicle")?;
        let lat: Option<f64> = row.try_get("lat")?;
        let lng: Option<f64> = row.try_get("lng")?;

        Ok(Actor {
            id: parse_uuid("id", &id)?,
            kind: row.try_get::<ActorKind, _>("kind")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            status: row.try_get::<ActorStatus, _>("status")?,
            vehicle: vehicle
                .map(|json| serde_json::from_str::<VehicleInfo>(&json))
                .transpose()?,
            location: match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
                _ => None,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ActorRepository for SqliteActorRepository {
    async fn create(&self, actor: &Actor) -> DispatchResult<Actor> {
        let vehicle = actor
            .vehicle
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO actors (id, kind, full_name, phone, status, vehicle, lat, lng, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(actor.id.to_string())
        .bind(actor.kind)
        .bind(&actor.full_name)
        .bind(&actor.phone)
        .bind(actor.status)
        .bind(vehicle)
        .bind(actor.location.map(|c| c.lat))
        .bind(actor.location.map(|c| c.lng))
        .bind(actor.created_at)
        .bind(actor.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("账户 {} ({:?}) 已写入数据库", actor.id, actor.kind);
        Ok(actor.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<Actor>> {
        let sql = format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_actor).transpose()
    }

    async fn update(&self, actor: &Actor) -> DispatchResult<Actor> {
        let vehicle = actor
            .vehicle
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE actors
            SET kind = ?1, full_name = ?2, phone = ?3, status = ?4, vehicle = ?5, lat = ?6, lng = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(actor.kind)
        .bind(&actor.full_name)
        .bind(&actor.phone)
        .bind(actor.status)
        .bind(vehicle)
        .bind(actor.location.map(|c| c.lat))
        .bind(actor.location.map(|c| c.lng))
        .bind(now)
        .bind(actor.id.to_string())
        .execute(&self.pool)
        .await?;

        let mut updated = actor.clone();
        updated.updated_at = now;
        Ok(updated)
    }

    async fn find_active_captains(&self) -> DispatchResult<Vec<Actor>> {
        let sql = format!(
            "SELECT {ACTOR_COLUMNS} FROM actors WHERE kind = 'captain' AND status = 'active'"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_actor).collect()
    }
}
