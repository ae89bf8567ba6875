use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use lifeline_core::DispatchResult;
use lifeline_domain::entities::{
    CaptainResponse, EmergencyKind, EmergencyRequest, GeoLocation, RequestStatus,
};
use lifeline_domain::repositories::RequestRepository;

use super::parse_uuid;

const REQUEST_COLUMNS: &str = "id, requester_id, requester_name, requester_phone, lat, lng, address, kind, description, status, assigned_captain_id, response_accepted, responded_at, created_at, updated_at";

pub struct SqliteRequestRepository {
    pool: SqlitePool,
}

impl SqliteRequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> DispatchResult<EmergencyRequest> {
        let id: String = row.try_get("id")?;
        let requester_id: String = row.try_get("requester_id")?;
        let assigned_captain_id: Option<String> = row.try_get("assigned_captain_id")?;

        Ok(EmergencyRequest {
            id: parse_uuid("id", &id)?,
            requester_id: parse_uuid("requester_id", &requester_id)?,
            requester_name: row.try_get("requester_name")?,
            requester_phone: row.try_get("requester_phone")?,
            location: GeoLocation {
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
                address: row.try_get("address")?,
            },
            kind: row.try_get::<EmergencyKind, _>("kind")?,
            description: row.try_get("description")?,
            status: row.try_get::<RequestStatus, _>("status")?,
            assigned_captain_id: assigned_captain_id
                .map(|s| parse_uuid("assigned_captain_id", &s))
                .transpose()?,
            response: CaptainResponse {
                accepted: row.try_get("response_accepted")?,
                responded_at: row.try_get("responded_at")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_by_id(&self, id: Uuid) -> DispatchResult<Option<EmergencyRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_request).transpose()
    }
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn create(&self, request: &EmergencyRequest) -> DispatchResult<EmergencyRequest> {
        sqlx::query(
            r#"
            INSERT INTO requests (id, requester_id, requester_name, requester_phone, lat, lng, address, kind, description, status, assigned_captain_id, response_accepted, responded_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.requester_id.to_string())
        .bind(&request.requester_name)
        .bind(&request.requester_phone)
        .bind(request.location.lat)
        .bind(request.location.lng)
        .bind(&request.location.address)
        .bind(request.kind)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.assigned_captain_id.map(|id| id.to_string()))
        .bind(request.response.accepted)
        .bind(request.response.responded_at)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("救援请求 {} 已写入数据库", request.id);
        Ok(request.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<EmergencyRequest>> {
        self.fetch_by_id(id).await
    }

    async fn try_assign(
        &self,
        id: Uuid,
        captain_id: Uuid,
        responded_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        // 条件更新即 compare-and-swap：只有仍处于 pending 的行会被改写
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = 'accepted', assigned_captain_id = ?1, response_accepted = 1, responded_at = ?2, updated_at = ?2
            WHERE id = ?3 AND status = 'pending'
            "#,
        )
        .bind(captain_id.to_string())
        .bind(responded_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("救援请求 {} 指派竞争失败", id);
            return Ok(None);
        }
        self.fetch_by_id(id).await
    }

    async fn update_status_from(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> DispatchResult<Option<EmergencyRequest>> {
        let result = sqlx::query(
            "UPDATE requests SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(to)
        .bind(updated_at)
        .bind(id.to_string())
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_by_id(id).await
    }

    async fn find_by_requester(&self, requester_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE requester_id = ?1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(requester_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_request).collect()
    }

    async fn find_by_captain(&self, captain_id: Uuid) -> DispatchResult<Vec<EmergencyRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE assigned_captain_id = ?1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(captain_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_request).collect()
    }
}
