//! JWT 认证
//!
//! 注册与登录由外部系统负责，这里只做令牌校验：
//! 从 Bearer Token 还原账户身份，并按操作要求的账户类型放行。

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lifeline_core::config::AuthConfig;
use lifeline_domain::entities::{Actor, ActorKind};
use lifeline_domain::repositories::ActorRepository;

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 账户ID
    pub sub: String,
    pub kind: ActorKind,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("缺少凭证")]
    MissingCredentials,
    #[error("令牌无效: {0}")]
    InvalidToken(String),
    #[error("账户类型不匹配")]
    WrongKind,
}

pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: i64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiration_hours: config.jwt_expiration_hours,
        }
    }

    /// 签发令牌，供测试与运维工具使用
    pub fn issue(&self, actor_id: Uuid, kind: ActorKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: actor_id.to_string(),
            kind,
            exp: (now + Duration::hours(self.expiration_hours)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;
    header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredentials)
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Actor, ApiError> {
    let token = bearer_token(parts)?;
    let claims = state.auth.verify(token)?;
    let actor_id = Uuid::parse_str(&claims.sub)
        .map_err(|e| AuthError::InvalidToken(format!("账户ID不合法: {e}")))?;

    let actor = state
        .actor_repo
        .get_by_id(actor_id)
        .await?
        .ok_or(lifeline_core::DispatchError::Unauthorized)?;

    if actor.kind != claims.kind {
        return Err(AuthError::WrongKind.into());
    }
    Ok(actor)
}

/// 要求用户身份的提取器
pub struct AuthUser(pub Actor);

/// 要求救援者身份的提取器
pub struct AuthCaptain(pub Actor);

/// 任意已认证账户的提取器
pub struct AuthActor(pub Actor);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = authenticate(parts, state).await?;
        if actor.kind != ActorKind::User {
            return Err(AuthError::WrongKind.into());
        }
        Ok(AuthUser(actor))
    }
}

impl FromRequestParts<AppState> for AuthCaptain {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = authenticate(parts, state).await?;
        if actor.kind != ActorKind::Captain {
            return Err(AuthError::WrongKind.into());
        }
        Ok(AuthCaptain(actor))
    }
}

impl FromRequestParts<AppState> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = authenticate(parts, state).await?;
        Ok(AuthActor(actor))
    }
}
