use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("救援请求未找到: {id}")]
    RequestNotFound { id: Uuid },
    #[error("账户未找到: {id}")]
    ActorNotFound { id: Uuid },
    #[error("救援请求已被处理: {id}")]
    AlreadyProcessed { id: Uuid },
    #[error("非法的状态流转: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("无效的位置参数: {0}")]
    InvalidLocation(String),
    #[error("未授权的访问")]
    Unauthorized,
    #[error("消息投递失败: {0}")]
    Delivery(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn request_not_found(id: Uuid) -> Self {
        Self::RequestNotFound { id }
    }
    pub fn actor_not_found(id: Uuid) -> Self {
        Self::ActorNotFound { id }
    }
    pub fn already_processed(id: Uuid) -> Self {
        Self::AlreadyProcessed { id }
    }
    pub fn invalid_transition<S: Into<String>>(from: S, to: S) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
    pub fn invalid_location<S: Into<String>>(msg: S) -> Self {
        Self::InvalidLocation(msg.into())
    }
    pub fn delivery_error<S: Into<String>>(msg: S) -> Self {
        Self::Delivery(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 判断错误是否可以重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::Database(_)
                | DispatchError::DatabaseOperation(_)
                | DispatchError::Delivery(_)
        )
    }

    /// 面向调用方的提示信息，不暴露内部细节
    pub fn user_message(&self) -> &str {
        match self {
            DispatchError::RequestNotFound { .. } => "请求的救援记录不存在",
            DispatchError::ActorNotFound { .. } => "请求的账户不存在",
            DispatchError::AlreadyProcessed { .. } => "该救援请求已被其他救援者接单",
            DispatchError::InvalidTransition { .. } => "当前状态不允许该操作",
            DispatchError::InvalidLocation(_) => "位置参数不完整或超出范围",
            DispatchError::Unauthorized => "您没有执行此操作的权限",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Internal(err.to_string())
    }
}
