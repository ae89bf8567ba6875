pub mod sqlite_actor_repository;
pub mod sqlite_request_repository;

pub use sqlite_actor_repository::SqliteActorRepository;
pub use sqlite_request_repository::SqliteRequestRepository;

use lifeline_core::{DispatchError, DispatchResult};
use uuid::Uuid;

pub(crate) fn parse_uuid(column: &str, value: &str) -> DispatchResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DispatchError::database_error(format!("字段 {column} 不是合法的UUID: {e}")))
}
