pub mod database;
pub mod gateway;
pub mod maps;
pub mod memory;
pub mod registry;

pub use database::sqlite::{SqliteActorRepository, SqliteRequestRepository};
pub use gateway::WsSessionHub;
pub use maps::GoogleMapsClient;
pub use memory::{InMemoryActorRepository, InMemoryRequestRepository};
pub use registry::InMemorySessionRegistry;
