pub mod auth;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;
pub mod ws;

pub use auth::JwtService;
pub use routes::{create_routes, AppState};
pub use server::serve;
