pub mod entities;
pub mod events;
pub mod ports;
pub mod repositories;
pub mod sqlx_impls;

pub use entities::*;
pub use events::*;
pub use lifeline_core::{DispatchError, DispatchResult};
pub use ports::*;
pub use repositories::*;
