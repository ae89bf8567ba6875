pub mod coordinator;
pub mod notifier;

pub use coordinator::{AcceptedRequest, CreateRequestInput, DispatchCoordinator};
pub use notifier::Notifier;
