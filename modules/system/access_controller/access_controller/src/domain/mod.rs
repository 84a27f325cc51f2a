//! Domain layer for the access controller.

pub mod context_manager;
pub mod context_pip;
pub mod controller;
pub mod error;
pub mod local_client;
pub mod login;
pub mod pip;
pub mod store;
pub mod subject_store;

pub use controller::Controller;
pub use error::DomainError;
pub use local_client::AccessControllerLocalClient;
