//! Access Controller SDK
//!
//! This crate provides the public API for the `access_controller` module:
//!
//! - [`AccessControllerClient`] - Public API trait for PEPs
//! - [`PdpClient`] - Pluggable Policy Decision Point contract
//! - [`Repository`], [`AuthNAgent`], [`CaepTransport`], [`UmaClient`] - Collaborator ports
//! - [`Subject`], [`RequestedContextSpec`], [`ContextValue`] - Domain models
//! - [`AccessError`] - Closed error taxonomy surfaced to the PEP
//! - [`pep`] - PEP helper mapping outcomes to transport behavior
//!
//! ## Usage
//!
//! ```ignore
//! use access_controller_sdk::{AccessControllerClient, pep::{PepOutcome, PolicyEnforcer}};
//!
//! let enforcer = PolicyEnforcer::new(controller_client);
//!
//! match enforcer.enforce(&session, &resource, &action).await {
//!     PepOutcome::Allow => serve(),
//!     PepOutcome::Redirect { agent } => start_login(agent),
//!     PepOutcome::CheckBackLater | PepOutcome::RetryShortly => accepted(),
//!     PepOutcome::Deny { .. } | PepOutcome::Fail => forbidden(),
//! }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod caep;
pub mod error;
pub mod models;
pub mod pdp_api;
pub mod pep;
pub mod ports;
pub mod uma;

// Re-export main types at crate root
pub use api::AccessControllerClient;
pub use caep::{
    AddSubjectRequest, AddSubjectResponse, CaepEvent, StreamConfig, StreamStatus, SubjectStatus,
};
pub use error::{AccessError, PepAction};
pub use models::{
    Action, CallbackRequest, ContextType, ContextValue, CtxSubject, RedirectTarget,
    RequestedContextSpec, Resource, ScopeValue, SessionId, Subject, VerifiedIdentity,
};
pub use pdp_api::{ContextRequirement, Decision, PdpClient, PdpError};
pub use ports::{
    AuthNAgent, AuthNError, CaepError, CaepTransport, Repository, RepositoryError, RptError,
    UmaClient, UmaError,
};
pub use uma::{PermissionTicket, Rpt, UmaChallenge};
