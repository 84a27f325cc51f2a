//! Policy Enforcement Point (`PEP`) object.
//!
//! [`PolicyEnforcer`] wraps the controller call and turns its result into a
//! [`PepOutcome`] the transport can act on without inspecting errors.
//!
//! Constructed once during service initialisation with the controller client;
//! cheap to clone.

use std::sync::Arc;

use crate::api::AccessControllerClient;
use crate::error::{AccessError, PepAction};
use crate::models::{Action, Resource, SessionId};

/// Transport-level result of an enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PepOutcome {
    /// Serve the request.
    Allow,
    /// Start the login flow of `agent` (primary or context identity provider).
    Redirect { agent: Option<String> },
    /// Refuse the request.
    Deny { reason: Option<String> },
    /// Consent was requested from the resource owner; tell the user to come back later.
    CheckBackLater,
    /// Context is expected shortly; tell the user agent to retry.
    RetryShortly,
    /// Fail the request.
    Fail,
}

impl From<&AccessError> for PepOutcome {
    fn from(err: &AccessError) -> Self {
        match err.pep_action() {
            PepAction::Redirect { agent } => Self::Redirect { agent },
            PepAction::Deny => Self::Deny {
                reason: match err {
                    AccessError::RequestDenied { reason } => reason.clone(),
                    _ => None,
                },
            },
            PepAction::CheckBackLater => Self::CheckBackLater,
            PepAction::RetryShortly => Self::RetryShortly,
            PepAction::Fail => Self::Fail,
        }
    }
}

/// Policy Enforcement Point.
///
/// # Example
///
/// ```ignore
/// use access_controller_sdk::pep::{PepOutcome, PolicyEnforcer};
///
/// let enforcer = PolicyEnforcer::new(controller.clone());
/// let outcome = enforcer.enforce(&session, &Resource::new("reports"), &Action::new("read")).await;
/// ```
#[derive(Clone)]
pub struct PolicyEnforcer {
    controller: Arc<dyn AccessControllerClient>,
}

impl PolicyEnforcer {
    /// Create a new enforcer.
    pub fn new(controller: Arc<dyn AccessControllerClient>) -> Self {
        Self { controller }
    }

    /// Ask the controller and map the result.
    pub async fn enforce(
        &self,
        session: &SessionId,
        resource: &Resource,
        action: &Action,
    ) -> PepOutcome {
        match self
            .controller
            .ask_for_authorization(session, resource, action)
            .await
        {
            Ok(()) => PepOutcome::Allow,
            Err(err) => PepOutcome::from(&err),
        }
    }
}

impl std::fmt::Debug for PolicyEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEnforcer").finish_non_exhaustive()
    }
}
