//! Policy Decision Point contract.

use async_trait::async_trait;

use crate::models::{Action, ContextValue, RequestedContextSpec, Resource, Subject};

/// What the PDP needs before it can decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextRequirement {
    /// Deny without looking at any context.
    Deny { reason: Option<String> },
    /// Fetch these contexts, then ask for a decision. May be empty.
    Require(Vec<RequestedContextSpec>),
}

/// Final decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allow: bool,
    pub reason: Option<String>,
}

impl Decision {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allow: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(reason.into()),
        }
    }
}

/// PDP failure. Opaque to the PEP.
#[derive(Debug, thiserror::Error)]
#[error("pdp error: {0}")]
pub struct PdpError(pub String);

/// Pluggable Policy Decision Point.
///
/// `notified_of_request` runs on every request, including unauthenticated
/// ones, and is synchronous so it cannot perform network I/O. It must be
/// free of side effects and return the smallest context set it needs.
///
/// `decision` receives the materialized contexts. A scope that is absent or
/// [`Unknown`](crate::ScopeValue::Unknown) is unknown: policies must not
/// treat it as a safe default.
#[async_trait]
pub trait PdpClient: Send + Sync {
    /// Declare the contexts required for `(subject, resource, action)`, or deny.
    ///
    /// # Errors
    ///
    /// Returns `PdpError` if the policy cannot be evaluated.
    fn notified_of_request(
        &self,
        subject: &Subject,
        resource: &Resource,
        action: &Action,
    ) -> Result<ContextRequirement, PdpError>;

    /// Render the final decision.
    ///
    /// # Errors
    ///
    /// Returns `PdpError` if the policy cannot be evaluated.
    async fn decision(
        &self,
        subject: &Subject,
        resource: &Resource,
        action: &Action,
        contexts: &[ContextValue],
    ) -> Result<Decision, PdpError>;
}
