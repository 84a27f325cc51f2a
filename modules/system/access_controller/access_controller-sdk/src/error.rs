//! Error taxonomy surfaced to the PEP.
//!
//! The set is closed: every failure of `ask_for_authorization` is exactly one
//! of these variants. PEP behavior is selected from the variant alone, so
//! lower layers must never collapse a classified failure into [`AccessError::Internal`].
//!
//! | variant | [`PepAction`] |
//! |---------|---------------|
//! | `SubjectNotAuthenticated` | `Redirect` to the primary identity provider |
//! | `SubjectForCtxUnauthenticated` | `Redirect` to the context provider's identity provider |
//! | `RequestDenied` | `Deny` |
//! | `SubjectForCtxUnauthorizedButReqSubmitted` | `CheckBackLater` |
//! | `CtxsNotFound` | `RetryShortly` |
//! | `Internal` | `Fail` |

use crate::models::ContextType;

/// Outcome of a failed authorization request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// No primary subject is bound to the session.
    #[error("subject not authenticated")]
    SubjectNotAuthenticated {
        /// Identity provider whose login flow the PEP should start.
        agent: Option<String>,
    },

    /// No provider-scoped subject is bound to the session.
    #[error("subject not authenticated for context provider '{provider}'")]
    SubjectForCtxUnauthenticated {
        provider: String,
        /// Identity provider whose login flow the PEP should start.
        agent: String,
    },

    /// Resource-owner consent was requested and is pending.
    #[error("context subscription at '{provider}' awaits resource-owner consent")]
    SubjectForCtxUnauthorizedButReqSubmitted { provider: String },

    /// The PDP denied the request.
    #[error("request denied{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    RequestDenied { reason: Option<String> },

    /// Required context has not been delivered by its provider yet.
    #[error("context not delivered yet: {}", join_types(.context_types))]
    CtxsNotFound { context_types: Vec<ContextType> },

    /// Unclassified failure; fatal for this request.
    #[error("internal error: {0}")]
    Internal(String),
}

fn join_types(types: &[ContextType]) -> String {
    types
        .iter()
        .map(ContextType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the PEP transport should do with a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PepAction {
    /// Start the login flow of the named identity provider.
    Redirect { agent: Option<String> },
    /// Refuse the request.
    Deny,
    /// Accept the request for later: consent was submitted.
    CheckBackLater,
    /// Accept the request for later: context is on its way.
    RetryShortly,
    /// Fail the request.
    Fail,
}

impl AccessError {
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map the error to transport behavior.
    #[must_use]
    pub fn pep_action(&self) -> PepAction {
        match self {
            Self::SubjectNotAuthenticated { agent } => PepAction::Redirect {
                agent: agent.clone(),
            },
            Self::SubjectForCtxUnauthenticated { agent, .. } => PepAction::Redirect {
                agent: Some(agent.clone()),
            },
            Self::RequestDenied { .. } => PepAction::Deny,
            Self::SubjectForCtxUnauthorizedButReqSubmitted { .. } => PepAction::CheckBackLater,
            Self::CtxsNotFound { .. } => PepAction::RetryShortly,
            Self::Internal(_) => PepAction::Fail,
        }
    }

    /// Whether revisiting the same request later may succeed without user interaction.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SubjectForCtxUnauthorizedButReqSubmitted { .. } | Self::CtxsNotFound { .. }
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn pending_outcomes_are_transient_and_never_deny() {
        let pending = AccessError::SubjectForCtxUnauthorizedButReqSubmitted {
            provider: "cap".to_owned(),
        };
        let missing = AccessError::CtxsNotFound {
            context_types: vec![ContextType::new("device-posture")],
        };

        assert!(pending.is_transient());
        assert!(missing.is_transient());
        assert_eq!(pending.pep_action(), PepAction::CheckBackLater);
        assert_eq!(missing.pep_action(), PepAction::RetryShortly);
    }

    #[test]
    fn deny_is_terminal() {
        let denied = AccessError::RequestDenied { reason: None };
        assert!(!denied.is_transient());
        assert_eq!(denied.pep_action(), PepAction::Deny);
        assert_eq!(denied.to_string(), "request denied");

        let explained = AccessError::RequestDenied {
            reason: Some("risk too high".to_owned()),
        };
        assert_eq!(explained.to_string(), "request denied: risk too high");
    }

    #[test]
    fn ctx_unauthenticated_redirects_to_provider_agent() {
        let err = AccessError::SubjectForCtxUnauthenticated {
            provider: "cap".to_owned(),
            agent: "cap-idp".to_owned(),
        };
        assert_eq!(
            err.pep_action(),
            PepAction::Redirect {
                agent: Some("cap-idp".to_owned())
            }
        );
    }

    #[test]
    fn not_found_lists_types() {
        let err = AccessError::CtxsNotFound {
            context_types: vec![ContextType::new("device-posture"), ContextType::new("location")],
        };
        assert_eq!(
            err.to_string(),
            "context not delivered yet: device-posture, location"
        );
    }
}
