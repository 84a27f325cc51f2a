//! Local (in-process) client for the access controller.

use std::sync::Arc;

use access_controller_sdk::{AccessControllerClient, AccessError, Action, Resource, SessionId};
use async_trait::async_trait;

use super::{Controller, DomainError};

/// Local client wrapping the controller service.
pub struct AccessControllerLocalClient {
    svc: Arc<Controller>,
}

impl AccessControllerLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Controller>) -> Self {
        Self { svc }
    }
}

pub(crate) fn log_and_convert(op: &str, e: DomainError) -> AccessError {
    match e {
        DomainError::Access(access) => {
            tracing::debug!(operation = op, outcome = %access, "access_controller call refused");
            access
        }
        other => {
            tracing::error!(operation = op, error = ?other, "access_controller call failed");
            other.into()
        }
    }
}

#[async_trait]
impl AccessControllerClient for AccessControllerLocalClient {
    async fn ask_for_authorization(
        &self,
        session: &SessionId,
        resource: &Resource,
        action: &Action,
    ) -> Result<(), AccessError> {
        self.svc
            .ask_for_authorization(session, resource, action)
            .await
            .map_err(|e| log_and_convert("ask_for_authorization", e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use access_controller_sdk::RepositoryError;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn internal_failures_are_logged_as_errors() {
        let converted = log_and_convert("ask_for_authorization", RepositoryError("offline".to_owned()).into());
        assert!(matches!(converted, AccessError::Internal(_)));
        assert!(logs_contain("access_controller call failed"));
    }

    #[test]
    #[traced_test]
    fn classified_outcomes_pass_through() {
        let converted = log_and_convert(
            "ask_for_authorization",
            AccessError::CtxsNotFound {
                context_types: vec!["device-posture".into()],
            }
            .into(),
        );
        assert!(matches!(converted, AccessError::CtxsNotFound { .. }));
        assert!(!logs_contain("access_controller call failed"));
    }
}
