//! Authorization orchestration: PIP first, then PDP.

use std::sync::Arc;

use access_controller_sdk::{
    AccessError, Action, ContextRequirement, PdpClient, Resource, SessionId,
};

use super::DomainError;
use super::context_manager::ContextAgent;
use super::pip::Pip;
use super::subject_store::SubjectAgent;

/// Central decision service.
///
/// Holds no per-request state; everything that lets a repeated call make
/// progress lives in the PIP.
pub struct Controller {
    pip: Pip,
    pdp: Arc<dyn PdpClient>,
}

impl Controller {
    pub fn new(pip: Pip, pdp: Arc<dyn PdpClient>) -> Self {
        Self { pip, pdp }
    }

    /// Decide whether `session` may perform `action` on `resource`.
    ///
    /// 1. resolve the primary subject
    /// 2. ask the PDP which contexts it needs, or deny without them
    /// 3. fetch those contexts
    /// 4. ask the PDP for the final decision
    ///
    /// The first failing step ends the call.
    #[tracing::instrument(
        skip_all,
        fields(
            session = %session,
            resource = %resource.resource_type,
            action = %action.name,
        )
    )]
    pub async fn ask_for_authorization(
        &self,
        session: &SessionId,
        resource: &Resource,
        action: &Action,
    ) -> Result<(), DomainError> {
        let subject = self.pip.get_subject(session).await?;

        let specs = match self.pdp.notified_of_request(&subject, resource, action)? {
            ContextRequirement::Deny { reason } => {
                tracing::debug!(%subject, ?reason, "denied before context lookup");
                return Err(AccessError::RequestDenied { reason }.into());
            }
            ContextRequirement::Require(specs) => specs,
        };

        let contexts = self.pip.get_contexts(session, &specs).await?;

        let decision = self
            .pdp
            .decision(&subject, resource, action, &contexts)
            .await?;
        if decision.allow {
            tracing::debug!(%subject, contexts = contexts.len(), "access granted");
            Ok(())
        } else {
            tracing::debug!(%subject, reason = ?decision.reason, "access denied");
            Err(AccessError::RequestDenied {
                reason: decision.reason,
            }
            .into())
        }
    }

    /// Login endpoints of primary identity provider `idp`.
    pub fn sub_agent(&self, idp: &str) -> Option<SubjectAgent> {
        self.pip.sub_agent(idp)
    }

    /// Login and push endpoints of context provider `provider`.
    pub fn ctx_agent(&self, provider: &str) -> Option<ContextAgent> {
        self.pip.ctx_agent(provider)
    }
}
