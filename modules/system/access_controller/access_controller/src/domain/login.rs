//! Authorization-code login flow shared by the primary and context identity agents.

use std::sync::Arc;

use access_controller_sdk::{
    AuthNAgent, AuthNError, CallbackRequest, RedirectTarget, SessionId, VerifiedIdentity,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;
use super::store::{JsonStore, keys};

#[derive(Debug, Serialize, Deserialize)]
struct PendingLogin {
    state: Option<String>,
}

/// One identity provider's redirect / callback pair, bound to a session.
///
/// The `state` value is generated here, persisted per (flow, session) and
/// consumed by the first callback, whatever its outcome. Flows sharing an
/// identity provider never see each other's state.
#[derive(Clone)]
pub struct LoginFlow {
    idp: String,
    flow: String,
    agent: Arc<dyn AuthNAgent>,
    store: JsonStore,
}

impl LoginFlow {
    /// Login of the primary subject.
    pub fn for_subject(agent: Arc<dyn AuthNAgent>, store: JsonStore) -> Self {
        let flow = format!("subject/{}", agent.name());
        Self::new(flow, agent, store)
    }

    /// Login of the subject scoped to context provider `provider`.
    pub fn for_context(provider: &str, agent: Arc<dyn AuthNAgent>, store: JsonStore) -> Self {
        Self::new(format!("ctx/{provider}"), agent, store)
    }

    fn new(flow: String, agent: Arc<dyn AuthNAgent>, store: JsonStore) -> Self {
        Self {
            idp: agent.name().to_owned(),
            flow,
            agent,
            store,
        }
    }

    pub fn idp(&self) -> &str {
        &self.idp
    }

    #[tracing::instrument(skip_all, fields(idp = %self.idp, flow = %self.flow, session = %session))]
    pub async fn begin(&self, session: &SessionId) -> Result<RedirectTarget, DomainError> {
        let state = Uuid::new_v4().to_string();
        let target = self.agent.login_redirect(&state)?;
        self.store
            .put(
                &keys::login_state(&self.flow, session),
                &PendingLogin { state: Some(state) },
            )
            .await?;
        tracing::debug!("login redirect issued");
        Ok(target)
    }

    /// Complete the flow. `Ok(None)` means the login did not authenticate anyone.
    #[tracing::instrument(skip_all, fields(idp = %self.idp, flow = %self.flow, session = %session))]
    pub async fn complete(
        &self,
        session: &SessionId,
        request: &CallbackRequest,
    ) -> Result<Option<VerifiedIdentity>, DomainError> {
        let key = keys::login_state(&self.flow, session);
        let pending: Option<PendingLogin> = self.store.get(&key).await?;
        let expected = pending.and_then(|p| p.state);
        self.store.put(&key, &PendingLogin { state: None }).await?;

        if expected.as_deref() != Some(request.state.as_str()) {
            tracing::warn!("callback state does not match a pending login");
            return Ok(None);
        }

        match self.agent.exchange_code(request).await {
            Ok(identity) => Ok(Some(identity)),
            Err(AuthNError::Rejected(reason)) => {
                tracing::warn!(%reason, "authorization code rejected");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
