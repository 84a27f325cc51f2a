//! Per-provider context managers.
//!
//! The set of provider kinds is closed and selected from configuration at
//! startup:
//! - [`CaepContextManager`] - push-based context behind a CAEP stream and UMA consent
//! - [`StaticContextManager`] - fixed values from configuration

mod cache;
mod caep;
mod enablement;
mod static_provider;

use std::sync::Arc;

use access_controller_sdk::{
    AccessError, CallbackRequest, ContextType, ContextValue, CtxSubject, RedirectTarget,
    RequestedContextSpec, SessionId, Subject,
};

pub use cache::ContextCache;
pub use caep::{CaepContextManager, CaepSettings};
pub use static_provider::StaticContextManager;

use self::caep::CtxSubjectBinding;
use super::DomainError;
use super::local_client::log_and_convert;
use super::login::LoginFlow;
use super::store::keys;

/// Result of a per-provider lookup: delivered values and types still awaited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextLookup {
    pub values: Vec<ContextValue>,
    pub missing: Vec<ContextType>,
}

/// Context manager of one provider.
pub enum ContextManager {
    Caep {
        manager: Arc<CaepContextManager>,
        login: LoginFlow,
    },
    Static(StaticContextManager),
}

impl ContextManager {
    pub fn provider(&self) -> &str {
        match self {
            Self::Caep { manager, .. } => manager.provider(),
            Self::Static(manager) => manager.provider(),
        }
    }

    pub fn context_types(&self) -> Vec<ContextType> {
        match self {
            Self::Caep { manager, .. } => manager.context_types().cloned().collect(),
            Self::Static(manager) => manager.context_types().cloned().collect(),
        }
    }

    /// Resolve `specs` for the session.
    pub async fn get(
        &self,
        session: &SessionId,
        specs: &[RequestedContextSpec],
    ) -> Result<ContextLookup, DomainError> {
        match self {
            Self::Caep { manager, .. } => manager.get(session, specs).await,
            Self::Static(manager) => Ok(manager.get(specs)),
        }
    }

    /// Endpoints the PEP mounts for this provider; static providers have none.
    pub fn agent(&self) -> Option<ContextAgent> {
        match self {
            Self::Caep { manager, login } => Some(ContextAgent {
                manager: Arc::clone(manager),
                login: login.clone(),
            }),
            Self::Static(_) => None,
        }
    }
}

/// Login and push-receive endpoints of one CAEP provider.
pub struct ContextAgent {
    manager: Arc<CaepContextManager>,
    login: LoginFlow,
}

impl ContextAgent {
    pub fn provider(&self) -> &str {
        self.manager.provider()
    }

    /// Start a login with the provider's identity provider.
    ///
    /// # Errors
    ///
    /// `Internal` if the redirect cannot be built or persisted.
    pub async fn redirect(&self, session: &SessionId) -> Result<RedirectTarget, AccessError> {
        self.login
            .begin(session)
            .await
            .map_err(|e| log_and_convert("ctx_redirect", e))
    }

    /// Complete a login and bind the provider-scoped subject to `session`.
    ///
    /// # Errors
    ///
    /// - `SubjectForCtxUnauthenticated` if the state or code is rejected
    /// - `Internal` for identity provider or storage failures
    pub async fn callback(
        &self,
        session: &SessionId,
        request: &CallbackRequest,
    ) -> Result<CtxSubject, AccessError> {
        self.complete(session, request)
            .await
            .map_err(|e| log_and_convert("ctx_callback", e))
    }

    /// Receive a pushed event.
    ///
    /// # Errors
    ///
    /// `Internal` if the event fails verification or decoding.
    pub async fn recv_ctx(&self, body: &[u8]) -> Result<(), AccessError> {
        self.manager
            .recv_ctx(body)
            .await
            .map(|_| ())
            .map_err(|e| log_and_convert("recv_ctx", e))
    }

    async fn complete(
        &self,
        session: &SessionId,
        request: &CallbackRequest,
    ) -> Result<CtxSubject, DomainError> {
        let Some(identity) = self.login.complete(session, request).await? else {
            return Err(AccessError::SubjectForCtxUnauthenticated {
                provider: self.manager.provider().to_owned(),
                agent: self.manager.idp().to_owned(),
            }
            .into());
        };
        let principal: Option<Subject> = self
            .manager
            .store()
            .get(&keys::session_subject(session))
            .await?;
        let binding = CtxSubjectBinding {
            subject: identity.to_ctx_subject(),
            principal,
        };
        self.manager.bind_ctx_subject(session, &binding).await?;
        tracing::info!(
            provider = self.manager.provider(),
            %session,
            subject = %binding.subject,
            principal = ?binding.principal,
            "context subject bound to session"
        );
        Ok(binding.subject)
    }
}
