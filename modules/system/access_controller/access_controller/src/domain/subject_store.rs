//! Session → primary subject bindings.

use std::collections::HashMap;
use std::sync::Arc;

use access_controller_sdk::{
    AccessError, AuthNAgent, CallbackRequest, RedirectTarget, SessionId, Subject,
};

use super::DomainError;
use super::local_client::log_and_convert;
use super::login::LoginFlow;
use super::store::{JsonStore, keys};

/// Binds sessions to verified primary subjects.
///
/// A binding only comes into existence through a successful callback of one
/// of the configured identity agents.
#[derive(Clone)]
pub struct SubjectStore {
    store: JsonStore,
    primary_idp: String,
    flows: Arc<HashMap<String, LoginFlow>>,
}

impl SubjectStore {
    pub fn new(
        store: JsonStore,
        primary_idp: impl Into<String>,
        agents: impl IntoIterator<Item = Arc<dyn AuthNAgent>>,
    ) -> Self {
        let flows = agents
            .into_iter()
            .map(|agent| {
                let flow = LoginFlow::for_subject(agent, store.clone());
                (flow.idp().to_owned(), flow)
            })
            .collect();
        Self {
            store,
            primary_idp: primary_idp.into(),
            flows: Arc::new(flows),
        }
    }

    /// Subject bound to `session`.
    ///
    /// Fails with `SubjectNotAuthenticated` naming the primary identity provider.
    pub async fn get_subject(&self, session: &SessionId) -> Result<Subject, DomainError> {
        let bound: Option<Subject> = self.store.get(&keys::session_subject(session)).await?;
        bound.ok_or_else(|| {
            AccessError::SubjectNotAuthenticated {
                agent: Some(self.primary_idp.clone()),
            }
            .into()
        })
    }

    /// Bind `subject` to `session`, replacing any previous binding.
    pub async fn bind(&self, session: &SessionId, subject: &Subject) -> Result<(), DomainError> {
        self.store
            .put(&keys::session_subject(session), subject)
            .await
    }

    /// Login agent of identity provider `idp`.
    pub fn agent(&self, idp: &str) -> Option<SubjectAgent> {
        self.flows.get(idp).map(|flow| SubjectAgent {
            flow: flow.clone(),
            subjects: self.clone(),
        })
    }
}

/// Redirect / callback endpoints of one primary identity provider.
pub struct SubjectAgent {
    flow: LoginFlow,
    subjects: SubjectStore,
}

impl SubjectAgent {
    pub fn idp(&self) -> &str {
        self.flow.idp()
    }

    /// Start a login for `session`.
    ///
    /// # Errors
    ///
    /// `Internal` if the redirect cannot be built or persisted.
    pub async fn redirect(&self, session: &SessionId) -> Result<RedirectTarget, AccessError> {
        self.flow
            .begin(session)
            .await
            .map_err(|e| log_and_convert("subject_redirect", e))
    }

    /// Complete a login and bind the verified identity to `session`.
    ///
    /// # Errors
    ///
    /// - `SubjectNotAuthenticated` if the state or code is rejected
    /// - `Internal` for identity provider or storage failures
    pub async fn callback(
        &self,
        session: &SessionId,
        request: &CallbackRequest,
    ) -> Result<Subject, AccessError> {
        self.complete(session, request)
            .await
            .map_err(|e| log_and_convert("subject_callback", e))
    }

    async fn complete(
        &self,
        session: &SessionId,
        request: &CallbackRequest,
    ) -> Result<Subject, DomainError> {
        let Some(identity) = self.flow.complete(session, request).await? else {
            return Err(AccessError::SubjectNotAuthenticated {
                agent: Some(self.flow.idp().to_owned()),
            }
            .into());
        };
        let subject = identity.to_subject();
        self.subjects.bind(session, &subject).await?;
        tracing::info!(idp = self.flow.idp(), %session, %subject, "subject bound to session");
        Ok(subject)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::infra::InMemoryRepository;
    use crate::test_support::FakeAuthNAgent;

    fn store_with(agent: Arc<FakeAuthNAgent>) -> SubjectStore {
        let store = JsonStore::new(Arc::new(InMemoryRepository::new()));
        SubjectStore::new(store, "corp", [agent as Arc<dyn AuthNAgent>])
    }

    #[tokio::test]
    async fn unbound_session_names_primary_idp() {
        let subjects = store_with(Arc::new(FakeAuthNAgent::new("corp", "https://corp")));
        let err = subjects
            .get_subject(&SessionId::new("s-1"))
            .await
            .unwrap_err();
        assert_eq!(
            AccessError::from(err),
            AccessError::SubjectNotAuthenticated {
                agent: Some("corp".to_owned())
            }
        );
    }

    #[tokio::test]
    async fn callback_binds_subject() {
        let agent = Arc::new(FakeAuthNAgent::new("corp", "https://corp"));
        agent.accept_code("code-1", "alice", None);
        let subjects = store_with(agent);
        let session = SessionId::new("s-1");

        let sub_agent = subjects.agent("corp").unwrap();
        let target = sub_agent.redirect(&session).await.unwrap();
        assert!(target.url.contains(&target.state));

        let subject = sub_agent
            .callback(
                &session,
                &CallbackRequest {
                    code: "code-1".to_owned(),
                    state: target.state,
                },
            )
            .await
            .unwrap();

        assert_eq!(subject, Subject::new("https://corp", "alice"));
        assert_eq!(subjects.get_subject(&session).await.unwrap(), subject);
    }

    #[tokio::test]
    async fn callback_with_forged_state_is_rejected() {
        let agent = Arc::new(FakeAuthNAgent::new("corp", "https://corp"));
        agent.accept_code("code-1", "alice", None);
        let subjects = store_with(agent.clone());
        let session = SessionId::new("s-1");
        let sub_agent = subjects.agent("corp").unwrap();
        sub_agent.redirect(&session).await.unwrap();

        let err = sub_agent
            .callback(
                &session,
                &CallbackRequest {
                    code: "code-1".to_owned(),
                    state: "forged".to_owned(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::SubjectNotAuthenticated { .. }));
        assert_eq!(agent.exchanges(), 0);
        assert!(subjects.get_subject(&session).await.is_err());
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let agent = Arc::new(FakeAuthNAgent::new("corp", "https://corp"));
        agent.accept_code("code-1", "alice", None);
        let subjects = store_with(agent);
        let session = SessionId::new("s-1");
        let sub_agent = subjects.agent("corp").unwrap();
        let target = sub_agent.redirect(&session).await.unwrap();
        let request = CallbackRequest {
            code: "code-1".to_owned(),
            state: target.state,
        };

        sub_agent.callback(&session, &request).await.unwrap();
        let replay = sub_agent.callback(&session, &request).await;
        assert!(matches!(
            replay,
            Err(AccessError::SubjectNotAuthenticated { .. })
        ));
    }

    #[test]
    fn unknown_idp_has_no_agent() {
        let subjects = store_with(Arc::new(FakeAuthNAgent::new("corp", "https://corp")));
        assert!(subjects.agent("other").is_none());
    }
}
