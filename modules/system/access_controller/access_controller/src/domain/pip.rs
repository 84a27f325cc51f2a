//! Policy Information Point facade.

use access_controller_sdk::{ContextValue, RequestedContextSpec, SessionId, Subject};

use super::DomainError;
use super::context_manager::ContextAgent;
use super::context_pip::ContextPip;
use super::subject_store::{SubjectAgent, SubjectStore};

/// Subject and context information for the controller.
pub struct Pip {
    subjects: SubjectStore,
    contexts: ContextPip,
}

impl Pip {
    pub fn new(subjects: SubjectStore, contexts: ContextPip) -> Self {
        Self { subjects, contexts }
    }

    pub async fn get_subject(&self, session: &SessionId) -> Result<Subject, DomainError> {
        self.subjects.get_subject(session).await
    }

    pub async fn get_contexts(
        &self,
        session: &SessionId,
        specs: &[RequestedContextSpec],
    ) -> Result<Vec<ContextValue>, DomainError> {
        self.contexts.get_contexts(session, specs).await
    }

    pub fn sub_agent(&self, idp: &str) -> Option<SubjectAgent> {
        self.subjects.agent(idp)
    }

    pub fn ctx_agent(&self, provider: &str) -> Option<ContextAgent> {
        self.contexts.agent(provider)
    }
}
