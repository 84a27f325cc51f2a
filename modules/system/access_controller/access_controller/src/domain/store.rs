//! Typed records on top of the byte-blob [`Repository`].

use std::sync::Arc;

use access_controller_sdk::{CtxSubject, Repository, SessionId};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::DomainError;

/// Repository key layout. Every record kind owns one prefix.
pub mod keys {
    use super::{CtxSubject, SessionId};

    pub fn session_subject(session: &SessionId) -> String {
        format!("subject/session/{session}")
    }

    pub fn ctx_subject(provider: &str, session: &SessionId) -> String {
        format!("ctx/subject/{provider}/{session}")
    }

    /// `flow` is `subject/<idp>` or `ctx/<provider>`.
    pub fn login_state(flow: &str, session: &SessionId) -> String {
        format!("oidc/state/{flow}/{session}")
    }

    pub fn uma_grant(provider: &str, subject: &CtxSubject) -> String {
        format!("uma/grant/{provider}/{subject}")
    }
}

/// JSON-encoded records in a [`Repository`].
#[derive(Clone)]
pub struct JsonStore {
    repo: Arc<dyn Repository>,
}

impl JsonStore {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        match self.repo.load(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(value)?;
        self.repo.save(key, bytes).await?;
        Ok(())
    }
}
