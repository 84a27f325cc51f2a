//! Domain errors for the access controller.

use access_controller_sdk::{
    AccessError, AuthNError, CaepError, PdpError, RepositoryError, UmaError,
};

/// Failure inside the controller.
///
/// Classified outcomes travel as [`DomainError::Access`] and reach the PEP
/// unchanged; everything else is collapsed to [`AccessError::Internal`] at the
/// API boundary.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Caep(#[from] CaepError),

    #[error(transparent)]
    Uma(#[from] UmaError),

    #[error(transparent)]
    AuthN(#[from] AuthNError),

    #[error(transparent)]
    Pdp(#[from] PdpError),

    #[error("stored record is corrupt: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("{0}")]
    Config(String),
}

impl DomainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<DomainError> for AccessError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Access(access) => access,
            other => AccessError::Internal(other.to_string()),
        }
    }
}
