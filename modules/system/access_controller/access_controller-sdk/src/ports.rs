//! Collaborator ports consumed by the access controller.
//!
//! Implementations live outside the controller: the storage engine, the
//! OIDC relying party, the CAEP receiver transport and the UMA client.

use async_trait::async_trait;

use crate::caep::{AddSubjectRequest, AddSubjectResponse, CaepEvent, StreamConfig, StreamStatus};
use crate::models::{CallbackRequest, CtxSubject, RedirectTarget, VerifiedIdentity};
use crate::uma::{PermissionTicket, Rpt, UmaChallenge};

/// Opaque storage failure.
#[derive(Debug, thiserror::Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);

/// Keyed byte-blob store.
///
/// No transactions; last write wins. Key prefixes are managed by the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store is unavailable.
    async fn save(&self, key: &str, value: Vec<u8>) -> Result<(), RepositoryError>;

    /// Load the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store is unavailable.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError>;
}

/// Identity provider failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthNError {
    /// The authorization code was rejected.
    #[error("code exchange rejected: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// OIDC relying party for one identity provider.
///
/// Token validation happens inside the implementation; the controller only
/// sees the verified identity.
#[async_trait]
pub trait AuthNAgent: Send + Sync {
    /// Identity provider name, as referenced from configuration.
    fn name(&self) -> &str;

    /// Build the login redirect carrying `state`.
    ///
    /// # Errors
    ///
    /// Returns `AuthNError` if the redirect cannot be built.
    fn login_redirect(&self, state: &str) -> Result<RedirectTarget, AuthNError>;

    /// Exchange an authorization code for a verified identity.
    ///
    /// # Errors
    ///
    /// - `Rejected` if the code or resulting tokens are invalid
    /// - `Unavailable` if the identity provider cannot be reached
    async fn exchange_code(&self, request: &CallbackRequest)
    -> Result<VerifiedIdentity, AuthNError>;
}

/// CAEP transport failure.
#[derive(Debug, thiserror::Error)]
pub enum CaepError {
    /// An inbound event failed signature or format verification.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("stream management call failed: {0}")]
    Transport(String),
}

/// CAEP receiver transport towards one context provider.
#[async_trait]
pub trait CaepTransport: Send + Sync {
    /// Read the provider's current stream configuration.
    ///
    /// # Errors
    ///
    /// Returns `CaepError::Transport` on failure.
    async fn read_stream_config(&self) -> Result<StreamConfig, CaepError>;

    /// Replace the stream configuration; returns the configuration the provider accepted.
    ///
    /// # Errors
    ///
    /// Returns `CaepError::Transport` on failure.
    async fn set_up_stream(&self, config: &StreamConfig) -> Result<StreamConfig, CaepError>;

    /// Query the subscription status of `subject`.
    ///
    /// # Errors
    ///
    /// Returns `CaepError::Transport` on failure.
    async fn read_stream_status(&self, subject: &CtxSubject) -> Result<StreamStatus, CaepError>;

    /// Add a subject to the stream, optionally presenting an RPT.
    ///
    /// A UMA 401 is a response, not an error.
    ///
    /// # Errors
    ///
    /// Returns `CaepError::Transport` for any other failure.
    async fn add_subject(
        &self,
        request: &AddSubjectRequest,
        rpt: Option<&Rpt>,
    ) -> Result<AddSubjectResponse, CaepError>;

    /// Verify and decode a pushed security event.
    ///
    /// # Errors
    ///
    /// Returns `CaepError::InvalidEvent` if verification or decoding fails.
    async fn recv(&self, body: &[u8]) -> Result<CaepEvent, CaepError>;
}

/// UMA protocol failure.
#[derive(Debug, thiserror::Error)]
pub enum UmaError {
    #[error("no permission ticket in challenge: {0}")]
    MissingTicket(String),
    #[error("authorization server call failed: {0}")]
    Transport(String),
}

/// RPT grant failure.
#[derive(Debug, thiserror::Error)]
pub enum RptError {
    /// The authorization server submitted the request to the resource owner.
    #[error("request submitted, awaiting resource-owner approval")]
    Pending,
    #[error("rpt grant failed: {0}")]
    Failed(#[from] UmaError),
}

/// UMA client acting with the service's own requesting-party credentials.
#[async_trait]
pub trait UmaClient: Send + Sync {
    /// Extract the permission ticket from a 401 challenge.
    ///
    /// # Errors
    ///
    /// Returns `UmaError::MissingTicket` if the challenge carries no ticket.
    fn extract_permission_ticket(
        &self,
        challenge: &UmaChallenge,
    ) -> Result<PermissionTicket, UmaError>;

    /// Exchange a permission ticket for an RPT.
    ///
    /// # Errors
    ///
    /// - `Pending` if the resource owner has not approved yet
    /// - `Failed` for any other failure
    async fn request_rpt(&self, ticket: &PermissionTicket) -> Result<Rpt, RptError>;
}
