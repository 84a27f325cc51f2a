//! Public API trait for the access controller.

use async_trait::async_trait;

use crate::error::AccessError;
use crate::models::{Action, Resource, SessionId};

/// Public API trait for the access controller.
///
/// Consumed by PEPs, directly or through [`PolicyEnforcer`](crate::pep::PolicyEnforcer):
///
/// ```ignore
/// let controller: Arc<dyn AccessControllerClient> = access_controller::init(cfg, deps)?.client();
///
/// controller.ask_for_authorization(&session, &resource, &action).await?;
/// ```
#[async_trait]
pub trait AccessControllerClient: Send + Sync {
    /// Decide whether the session may perform `action` on `resource`.
    ///
    /// `Ok(())` means authorized. Repeating the call after the user completes
    /// a redirect flow, or after a transient outcome, is always safe.
    ///
    /// # Errors
    ///
    /// One [`AccessError`] variant per PEP-facing outcome; see its docs.
    async fn ask_for_authorization(
        &self,
        session: &SessionId,
        resource: &Resource,
        action: &Action,
    ) -> Result<(), AccessError>;
}
