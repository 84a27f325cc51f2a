//! [`AuthNAgent`] implementation for the static identity agent.

use access_controller_sdk::{
    AuthNAgent, AuthNError, CallbackRequest, RedirectTarget, VerifiedIdentity,
};
use async_trait::async_trait;

use super::service::Service;

#[async_trait]
impl AuthNAgent for Service {
    fn name(&self) -> &str {
        Service::name(self)
    }

    fn login_redirect(&self, state: &str) -> Result<RedirectTarget, AuthNError> {
        Ok(self.redirect(state))
    }

    async fn exchange_code(
        &self,
        request: &CallbackRequest,
    ) -> Result<VerifiedIdentity, AuthNError> {
        self.exchange(&request.code).ok_or_else(|| {
            tracing::debug!(agent = %self.name(), "authorization code not recognized");
            AuthNError::Rejected("unknown authorization code".to_owned())
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{AuthnMode, StaticAuthnPluginConfig};

    #[tokio::test]
    async fn agent_trait_rejects_unknown_code() {
        let service = Service::from_config(&StaticAuthnPluginConfig {
            mode: AuthnMode::StaticCodes,
            ..StaticAuthnPluginConfig::default()
        });
        let agent: &dyn AuthNAgent = &service;

        let result = agent
            .exchange_code(&CallbackRequest {
                code: "nope".to_owned(),
                state: "s".to_owned(),
            })
            .await;

        assert!(matches!(result, Err(AuthNError::Rejected(_))));
        assert_eq!(agent.name(), "static");
    }
}
