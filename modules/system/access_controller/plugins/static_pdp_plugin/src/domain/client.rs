//! [`PdpClient`] implementation for the static PDP plugin.

use access_controller_sdk::{
    Action, ContextRequirement, ContextValue, Decision, PdpClient, PdpError, Resource, Subject,
};
use async_trait::async_trait;

use super::service::Service;

#[async_trait]
impl PdpClient for Service {
    fn notified_of_request(
        &self,
        _subject: &Subject,
        resource: &Resource,
        action: &Action,
    ) -> Result<ContextRequirement, PdpError> {
        Ok(self.requirement(resource, action))
    }

    async fn decision(
        &self,
        _subject: &Subject,
        resource: &Resource,
        action: &Action,
        contexts: &[ContextValue],
    ) -> Result<Decision, PdpError> {
        Ok(self.decide(resource, action, contexts))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::StaticPdpPluginConfig;

    #[tokio::test]
    async fn plugin_trait_allows_by_default() {
        let service = Service::from_config(&StaticPdpPluginConfig::default());
        let pdp: &dyn PdpClient = &service;
        let subject = Subject::new("https://corp", "alice");
        let resource = Resource::new("documents.report");
        let action = Action::new("read");

        let requirement = pdp.notified_of_request(&subject, &resource, &action).unwrap();
        assert_eq!(requirement, ContextRequirement::Require(vec![]));

        let decision = pdp.decision(&subject, &resource, &action, &[]).await.unwrap();
        assert!(decision.allow);
    }
}
