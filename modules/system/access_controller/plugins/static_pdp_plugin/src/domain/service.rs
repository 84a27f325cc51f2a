//! Service implementation for the static PDP plugin.

use access_controller_sdk::{
    Action, ContextRequirement, ContextValue, Decision, RequestedContextSpec, Resource,
};

use crate::config::{PdpMode, RuleConfig, StaticPdpPluginConfig};

/// Static PDP service.
///
/// Looks up the first rule matching `(resource_type, action)`:
/// - `allow_all`: requires nothing, always allows
/// - `deny`: denies before any context is fetched
/// - `require`: requests the configured scopes and allows only when each is
///   known and one of its accepted values
///
/// Requests no rule matches use `default_mode`. There is nothing to require
/// without a rule, so a `require` default denies.
pub struct Service {
    default_mode: PdpMode,
    rules: Vec<RuleConfig>,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticPdpPluginConfig) -> Self {
        Self {
            default_mode: cfg.default_mode,
            rules: cfg.rules.clone(),
        }
    }

    fn rule(&self, resource: &Resource, action: &Action) -> Option<&RuleConfig> {
        self.rules
            .iter()
            .find(|r| r.resource_type == resource.resource_type && r.action == action.name)
    }

    /// Contexts needed to decide, or an immediate denial.
    #[must_use]
    pub fn requirement(&self, resource: &Resource, action: &Action) -> ContextRequirement {
        let Some(rule) = self.rule(resource, action) else {
            return match self.default_mode {
                PdpMode::AllowAll => ContextRequirement::Require(Vec::new()),
                PdpMode::Deny | PdpMode::Require => ContextRequirement::Deny { reason: None },
            };
        };
        match rule.mode {
            PdpMode::AllowAll => ContextRequirement::Require(Vec::new()),
            PdpMode::Deny => ContextRequirement::Deny {
                reason: rule.reason.clone(),
            },
            PdpMode::Require => ContextRequirement::Require(
                rule.contexts
                    .iter()
                    .map(|c| RequestedContextSpec::new(c.context_type.clone(), c.accepted.keys()))
                    .collect(),
            ),
        }
    }

    /// Final decision over the materialized contexts.
    #[must_use]
    pub fn decide(&self, resource: &Resource, action: &Action, contexts: &[ContextValue]) -> Decision {
        let Some(rule) = self.rule(resource, action) else {
            return match self.default_mode {
                PdpMode::AllowAll => Decision::allow(),
                PdpMode::Deny | PdpMode::Require => Decision {
                    allow: false,
                    reason: None,
                },
            };
        };
        match rule.mode {
            PdpMode::AllowAll => Decision::allow(),
            PdpMode::Deny => Decision {
                allow: false,
                reason: rule.reason.clone(),
            },
            PdpMode::Require => match first_unmet(rule, contexts) {
                None => Decision::allow(),
                Some(unmet) => {
                    tracing::debug!(
                        resource_type = %resource.resource_type,
                        action = %action.name,
                        %unmet,
                        "context requirement not met"
                    );
                    Decision::deny(rule.reason.clone().unwrap_or(unmet))
                }
            },
        }
    }
}

/// First scope that is unknown or not accepted. An unknown scope never passes.
fn first_unmet(rule: &RuleConfig, contexts: &[ContextValue]) -> Option<String> {
    for requirement in &rule.contexts {
        let value = contexts
            .iter()
            .find(|c| c.context_type == requirement.context_type);
        for (scope, accepted) in &requirement.accepted {
            match value.and_then(|v| v.get(scope)) {
                None => return Some(format!("{}/{scope} is unknown", requirement.context_type)),
                Some(actual) if !accepted.contains(actual) => {
                    return Some(format!(
                        "{}/{scope} = {actual} is not accepted",
                        requirement.context_type
                    ));
                }
                Some(_) => {}
            }
        }
    }
    None
}
