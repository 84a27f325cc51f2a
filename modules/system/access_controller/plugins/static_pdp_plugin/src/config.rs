//! Configuration for the static PDP plugin.

use std::collections::BTreeMap;

use access_controller_sdk::ContextType;
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticPdpPluginConfig {
    /// Mode for requests no rule matches; `require` denies them.
    pub default_mode: PdpMode,

    /// Rules, matched by `(resource_type, action)`; the first match wins.
    pub rules: Vec<RuleConfig>,
}

impl Default for StaticPdpPluginConfig {
    fn default() -> Self {
        Self {
            default_mode: PdpMode::AllowAll,
            rules: Vec::new(),
        }
    }
}

/// Decision mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdpMode {
    /// Allow without looking at any context.
    #[default]
    AllowAll,
    /// Deny without looking at any context.
    Deny,
    /// Allow only when every required scope is known and accepted.
    Require,
}

/// Policy for one `(resource_type, action)` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub resource_type: String,
    pub action: String,
    pub mode: PdpMode,

    /// Reason reported on denial.
    #[serde(default)]
    pub reason: Option<String>,

    /// Context requirements for `require` mode.
    #[serde(default)]
    pub contexts: Vec<ContextRuleConfig>,
}

/// Accepted values per scope of one context type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextRuleConfig {
    pub context_type: ContextType,

    /// Scope → accepted values. Every listed scope is requested.
    pub accepted: BTreeMap<String, Vec<serde_json::Value>>,
}
