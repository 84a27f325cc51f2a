//! Configuration for the static identity agent.

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticAuthnPluginConfig {
    /// Agent name the controller refers to.
    pub name: String,

    /// Issuer stamped on every identity.
    pub issuer: String,

    /// Where users are sent to log in; `state` is appended as a query parameter.
    pub authorize_url: String,

    /// Authentication mode.
    pub mode: AuthnMode,

    /// Identity returned in `accept_all` mode.
    pub default_identity: IdentityConfig,

    /// Code → identity table for `static_codes` mode.
    pub codes: Vec<CodeMapping>,
}

impl Default for StaticAuthnPluginConfig {
    fn default() -> Self {
        Self {
            name: "static".to_owned(),
            issuer: "https://static-idp.local".to_owned(),
            authorize_url: "https://static-idp.local/authorize".to_owned(),
            mode: AuthnMode::AcceptAll,
            default_identity: IdentityConfig::default(),
            codes: Vec::new(),
        }
    }
}

/// Authentication mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthnMode {
    /// Any non-empty code authenticates the default identity.
    #[default]
    AcceptAll,
    /// Only configured codes authenticate, each as its mapped identity.
    StaticCodes,
}

/// Identity returned for a code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub subject: String,
    pub device: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            subject: "developer".to_owned(),
            device: None,
        }
    }
}

/// A single code → identity mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeMapping {
    pub code: String,
    pub identity: IdentityConfig,
}
