//! Service implementation for the static identity agent.

use std::collections::HashMap;

use access_controller_sdk::{RedirectTarget, VerifiedIdentity};

use crate::config::{AuthnMode, IdentityConfig, StaticAuthnPluginConfig};

/// Static identity agent.
///
/// Maps authorization codes to identities based on configuration mode:
/// - `accept_all`: Any non-empty code maps to the default identity
/// - `static_codes`: Specific codes map to specific identities
pub struct Service {
    name: String,
    issuer: String,
    authorize_url: String,
    mode: AuthnMode,
    default_identity: IdentityConfig,
    code_map: HashMap<String, IdentityConfig>,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticAuthnPluginConfig) -> Self {
        let code_map = cfg
            .codes
            .iter()
            .map(|m| (m.code.clone(), m.identity.clone()))
            .collect();

        Self {
            name: cfg.name.clone(),
            issuer: cfg.issuer.clone(),
            authorize_url: cfg.authorize_url.clone(),
            mode: cfg.mode.clone(),
            default_identity: cfg.default_identity.clone(),
            code_map,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn redirect(&self, state: &str) -> RedirectTarget {
        let separator = if self.authorize_url.contains('?') { '&' } else { '?' };
        RedirectTarget {
            url: format!("{}{separator}state={state}", self.authorize_url),
            state: state.to_owned(),
        }
    }

    /// Exchange an authorization code for an identity.
    ///
    /// Returns `None` if the code is empty or, in `static_codes` mode, unknown.
    pub fn exchange(&self, code: &str) -> Option<VerifiedIdentity> {
        if code.is_empty() {
            return None;
        }

        let identity = match &self.mode {
            AuthnMode::AcceptAll => &self.default_identity,
            AuthnMode::StaticCodes => self.code_map.get(code)?,
        };

        Some(VerifiedIdentity {
            issuer: self.issuer.clone(),
            subject: identity.subject.clone(),
            device: identity.device.clone(),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::CodeMapping;

    fn default_config() -> StaticAuthnPluginConfig {
        StaticAuthnPluginConfig::default()
    }

    #[test]
    fn accept_all_mode_returns_default_identity() {
        let service = Service::from_config(&default_config());

        let identity = service.exchange("any-code").unwrap();
        assert_eq!(identity.issuer, "https://static-idp.local");
        assert_eq!(identity.subject, "developer");
        assert_eq!(identity.device, None);
    }

    #[test]
    fn accept_all_mode_rejects_empty_code() {
        let service = Service::from_config(&default_config());
        assert!(service.exchange("").is_none());
    }

    #[test]
    fn static_codes_mode_returns_mapped_identity() {
        let cfg = StaticAuthnPluginConfig {
            mode: AuthnMode::StaticCodes,
            codes: vec![CodeMapping {
                code: "code-alice".to_owned(),
                identity: IdentityConfig {
                    subject: "alice".to_owned(),
                    device: Some("laptop-7".to_owned()),
                },
            }],
            ..default_config()
        };
        let service = Service::from_config(&cfg);

        let identity = service.exchange("code-alice").unwrap();
        assert_eq!(identity.subject, "alice");
        assert_eq!(identity.device.as_deref(), Some("laptop-7"));
        assert!(service.exchange("code-bob").is_none());
    }

    #[test]
    fn redirect_carries_state() {
        let service = Service::from_config(&StaticAuthnPluginConfig {
            authorize_url: "https://idp.local/authorize?client_id=pep".to_owned(),
            ..default_config()
        });

        let target = service.redirect("s-123");
        assert_eq!(
            target.url,
            "https://idp.local/authorize?client_id=pep&state=s-123"
        );
        assert_eq!(target.state, "s-123");
    }
}
