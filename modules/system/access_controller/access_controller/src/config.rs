//! Configuration for the access controller.

use std::collections::BTreeMap;

use access_controller_sdk::ContextType;
use serde::Deserialize;

/// Controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessControllerConfig {
    /// Identity provider that authenticates primary subjects.
    pub primary_idp: String,

    /// Context providers. Each context type must be served by exactly one.
    pub providers: Vec<ProviderConfig>,
}

impl Default for AccessControllerConfig {
    fn default() -> Self {
        Self {
            primary_idp: "oidc".to_owned(),
            providers: Vec::new(),
        }
    }
}

/// A single context provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Push-based provider behind a CAEP stream and UMA consent.
    Caep(CaepProviderConfig),
    /// Fixed values served for every session.
    Static(StaticProviderConfig),
}

impl ProviderConfig {
    pub fn id(&self) -> &str {
        match self {
            Self::Caep(cfg) => &cfg.id,
            Self::Static(cfg) => &cfg.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaepProviderConfig {
    pub id: String,

    /// Identity provider that authenticates the provider-scoped subject.
    pub idp: String,

    /// Our receiver identifier on the provider's stream.
    pub receiver_id: String,

    /// Where the provider pushes events.
    pub delivery_endpoint: String,

    /// Context type → CAEP event type URI.
    pub context_types: BTreeMap<ContextType, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticProviderConfig {
    pub id: String,

    /// Context type → scope → value.
    #[serde(default)]
    pub values: BTreeMap<ContextType, BTreeMap<String, serde_json::Value>>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> AccessControllerConfig {
        match serde_saphyr::from_str(yaml) {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        }
    }

    #[test]
    fn config_defaults_are_applied() {
        let cfg = parse("{}");
        assert_eq!(cfg.primary_idp, "oidc");
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn config_parses_both_provider_kinds() {
        let cfg = parse(
            r#"
primary_idp: "corp"
providers:
  - type: "caep"
    id: "cap"
    idp: "cap-idp"
    receiver_id: "receiver-1"
    delivery_endpoint: "https://controller.example/caep/cap"
    context_types:
      device-posture: "https://schemas.example/caep/device-posture"
  - type: "static"
    id: "office"
    values:
      network:
        zone: "corp"
"#,
        );

        assert_eq!(cfg.primary_idp, "corp");
        assert_eq!(cfg.providers.len(), 2);
        match &cfg.providers[0] {
            ProviderConfig::Caep(caep) => {
                assert_eq!(caep.idp, "cap-idp");
                assert_eq!(
                    caep.context_types.get(&ContextType::new("device-posture")),
                    Some(&"https://schemas.example/caep/device-posture".to_owned())
                );
            }
            other => panic!("expected caep provider, got {other:?}"),
        }
        match &cfg.providers[1] {
            ProviderConfig::Static(fixed) => {
                assert_eq!(fixed.id, "office");
                let network = &fixed.values[&ContextType::new("network")];
                assert_eq!(network["zone"], serde_json::json!("corp"));
            }
            other => panic!("expected static provider, got {other:?}"),
        }
        assert_eq!(cfg.providers[1].id(), "office");
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let parsed: Result<AccessControllerConfig, _> = serde_saphyr::from_str(
            r#"
primary_idp: "corp"
unexpected: true
"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn provider_rejects_unknown_fields() {
        let parsed: Result<AccessControllerConfig, _> = serde_saphyr::from_str(
            r#"
providers:
  - type: "static"
    id: "office"
    colour: "blue"
"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn provider_requires_known_type() {
        let parsed: Result<AccessControllerConfig, _> = serde_saphyr::from_str(
            r#"
providers:
  - type: "poll"
    id: "office"
"#,
        );
        assert!(parsed.is_err());
    }
}
