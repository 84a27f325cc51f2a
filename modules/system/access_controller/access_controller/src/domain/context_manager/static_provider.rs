//! Context provider serving fixed values from configuration.

use std::collections::BTreeMap;

use access_controller_sdk::{ContextType, ContextValue, CtxSubject, RequestedContextSpec};

use super::ContextLookup;

/// Serves configured values for every session.
///
/// The values are not subject-specific, so they are attributed to a
/// synthetic `static:<provider>` subject.
pub struct StaticContextManager {
    provider: String,
    subject: CtxSubject,
    values: BTreeMap<ContextType, BTreeMap<String, serde_json::Value>>,
}

impl StaticContextManager {
    pub fn new(
        provider: impl Into<String>,
        values: BTreeMap<ContextType, BTreeMap<String, serde_json::Value>>,
    ) -> Self {
        let provider = provider.into();
        Self {
            subject: CtxSubject::new(format!("static:{provider}")),
            provider,
            values,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn context_types(&self) -> impl Iterator<Item = &ContextType> {
        self.values.keys()
    }

    pub fn get(&self, specs: &[RequestedContextSpec]) -> ContextLookup {
        let mut lookup = ContextLookup::default();
        for spec in specs {
            let Some(configured) = self.values.get(&spec.context_type) else {
                lookup.missing.push(spec.context_type.clone());
                continue;
            };
            let mut value = ContextValue::placeholder(
                spec.context_type.clone(),
                self.subject.clone(),
                &spec.scopes,
            );
            value.merge(configured.clone(), None);
            lookup.values.push(value);
        }
        lookup
    }
}
