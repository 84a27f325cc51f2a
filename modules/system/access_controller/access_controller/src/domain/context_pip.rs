//! Routes requested contexts to the provider that owns them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use access_controller_sdk::{
    AccessError, ContextType, ContextValue, RequestedContextSpec, SessionId,
};

use super::DomainError;
use super::context_manager::{ContextAgent, ContextManager};

/// Context half of the PIP.
///
/// The type → provider table is fixed at construction; a context type has
/// exactly one owning provider.
pub struct ContextPip {
    owners: HashMap<ContextType, String>,
    managers: BTreeMap<String, Arc<ContextManager>>,
}

impl ContextPip {
    /// Build the routing table.
    ///
    /// # Errors
    ///
    /// `Config` if two managers share a provider name or claim the same context type.
    pub fn new(managers: impl IntoIterator<Item = ContextManager>) -> Result<Self, DomainError> {
        let mut owners = HashMap::new();
        let mut by_provider = BTreeMap::new();
        for manager in managers {
            let provider = manager.provider().to_owned();
            for context_type in manager.context_types() {
                if let Some(previous) = owners.insert(context_type.clone(), provider.clone()) {
                    return Err(DomainError::config(format!(
                        "context type '{context_type}' is served by both '{previous}' and '{provider}'"
                    )));
                }
            }
            if by_provider
                .insert(provider.clone(), Arc::new(manager))
                .is_some()
            {
                return Err(DomainError::config(format!(
                    "provider '{provider}' is configured twice"
                )));
            }
        }
        Ok(Self {
            owners,
            managers: by_provider,
        })
    }

    /// Resolve `specs` for the session.
    ///
    /// Redirect, consent and internal failures of a provider end the lookup.
    /// Types not delivered yet are collected across all providers and
    /// reported together as `CtxsNotFound`. Values come back in `specs` order.
    #[tracing::instrument(skip_all, fields(session = %session, requested = specs.len()))]
    pub async fn get_contexts(
        &self,
        session: &SessionId,
        specs: &[RequestedContextSpec],
    ) -> Result<Vec<ContextValue>, DomainError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_provider: BTreeMap<&str, Vec<RequestedContextSpec>> = BTreeMap::new();
        for spec in specs {
            let provider = self.owners.get(&spec.context_type).ok_or_else(|| {
                DomainError::config(format!(
                    "no provider serves context type '{}'",
                    spec.context_type
                ))
            })?;
            by_provider
                .entry(provider.as_str())
                .or_default()
                .push(spec.clone());
        }

        let mut found: HashMap<ContextType, ContextValue> = HashMap::new();
        let mut missing: Vec<ContextType> = Vec::new();
        for (provider, provider_specs) in by_provider {
            let Some(manager) = self.managers.get(provider) else {
                return Err(DomainError::config(format!("unknown provider '{provider}'")));
            };
            let lookup = manager.get(session, &provider_specs).await?;
            missing.extend(lookup.missing);
            found.extend(
                lookup
                    .values
                    .into_iter()
                    .map(|v| (v.context_type.clone(), v)),
            );
        }

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            tracing::debug!(?missing, "contexts not delivered yet");
            return Err(AccessError::CtxsNotFound {
                context_types: missing,
            }
            .into());
        }

        Ok(specs
            .iter()
            .filter_map(|spec| found.get(&spec.context_type).cloned())
            .collect())
    }

    pub fn agent(&self, provider: &str) -> Option<ContextAgent> {
        self.managers.get(provider).and_then(|m| m.agent())
    }
}
