//! Context manager for a CAEP-streaming context provider.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use access_controller_sdk::{
    AccessError, CaepTransport, ContextType, ContextValue, CtxSubject, RequestedContextSpec,
    SessionId, StreamConfig, Subject, UmaClient,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ContextLookup;
use super::cache::ContextCache;
use super::enablement::Enablement;
use crate::domain::DomainError;
use crate::domain::store::{JsonStore, keys};

/// Session → provider-scoped subject binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct CtxSubjectBinding {
    pub subject: CtxSubject,
    /// Primary subject of the session when the binding was made.
    pub principal: Option<Subject>,
}

/// Static settings of one CAEP provider.
#[derive(Debug, Clone)]
pub struct CaepSettings {
    pub provider: String,
    /// Identity provider used to authenticate the provider-scoped subject.
    pub idp: String,
    pub receiver_id: String,
    pub delivery_endpoint: String,
    /// Context type → CAEP event type URI.
    pub event_types: BTreeMap<ContextType, String>,
}

/// Owns subject binding, stream configuration, UMA-gated enablement and
/// cached context values for one provider.
pub struct CaepContextManager {
    settings: CaepSettings,
    context_types: HashMap<String, ContextType>,
    caep: Arc<dyn CaepTransport>,
    uma: Arc<dyn UmaClient>,
    store: JsonStore,
    /// Last-known stream configuration; `None` until read from the provider.
    stream: RwLock<Option<StreamConfig>>,
    cache: ContextCache,
}

impl CaepContextManager {
    /// # Errors
    ///
    /// `Config` if two context types map to the same event type.
    pub fn new(
        settings: CaepSettings,
        caep: Arc<dyn CaepTransport>,
        uma: Arc<dyn UmaClient>,
        store: JsonStore,
    ) -> Result<Self, DomainError> {
        let mut context_types = HashMap::with_capacity(settings.event_types.len());
        for (context_type, event) in &settings.event_types {
            if let Some(previous) = context_types.insert(event.clone(), context_type.clone()) {
                return Err(DomainError::config(format!(
                    "event type '{event}' of provider '{}' is mapped to both '{previous}' and '{context_type}'",
                    settings.provider
                )));
            }
        }
        Ok(Self {
            settings,
            context_types,
            caep,
            uma,
            store,
            stream: RwLock::new(None),
            cache: ContextCache::new(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.settings.provider
    }

    pub fn idp(&self) -> &str {
        &self.settings.idp
    }

    pub fn context_types(&self) -> impl Iterator<Item = &ContextType> {
        self.settings.event_types.keys()
    }

    pub(super) fn store(&self) -> &JsonStore {
        &self.store
    }

    #[tracing::instrument(skip_all, fields(provider = %self.settings.provider, session = %session))]
    pub async fn get(
        &self,
        session: &SessionId,
        specs: &[RequestedContextSpec],
    ) -> Result<ContextLookup, DomainError> {
        let subject = self.ctx_subject(session).await?;

        let desired = specs
            .iter()
            .map(|spec| self.event_type(&spec.context_type).map(str::to_owned))
            .collect::<Result<BTreeSet<_>, _>>()?;
        self.ensure_stream(&desired).await?;

        Enablement {
            provider: &self.settings.provider,
            receiver_id: &self.settings.receiver_id,
            caep: self.caep.as_ref(),
            uma: self.uma.as_ref(),
            store: &self.store,
        }
        .ensure_enabled(&subject)
        .await?;

        let mut lookup = ContextLookup::default();
        for spec in specs {
            let value = self
                .cache
                .get_or_placeholder(&subject, &spec.context_type, &spec.scopes);
            if value.is_delivered() {
                lookup.values.push(value);
            } else {
                lookup.missing.push(spec.context_type.clone());
            }
        }
        tracing::debug!(
            found = lookup.values.len(),
            missing = lookup.missing.len(),
            "contexts resolved"
        );
        Ok(lookup)
    }

    /// Verify, decode and merge a pushed event.
    ///
    /// Returns the merged value, or `None` when the event type is not one this
    /// provider is configured for.
    #[tracing::instrument(skip_all, fields(provider = %self.settings.provider))]
    pub async fn recv_ctx(&self, body: &[u8]) -> Result<Option<ContextValue>, DomainError> {
        let event = self.caep.recv(body).await?;
        let Some(context_type) = self.context_types.get(&event.event_type) else {
            tracing::warn!(event_type = %event.event_type, "ignoring event of unconfigured type");
            return Ok(None);
        };
        let value = self
            .cache
            .merge(&event.subject, context_type, event.scopes, event.resource_id);
        tracing::debug!(
            subject = %event.subject,
            context_type = %context_type,
            "context merged"
        );
        Ok(Some(value))
    }

    pub(super) async fn bind_ctx_subject(
        &self,
        session: &SessionId,
        binding: &CtxSubjectBinding,
    ) -> Result<(), DomainError> {
        self.store
            .put(&keys::ctx_subject(&self.settings.provider, session), binding)
            .await
    }

    async fn ctx_subject(&self, session: &SessionId) -> Result<CtxSubject, DomainError> {
        let binding: Option<CtxSubjectBinding> = self
            .store
            .get(&keys::ctx_subject(&self.settings.provider, session))
            .await?;
        binding.map(|b| b.subject).ok_or_else(|| {
            AccessError::SubjectForCtxUnauthenticated {
                provider: self.settings.provider.clone(),
                agent: self.settings.idp.clone(),
            }
            .into()
        })
    }

    fn event_type(&self, context_type: &ContextType) -> Result<&str, DomainError> {
        self.settings
            .event_types
            .get(context_type)
            .map(String::as_str)
            .ok_or_else(|| {
                DomainError::config(format!(
                    "context type '{context_type}' is not served by provider '{}'",
                    self.settings.provider
                ))
            })
    }

    /// Reconcile `desired` event types with the last-known stream configuration.
    ///
    /// The merge only ever adds event types; the provider is called only when
    /// the union differs from what it already has.
    async fn ensure_stream(&self, desired: &BTreeSet<String>) -> Result<(), DomainError> {
        {
            let known = self.stream.read().await;
            if known
                .as_ref()
                .is_some_and(|c| desired.is_subset(&c.events_requested))
            {
                return Ok(());
            }
        }

        let mut known = self.stream.write().await;
        let current = match known.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = self.caep.read_stream_config().await?;
                *known = Some(config.clone());
                config
            }
        };

        if let Some(mut merged) = current.merged_with(desired) {
            merged.receiver_id.clone_from(&self.settings.receiver_id);
            merged.delivery_endpoint.clone_from(&self.settings.delivery_endpoint);
            let accepted = self.caep.set_up_stream(&merged).await?;
            tracing::info!(
                events = accepted.events_requested.len(),
                "stream configuration updated"
            );
            *known = Some(accepted);
        }
        Ok(())
    }
}
