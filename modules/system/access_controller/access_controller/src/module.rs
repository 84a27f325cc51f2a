//! Access controller bootstrap.

use std::collections::HashMap;
use std::sync::Arc;

use access_controller_sdk::{
    AccessControllerClient, AuthNAgent, CaepTransport, PdpClient, Repository, UmaClient,
};
use anyhow::{Context as _, anyhow, bail};
use tracing::info;

use crate::config::{AccessControllerConfig, ProviderConfig};
use crate::domain::context_manager::{
    CaepContextManager, CaepSettings, ContextManager, StaticContextManager,
};
use crate::domain::context_pip::ContextPip;
use crate::domain::login::LoginFlow;
use crate::domain::pip::Pip;
use crate::domain::store::JsonStore;
use crate::domain::subject_store::SubjectStore;
use crate::domain::{AccessControllerLocalClient, Controller};

pub const MODULE_NAME: &str = "access-controller";

/// Transport and consent client of one CAEP provider.
pub struct CaepCollaborators {
    pub transport: Arc<dyn CaepTransport>,
    pub uma: Arc<dyn UmaClient>,
}

/// External collaborators the controller is wired to.
pub struct Collaborators {
    pub repository: Arc<dyn Repository>,
    /// Identity agents by name: the primary one and each CAEP provider's.
    pub identity_agents: Vec<Arc<dyn AuthNAgent>>,
    /// Keyed by provider id.
    pub caep: HashMap<String, CaepCollaborators>,
    pub pdp: Arc<dyn PdpClient>,
}

/// Initialized access controller.
pub struct AccessControllerModule {
    controller: Arc<Controller>,
}

impl AccessControllerModule {
    /// The controller, for mounting login and push endpoints.
    #[must_use]
    pub fn controller(&self) -> Arc<Controller> {
        Arc::clone(&self.controller)
    }

    /// PEP-facing client.
    #[must_use]
    pub fn client(&self) -> Arc<dyn AccessControllerClient> {
        Arc::new(AccessControllerLocalClient::new(self.controller()))
    }
}

/// Build the controller from configuration.
///
/// # Errors
///
/// Fails if a configured identity agent or CAEP provider has no collaborator,
/// or if the provider set is inconsistent.
pub fn init(
    cfg: AccessControllerConfig,
    collaborators: Collaborators,
) -> anyhow::Result<AccessControllerModule> {
    info!("Initializing {MODULE_NAME} module");
    info!(
        primary_idp = %cfg.primary_idp,
        provider_count = cfg.providers.len(),
        "Loaded controller configuration"
    );

    let Collaborators {
        repository,
        identity_agents,
        mut caep,
        pdp,
    } = collaborators;
    let store = JsonStore::new(repository);
    let agents: HashMap<String, Arc<dyn AuthNAgent>> = identity_agents
        .into_iter()
        .map(|agent| (agent.name().to_owned(), agent))
        .collect();
    let agent = |idp: &str| {
        agents
            .get(idp)
            .cloned()
            .ok_or_else(|| anyhow!("no identity agent named '{idp}'"))
    };

    let primary = agent(&cfg.primary_idp).context("primary identity provider")?;
    let subjects = SubjectStore::new(store.clone(), cfg.primary_idp.clone(), [primary]);

    let mut managers = Vec::with_capacity(cfg.providers.len());
    for provider in cfg.providers {
        let manager = match provider {
            ProviderConfig::Caep(p) => {
                let CaepCollaborators { transport, uma } = caep
                    .remove(&p.id)
                    .ok_or_else(|| anyhow!("no CAEP transport for provider '{}'", p.id))?;
                let login = LoginFlow::for_context(
                    &p.id,
                    agent(&p.idp).with_context(|| format!("provider '{}'", p.id))?,
                    store.clone(),
                );
                info!(
                    provider = %p.id,
                    idp = %p.idp,
                    context_types = p.context_types.len(),
                    "CAEP provider configured"
                );
                let settings = CaepSettings {
                    provider: p.id,
                    idp: p.idp,
                    receiver_id: p.receiver_id,
                    delivery_endpoint: p.delivery_endpoint,
                    event_types: p.context_types,
                };
                let manager = CaepContextManager::new(settings, transport, uma, store.clone())?;
                ContextManager::Caep {
                    manager: Arc::new(manager),
                    login,
                }
            }
            ProviderConfig::Static(p) => {
                info!(
                    provider = %p.id,
                    context_types = p.values.len(),
                    "static provider configured"
                );
                ContextManager::Static(StaticContextManager::new(p.id, p.values))
            }
        };
        managers.push(manager);
    }
    if let Some(unused) = caep.keys().next() {
        bail!("CAEP transport given for unconfigured provider '{unused}'");
    }

    let contexts = ContextPip::new(managers)?;
    let controller = Arc::new(Controller::new(Pip::new(subjects, contexts), pdp));

    info!("{MODULE_NAME} module initialized successfully");
    Ok(AccessControllerModule { controller })
}
