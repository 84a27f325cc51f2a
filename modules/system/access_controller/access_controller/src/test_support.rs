#![allow(clippy::unwrap_used, clippy::expect_used)]

//! In-process fakes of every collaborator, and a wired-up harness.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use access_controller_sdk::{
    AccessControllerClient, Action, AddSubjectRequest, AddSubjectResponse, AuthNAgent, AuthNError,
    CaepError, CaepEvent, CaepTransport, CallbackRequest, ContextRequirement, ContextType,
    ContextValue, CtxSubject, Decision, PdpClient, PdpError, PermissionTicket, RedirectTarget,
    RequestedContextSpec, Resource, Rpt, RptError, SessionId, StreamConfig, StreamStatus, Subject,
    SubjectStatus, UmaChallenge, UmaClient, UmaError, VerifiedIdentity,
};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::{AccessControllerConfig, CaepProviderConfig, ProviderConfig};
use crate::domain::Controller;
use crate::domain::context_manager::CaepSettings;
use crate::infra::InMemoryRepository;
use crate::module::{self, CaepCollaborators, Collaborators};

pub const POSTURE_CONTEXT: &str = "device-posture";
pub const POSTURE_EVENT: &str = "https://schemas.example/caep/device-posture";

/// Settings of the `cap` provider serving `device-posture`.
#[must_use]
pub fn posture_settings() -> CaepSettings {
    CaepSettings {
        provider: "cap".to_owned(),
        idp: "cap-idp".to_owned(),
        receiver_id: "receiver-1".to_owned(),
        delivery_endpoint: "https://controller.example/caep/cap".to_owned(),
        event_types: BTreeMap::from([(
            ContextType::new(POSTURE_CONTEXT),
            POSTURE_EVENT.to_owned(),
        )]),
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

/// Identity provider with a fixed code → identity table.
pub struct FakeAuthNAgent {
    name: String,
    issuer: String,
    codes: Mutex<HashMap<String, VerifiedIdentity>>,
    unavailable: Mutex<bool>,
    exchanges: Mutex<usize>,
}

impl FakeAuthNAgent {
    #[must_use]
    pub fn new(name: &str, issuer: &str) -> Self {
        Self {
            name: name.to_owned(),
            issuer: issuer.to_owned(),
            codes: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
            exchanges: Mutex::new(0),
        }
    }

    pub fn accept_code(&self, code: &str, subject: &str, device: Option<&str>) {
        self.codes.lock().insert(
            code.to_owned(),
            VerifiedIdentity {
                issuer: self.issuer.clone(),
                subject: subject.to_owned(),
                device: device.map(str::to_owned),
            },
        );
    }

    pub fn make_unavailable(&self) {
        *self.unavailable.lock() = true;
    }

    /// Number of code exchanges attempted.
    #[must_use]
    pub fn exchanges(&self) -> usize {
        *self.exchanges.lock()
    }
}

#[async_trait]
impl AuthNAgent for FakeAuthNAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn login_redirect(&self, state: &str) -> Result<RedirectTarget, AuthNError> {
        Ok(RedirectTarget {
            url: format!("{}/authorize?state={state}", self.issuer),
            state: state.to_owned(),
        })
    }

    async fn exchange_code(
        &self,
        request: &CallbackRequest,
    ) -> Result<VerifiedIdentity, AuthNError> {
        *self.exchanges.lock() += 1;
        if *self.unavailable.lock() {
            return Err(AuthNError::Unavailable("token endpoint down".to_owned()));
        }
        self.codes
            .lock()
            .get(&request.code)
            .cloned()
            .ok_or_else(|| AuthNError::Rejected(format!("unknown code '{}'", request.code)))
    }
}

// ---------------------------------------------------------------------------
// CAEP transmitter
// ---------------------------------------------------------------------------

/// Calls received by [`FakeCaep`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaepCalls {
    pub config_reads: usize,
    pub stream_updates: usize,
    pub status_reads: usize,
    pub add_subject: usize,
}

struct CaepState {
    status: SubjectStatus,
    stream: StreamConfig,
    script: VecDeque<AddSubjectResponse>,
    always: Option<UmaChallenge>,
    presented: Vec<Option<String>>,
    calls: CaepCalls,
}

/// CAEP transmitter with a single subject status and scriptable `add_subject`.
///
/// `add_subject` answers from the script, then `Added`. Every `Added` flips
/// the status to `Enabled`.
pub struct FakeCaep {
    state: Mutex<CaepState>,
}

impl Default for FakeCaep {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCaep {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CaepState {
                status: SubjectStatus::Disabled,
                stream: StreamConfig {
                    receiver_id: "receiver-1".to_owned(),
                    delivery_endpoint: "https://controller.example/caep/cap".to_owned(),
                    events_requested: Default::default(),
                },
                script: VecDeque::new(),
                always: None,
                presented: Vec::new(),
                calls: CaepCalls::default(),
            }),
        }
    }

    pub fn set_status(&self, status: SubjectStatus) {
        self.state.lock().status = status;
    }

    pub fn preset_stream_events<const N: usize>(&self, events: [&str; N]) {
        self.state
            .lock()
            .stream
            .events_requested
            .extend(events.iter().map(|e| (*e).to_owned()));
    }

    pub fn script_add_subject(&self, responses: impl IntoIterator<Item = AddSubjectResponse>) {
        self.state.lock().script.extend(responses);
    }

    /// Answer every `add_subject` with a 401 carrying `challenge`.
    pub fn always_unauthorized(&self, challenge: &str) {
        self.state.lock().always = Some(UmaChallenge(challenge.to_owned()));
    }

    #[must_use]
    pub fn calls(&self) -> CaepCalls {
        self.state.lock().calls
    }

    /// Current stream configuration on the transmitter.
    #[must_use]
    pub fn stream(&self) -> StreamConfig {
        self.state.lock().stream.clone()
    }

    /// RPT presented with each `add_subject`, in call order.
    #[must_use]
    pub fn presented_rpts(&self) -> Vec<Option<String>> {
        self.state.lock().presented.clone()
    }

    /// Wire form accepted by [`CaepTransport::recv`].
    #[must_use]
    pub fn encode_event(&self, event: &CaepEvent) -> Vec<u8> {
        serde_json::to_vec(event).expect("event serializes")
    }
}

#[async_trait]
impl CaepTransport for FakeCaep {
    async fn read_stream_config(&self) -> Result<StreamConfig, CaepError> {
        let mut state = self.state.lock();
        state.calls.config_reads += 1;
        Ok(state.stream.clone())
    }

    async fn set_up_stream(&self, config: &StreamConfig) -> Result<StreamConfig, CaepError> {
        let mut state = self.state.lock();
        state.calls.stream_updates += 1;
        state.stream = config.clone();
        Ok(config.clone())
    }

    async fn read_stream_status(&self, subject: &CtxSubject) -> Result<StreamStatus, CaepError> {
        let mut state = self.state.lock();
        state.calls.status_reads += 1;
        Ok(StreamStatus {
            receiver_id: state.stream.receiver_id.clone(),
            subject: subject.clone(),
            status: state.status,
            events: BTreeMap::new(),
        })
    }

    async fn add_subject(
        &self,
        _request: &AddSubjectRequest,
        rpt: Option<&Rpt>,
    ) -> Result<AddSubjectResponse, CaepError> {
        let mut state = self.state.lock();
        state.calls.add_subject += 1;
        state.presented.push(rpt.map(|r| r.expose().to_owned()));
        let response = match state.always.clone() {
            Some(challenge) => AddSubjectResponse::Unauthorized(challenge),
            None => state
                .script
                .pop_front()
                .unwrap_or(AddSubjectResponse::Added),
        };
        if response == AddSubjectResponse::Added {
            state.status = SubjectStatus::Enabled;
        }
        Ok(response)
    }

    async fn recv(&self, body: &[u8]) -> Result<CaepEvent, CaepError> {
        serde_json::from_slice(body).map_err(|e| CaepError::InvalidEvent(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// UMA authorization server
// ---------------------------------------------------------------------------

/// Calls received by [`FakeUma`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UmaCalls {
    pub extractions: usize,
    pub rpt_requests: usize,
}

enum RptOutcome {
    Granted(String),
    Pending,
    Failed(String),
}

/// UMA authorization server. Answers RPT requests with `Pending` until told otherwise.
pub struct FakeUma {
    outcome: Mutex<RptOutcome>,
    tickets: Mutex<Vec<PermissionTicket>>,
    calls: Mutex<UmaCalls>,
}

impl Default for FakeUma {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeUma {
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(RptOutcome::Pending),
            tickets: Mutex::new(Vec::new()),
            calls: Mutex::new(UmaCalls::default()),
        }
    }

    pub fn grant_rpt(&self, token: &str) {
        *self.outcome.lock() = RptOutcome::Granted(token.to_owned());
    }

    pub fn pend_rpt(&self) {
        *self.outcome.lock() = RptOutcome::Pending;
    }

    pub fn fail_rpt(&self, reason: &str) {
        *self.outcome.lock() = RptOutcome::Failed(reason.to_owned());
    }

    #[must_use]
    pub fn calls(&self) -> UmaCalls {
        *self.calls.lock()
    }

    /// Tickets presented with RPT requests, in call order.
    #[must_use]
    pub fn tickets(&self) -> Vec<PermissionTicket> {
        self.tickets.lock().clone()
    }
}

#[async_trait]
impl UmaClient for FakeUma {
    fn extract_permission_ticket(
        &self,
        challenge: &UmaChallenge,
    ) -> Result<PermissionTicket, UmaError> {
        self.calls.lock().extractions += 1;
        challenge
            .0
            .split_once("ticket=\"")
            .and_then(|(_, rest)| rest.split_once('"'))
            .map(|(ticket, _)| PermissionTicket::new(ticket))
            .ok_or_else(|| UmaError::MissingTicket(challenge.0.clone()))
    }

    async fn request_rpt(&self, ticket: &PermissionTicket) -> Result<Rpt, RptError> {
        self.calls.lock().rpt_requests += 1;
        self.tickets.lock().push(ticket.clone());
        match &*self.outcome.lock() {
            RptOutcome::Granted(token) => Ok(Rpt::new(token.clone())),
            RptOutcome::Pending => Err(RptError::Pending),
            RptOutcome::Failed(reason) => Err(UmaError::Transport(reason.clone()).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// PDP
// ---------------------------------------------------------------------------

/// Calls received by [`FakePdp`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PdpCalls {
    pub notifications: usize,
    pub decisions: usize,
}

enum DecisionRule {
    Allow,
    ScopeIn { scope: String, accepted: Vec<String> },
}

/// PDP with one fixed requirement and one decision rule.
pub struct FakePdp {
    requirement: ContextRequirement,
    rule: DecisionRule,
    calls: Mutex<PdpCalls>,
    seen: Mutex<Vec<ContextValue>>,
}

impl FakePdp {
    fn with(requirement: ContextRequirement, rule: DecisionRule) -> Self {
        Self {
            requirement,
            rule,
            calls: Mutex::new(PdpCalls::default()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Requires nothing and allows everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::with(ContextRequirement::Require(Vec::new()), DecisionRule::Allow)
    }

    /// Denies every request before any context is fetched.
    #[must_use]
    pub fn fast_deny(reason: &str) -> Self {
        Self::with(
            ContextRequirement::Deny {
                reason: Some(reason.to_owned()),
            },
            DecisionRule::Allow,
        )
    }

    /// Requires `specs` and allows only when some context carries `scope`
    /// with one of `accepted`.
    #[must_use]
    pub fn requiring(specs: Vec<RequestedContextSpec>, scope: &str, accepted: &[&str]) -> Self {
        Self::with(
            ContextRequirement::Require(specs),
            DecisionRule::ScopeIn {
                scope: scope.to_owned(),
                accepted: accepted.iter().map(|a| (*a).to_owned()).collect(),
            },
        )
    }

    /// Requires `device-posture/risk` and allows only `low`.
    #[must_use]
    pub fn low_risk_only() -> Self {
        Self::requiring(
            vec![RequestedContextSpec::new(POSTURE_CONTEXT, ["risk"])],
            "risk",
            &["low"],
        )
    }

    #[must_use]
    pub fn calls(&self) -> PdpCalls {
        *self.calls.lock()
    }

    /// Contexts passed to the last `decision`.
    #[must_use]
    pub fn last_contexts(&self) -> Vec<ContextValue> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl PdpClient for FakePdp {
    fn notified_of_request(
        &self,
        _subject: &Subject,
        _resource: &Resource,
        _action: &Action,
    ) -> Result<ContextRequirement, PdpError> {
        self.calls.lock().notifications += 1;
        Ok(self.requirement.clone())
    }

    async fn decision(
        &self,
        _subject: &Subject,
        _resource: &Resource,
        _action: &Action,
        contexts: &[ContextValue],
    ) -> Result<Decision, PdpError> {
        self.calls.lock().decisions += 1;
        *self.seen.lock() = contexts.to_vec();
        Ok(match &self.rule {
            DecisionRule::Allow => Decision::allow(),
            DecisionRule::ScopeIn { scope, accepted } => {
                let matched = contexts.iter().any(|c| {
                    c.get_str(scope)
                        .is_some_and(|v| accepted.iter().any(|a| a == v))
                });
                if matched {
                    Decision::allow()
                } else {
                    Decision::deny(format!("{scope} not acceptable"))
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Controller wired to a primary IdP `corp`, the `cap` CAEP provider behind
/// `cap-idp`, and the given PDP.
pub struct AppHarness {
    pub client: Arc<dyn AccessControllerClient>,
    pub controller: Arc<Controller>,
    pub corp: Arc<FakeAuthNAgent>,
    pub cap_idp: Arc<FakeAuthNAgent>,
    pub caep: Arc<FakeCaep>,
    pub uma: Arc<FakeUma>,
    pub pdp: Arc<FakePdp>,
}

impl AppHarness {
    #[must_use]
    pub fn new(pdp: FakePdp) -> Self {
        Self::with_providers(pdp, Vec::new())
    }

    /// As [`AppHarness::new`] plus extra providers next to `cap`.
    #[must_use]
    pub fn with_providers(pdp: FakePdp, extra: Vec<ProviderConfig>) -> Self {
        let settings = posture_settings();
        let mut providers = vec![ProviderConfig::Caep(CaepProviderConfig {
            id: settings.provider.clone(),
            idp: settings.idp.clone(),
            receiver_id: settings.receiver_id,
            delivery_endpoint: settings.delivery_endpoint,
            context_types: settings.event_types,
        })];
        providers.extend(extra);
        let cfg = AccessControllerConfig {
            primary_idp: "corp".to_owned(),
            providers,
        };

        let corp = Arc::new(FakeAuthNAgent::new("corp", "https://corp"));
        let cap_idp = Arc::new(FakeAuthNAgent::new("cap-idp", "https://cap"));
        let caep = Arc::new(FakeCaep::new());
        let uma = Arc::new(FakeUma::new());
        let pdp = Arc::new(pdp);

        let module = module::init(
            cfg,
            Collaborators {
                repository: Arc::new(InMemoryRepository::new()),
                identity_agents: vec![corp.clone() as Arc<dyn AuthNAgent>, cap_idp.clone()],
                caep: HashMap::from([(
                    settings.provider,
                    CaepCollaborators {
                        transport: caep.clone(),
                        uma: uma.clone(),
                    },
                )]),
                pdp: pdp.clone(),
            },
        )
        .expect("harness wiring is valid");

        Self {
            client: module.client(),
            controller: module.controller(),
            corp,
            cap_idp,
            caep,
            uma,
            pdp,
        }
    }

    /// Log `subject` in with the primary IdP.
    pub async fn login(&self, session: &SessionId, subject: &str) {
        let code = format!("corp-{subject}");
        self.corp.accept_code(&code, subject, None);
        let agent = self.controller.sub_agent("corp").expect("primary agent");
        let target = agent.redirect(session).await.expect("redirect");
        agent
            .callback(
                session,
                &CallbackRequest {
                    code,
                    state: target.state,
                },
            )
            .await
            .expect("primary login");
    }

    /// Log `subject` in with the `cap` provider's IdP.
    pub async fn login_ctx(&self, session: &SessionId, subject: &str) {
        let code = format!("cap-{subject}");
        self.cap_idp.accept_code(&code, subject, None);
        let agent = self.controller.ctx_agent("cap").expect("cap agent");
        let target = agent.redirect(session).await.expect("redirect");
        agent
            .callback(
                session,
                &CallbackRequest {
                    code,
                    state: target.state,
                },
            )
            .await
            .expect("context login");
    }

    /// Push a `device-posture` event for `subject`.
    pub async fn push_posture(&self, subject: &str, scopes: &[(&str, &str)]) {
        let body = self.caep.encode_event(&CaepEvent {
            event_type: POSTURE_EVENT.to_owned(),
            subject: CtxSubject::new(subject),
            scopes: scopes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), serde_json::json!(v)))
                .collect(),
            resource_id: None,
        });
        self.controller
            .ctx_agent("cap")
            .expect("cap agent")
            .recv_ctx(&body)
            .await
            .expect("event accepted");
    }
}
