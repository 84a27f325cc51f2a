//! Subject enablement at a context provider, gated by UMA consent.
//!
//! ```text
//! ReadStatus ──enabled──────────────────────────────────────────▶ done
//!     │ not enabled
//!     ▼
//! AddSubject(cached rpt?) ──added────────────────────────────────▶ done
//!     │ 401 + ticket
//!     ▼
//! NeedsDelegatedGrant ──rpt pending─────────────▶ ReqSubmitted
//!     │ rpt granted
//!     ▼
//! RetryWithRpt ──added──▶ done      ──401──▶ ReqSubmitted
//! ```
//!
//! Every transition moves forward, so one call performs at most one status
//! read, two `add_subject` calls, one ticket extraction and one RPT request.

use access_controller_sdk::{
    AccessError, AddSubjectRequest, AddSubjectResponse, CaepTransport, CtxSubject,
    PermissionTicket, Rpt, RptError, UmaChallenge, UmaClient,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::store::{JsonStore, keys};

/// UMA artifacts persisted per (provider, subject).
#[derive(Debug, Default, Serialize, Deserialize)]
struct UmaGrantState {
    /// Latest ticket; a new one supersedes the previous.
    ticket: Option<PermissionTicket>,
    /// Cached RPT, reused until the provider rejects it.
    rpt: Option<String>,
}

impl UmaGrantState {
    fn rpt(&self) -> Option<Rpt> {
        self.rpt.as_deref().map(Rpt::new)
    }
}

enum Step {
    ReadStatus,
    AddSubject { rpt: Option<Rpt> },
    NeedsDelegatedGrant { challenge: UmaChallenge },
    RetryWithRpt { rpt: Rpt },
}

pub(super) struct Enablement<'a> {
    pub provider: &'a str,
    pub receiver_id: &'a str,
    pub caep: &'a dyn CaepTransport,
    pub uma: &'a dyn UmaClient,
    pub store: &'a JsonStore,
}

impl Enablement<'_> {
    /// Make sure `subject` is enabled on the provider's stream.
    #[tracing::instrument(skip_all, fields(provider = self.provider, subject = %subject))]
    pub async fn ensure_enabled(&self, subject: &CtxSubject) -> Result<(), DomainError> {
        let key = keys::uma_grant(self.provider, subject);
        let mut grant: UmaGrantState = self.store.get(&key).await?.unwrap_or_default();
        let request = AddSubjectRequest {
            receiver_id: self.receiver_id.to_owned(),
            subject: subject.clone(),
            verified: true,
        };

        let mut step = Step::ReadStatus;
        loop {
            step = match step {
                Step::ReadStatus => {
                    let status = self.caep.read_stream_status(subject).await?;
                    if status.is_enabled() {
                        tracing::debug!("subject already enabled");
                        return Ok(());
                    }
                    tracing::debug!(status = ?status.status, "subject not enabled, adding");
                    Step::AddSubject { rpt: grant.rpt() }
                }
                Step::AddSubject { rpt } => {
                    match self.caep.add_subject(&request, rpt.as_ref()).await? {
                        AddSubjectResponse::Added => {
                            tracing::info!("subject added to stream");
                            return Ok(());
                        }
                        AddSubjectResponse::Unauthorized(challenge) => {
                            Step::NeedsDelegatedGrant { challenge }
                        }
                    }
                }
                Step::NeedsDelegatedGrant { challenge } => {
                    // Any cached RPT was just refused.
                    grant.rpt = None;
                    let ticket = self.uma.extract_permission_ticket(&challenge)?;
                    grant.ticket = Some(ticket.clone());
                    self.store.put(&key, &grant).await?;

                    match self.uma.request_rpt(&ticket).await {
                        Ok(rpt) => {
                            grant.ticket = None;
                            grant.rpt = Some(rpt.expose().to_owned());
                            self.store.put(&key, &grant).await?;
                            tracing::debug!("rpt granted, retrying add_subject once");
                            Step::RetryWithRpt { rpt }
                        }
                        Err(RptError::Pending) => {
                            tracing::info!("consent requested from resource owner");
                            return Err(self.request_submitted());
                        }
                        Err(RptError::Failed(e)) => return Err(e.into()),
                    }
                }
                Step::RetryWithRpt { rpt } => {
                    return match self.caep.add_subject(&request, Some(&rpt)).await? {
                        AddSubjectResponse::Added => {
                            tracing::info!("subject added to stream with rpt");
                            Ok(())
                        }
                        AddSubjectResponse::Unauthorized(_) => {
                            grant.rpt = None;
                            self.store.put(&key, &grant).await?;
                            tracing::info!("rpt not accepted yet, consent still pending");
                            Err(self.request_submitted())
                        }
                    };
                }
            };
        }
    }

    fn request_submitted(&self) -> DomainError {
        AccessError::SubjectForCtxUnauthorizedButReqSubmitted {
            provider: self.provider.to_owned(),
        }
        .into()
    }
}
