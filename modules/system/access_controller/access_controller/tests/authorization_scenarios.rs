use std::collections::BTreeMap;

use access_controller::config::{ProviderConfig, StaticProviderConfig};
use access_controller::test_support::{AppHarness, CaepCalls, FakePdp, POSTURE_CONTEXT};
use access_controller_sdk::pep::{PepOutcome, PolicyEnforcer};
use access_controller_sdk::{
    AccessControllerClient, AccessError, Action, AddSubjectResponse, CallbackRequest, ContextType,
    RequestedContextSpec, Resource, SessionId, SubjectStatus, UmaChallenge,
};

fn report() -> Resource {
    Resource::new("documents.report").with_id("q3")
}

fn read() -> Action {
    Action::new("read")
}

async fn ask(h: &AppHarness, session: &SessionId) -> Result<(), AccessError> {
    h.client.ask_for_authorization(session, &report(), &read()).await
}

/// Primary and `cap` logins done for `alice`, subject already enabled on the stream.
async fn enrolled(pdp: FakePdp) -> (AppHarness, SessionId) {
    let h = AppHarness::new(pdp);
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.login_ctx(&session, "alice").await;
    h.caep.set_status(SubjectStatus::Enabled);
    (h, session)
}

#[tokio::test]
async fn unauthenticated_session_is_redirected_before_pdp() {
    let h = AppHarness::new(FakePdp::low_risk_only());

    let err = ask(&h, &SessionId::new("anonymous")).await.unwrap_err();

    assert_eq!(
        err,
        AccessError::SubjectNotAuthenticated {
            agent: Some("corp".to_owned())
        }
    );
    assert_eq!(h.pdp.calls().notifications, 0);
    assert_eq!(h.pdp.calls().decisions, 0);
}

#[tokio::test]
async fn fast_deny_skips_context_lookup() {
    let h = AppHarness::new(FakePdp::fast_deny("outside business hours"));
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;

    let err = ask(&h, &session).await.unwrap_err();

    assert_eq!(
        err,
        AccessError::RequestDenied {
            reason: Some("outside business hours".to_owned())
        }
    );
    assert_eq!(h.caep.calls(), CaepCalls::default());
    assert_eq!(h.pdp.calls().decisions, 0);
}

#[tokio::test]
async fn missing_context_login_redirects_to_provider_idp() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;

    let err = ask(&h, &session).await.unwrap_err();

    assert_eq!(
        err,
        AccessError::SubjectForCtxUnauthenticated {
            provider: "cap".to_owned(),
            agent: "cap-idp".to_owned(),
        }
    );
    assert_eq!(h.pdp.calls().decisions, 0);
}

#[tokio::test]
async fn undelivered_context_asks_to_retry_not_deny() {
    let (h, session) = enrolled(FakePdp::low_risk_only()).await;

    for _ in 0..2 {
        let err = ask(&h, &session).await.unwrap_err();
        assert_eq!(
            err,
            AccessError::CtxsNotFound {
                context_types: vec![ContextType::new(POSTURE_CONTEXT)]
            }
        );
        assert!(err.is_transient());
    }
    assert_eq!(h.pdp.calls().decisions, 0);
}

#[tokio::test]
async fn pushed_context_reaches_the_decision() {
    let (h, session) = enrolled(FakePdp::low_risk_only()).await;
    assert!(ask(&h, &session).await.is_err());

    h.push_posture("alice", &[("risk", "low")]).await;

    ask(&h, &session).await.unwrap();
    let seen = h.pdp.last_contexts();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get_str("risk"), Some("low"));
}

#[tokio::test]
async fn later_push_overrides_earlier_value() {
    let (h, session) = enrolled(FakePdp::low_risk_only()).await;
    h.push_posture("alice", &[("risk", "low")]).await;
    ask(&h, &session).await.unwrap();

    h.push_posture("alice", &[("risk", "high")]).await;

    let err = ask(&h, &session).await.unwrap_err();
    assert!(matches!(err, AccessError::RequestDenied { .. }));
}

#[tokio::test]
async fn enabled_subject_needs_no_consent() {
    let (h, session) = enrolled(FakePdp::low_risk_only()).await;
    h.push_posture("alice", &[("risk", "low")]).await;

    ask(&h, &session).await.unwrap();

    assert_eq!(h.caep.calls().add_subject, 0);
    assert_eq!(h.uma.calls().extractions, 0);
    assert_eq!(h.uma.calls().rpt_requests, 0);
}

#[tokio::test]
async fn consent_granted_in_band_enables_subject() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.login_ctx(&session, "alice").await;
    h.caep.script_add_subject([
        AddSubjectResponse::Unauthorized(UmaChallenge("UMA ticket=\"t-1\"".to_owned())),
        AddSubjectResponse::Added,
    ]);
    h.uma.grant_rpt("rpt-1");
    h.push_posture("alice", &[("risk", "low")]).await;

    ask(&h, &session).await.unwrap();

    assert_eq!(h.caep.calls().add_subject, 2);
    assert_eq!(
        h.caep.presented_rpts(),
        vec![None, Some("rpt-1".to_owned())]
    );
    assert_eq!(h.uma.tickets()[0].as_str(), "t-1");
}

#[tokio::test]
async fn pending_consent_makes_progress_once_approved() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.login_ctx(&session, "alice").await;
    h.caep.script_add_subject([AddSubjectResponse::Unauthorized(UmaChallenge(
        "UMA ticket=\"t-1\"".to_owned(),
    ))]);
    h.uma.pend_rpt();

    let err = ask(&h, &session).await.unwrap_err();
    assert_eq!(
        err,
        AccessError::SubjectForCtxUnauthorizedButReqSubmitted {
            provider: "cap".to_owned()
        }
    );

    // Resource owner approved; the provider now accepts the subject.
    let err = ask(&h, &session).await.unwrap_err();
    assert!(matches!(err, AccessError::CtxsNotFound { .. }));
    assert_eq!(h.caep.calls().add_subject, 2);
}

#[tokio::test]
async fn consent_retry_is_bounded() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.login_ctx(&session, "alice").await;
    h.caep.always_unauthorized("UMA ticket=\"t-1\"");
    h.uma.grant_rpt("rpt-not-yet-valid");

    let err = ask(&h, &session).await.unwrap_err();

    assert!(matches!(
        err,
        AccessError::SubjectForCtxUnauthorizedButReqSubmitted { .. }
    ));
    assert_eq!(h.caep.calls().add_subject, 2);
    assert_eq!(h.uma.calls().extractions, 1);
    assert_eq!(h.uma.calls().rpt_requests, 1);
}

#[tokio::test]
async fn authorization_server_failure_is_internal() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.login_ctx(&session, "alice").await;
    h.caep.always_unauthorized("UMA ticket=\"t-1\"");
    h.uma.fail_rpt("connection refused");

    let err = ask(&h, &session).await.unwrap_err();

    assert!(matches!(err, AccessError::Internal(_)));
}

#[tokio::test]
async fn static_provider_needs_no_context_login() {
    let pdp = FakePdp::requiring(
        vec![RequestedContextSpec::new("network", ["zone"])],
        "zone",
        &["corp"],
    );
    let office = ProviderConfig::Static(StaticProviderConfig {
        id: "office".to_owned(),
        values: BTreeMap::from([(
            ContextType::new("network"),
            BTreeMap::from([("zone".to_owned(), serde_json::json!("corp"))]),
        )]),
    });
    let h = AppHarness::with_providers(pdp, vec![office]);
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;

    ask(&h, &session).await.unwrap();

    assert_eq!(h.caep.calls(), CaepCalls::default());
}

#[tokio::test]
async fn enforcer_maps_outcomes_for_the_transport() {
    let (h, session) = enrolled(FakePdp::low_risk_only()).await;
    let enforcer = PolicyEnforcer::new(h.client.clone());

    assert_eq!(
        enforcer
            .enforce(&SessionId::new("anonymous"), &report(), &read())
            .await,
        PepOutcome::Redirect {
            agent: Some("corp".to_owned())
        }
    );
    assert_eq!(
        enforcer.enforce(&session, &report(), &read()).await,
        PepOutcome::RetryShortly
    );

    h.push_posture("alice", &[("risk", "low")]).await;
    assert_eq!(
        enforcer.enforce(&session, &report(), &read()).await,
        PepOutcome::Allow
    );
}

#[tokio::test]
async fn context_login_rejects_forged_state() {
    let h = AppHarness::new(FakePdp::low_risk_only());
    let session = SessionId::new("s-1");
    h.login(&session, "alice").await;
    h.cap_idp.accept_code("cap-code", "alice", None);
    let agent = h.controller.ctx_agent("cap").unwrap();
    agent.redirect(&session).await.unwrap();

    let err = agent
        .callback(
            &session,
            &CallbackRequest {
                code: "cap-code".to_owned(),
                state: "forged".to_owned(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AccessError::SubjectForCtxUnauthenticated { .. }
    ));
    assert_eq!(h.cap_idp.exchanges(), 0);
}

#[tokio::test]
async fn unavailable_identity_provider_is_internal() {
    let h = AppHarness::new(FakePdp::allow_all());
    let session = SessionId::new("s-1");
    h.corp.make_unavailable();
    let agent = h.controller.sub_agent("corp").unwrap();
    let target = agent.redirect(&session).await.unwrap();

    let err = agent
        .callback(
            &session,
            &CallbackRequest {
                code: "any".to_owned(),
                state: target.state,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AccessError::Internal(_)));
    assert!(matches!(
        ask(&h, &session).await,
        Err(AccessError::SubjectNotAuthenticated { .. })
    ));
}
