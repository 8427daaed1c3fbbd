//! Admin mode and moderation against a mocked admin backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use warden_engine::{AdminSessionState, CredentialProvider, Moderation, RenewOutcome};
use warden_types::{AdminError, BanDuration, ValidationError};

use crate::common::{
    DEVICE_ID, founder_token, harness, mount_ok, mount_status, request_paths, token_for,
};

#[tokio::test]
async fn founder_enters_admin_mode_and_bans_a_user() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.verifier.push(true);

    Mock::given(method("POST"))
        .and(path("/api/admin/users/u1/ban"))
        .and(header("authorization", format!("Bearer {}", founder_token()).as_str()))
        .and(header("x-device-id", DEVICE_ID))
        .and(body_json(json!({"reason": "spam", "duration": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "banned"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let expires_at = h.control.session().enter().await.unwrap();
    assert_eq!(
        h.control.session().state(),
        AdminSessionState::Active { expires_at }
    );
    let remaining = h.control.session().remaining().unwrap();
    assert!(remaining > Duration::from_secs(14 * 60 + 50));
    assert!(remaining <= Duration::from_secs(15 * 60));

    assert!(h.control.gateway().ban("u1", "spam").await);
    assert_eq!(h.verifier.prompts(), vec!["enter admin mode", "ban user"]);
}

#[tokio::test]
async fn declined_step_up_sends_no_request() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.verifier.push(false);
    mount_ok(&h.server, "u1", "ban", json!({})).await;

    h.control.session().enter().await.unwrap();

    assert!(!h.control.gateway().ban("u1", "spam").await);
    assert!(request_paths(&h.server).await.is_empty());
    assert!(h.control.session().is_active());
}

#[tokio::test]
async fn non_founder_cannot_enter_admin_mode() {
    let h = harness(Some(token_for("someone", true))).await;
    h.verifier.push(true);

    let err = h.control.session().enter().await.unwrap_err();

    assert_eq!(err, AdminError::NotAuthorized);
    assert_eq!(err.user_message(), "Not authorized for admin access");
    assert!(h.verifier.prompts().is_empty());
    assert!(!h.control.session().is_active());
}

#[tokio::test]
async fn declined_renewal_ends_admin_mode() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.verifier.push(false);

    h.control.session().enter().await.unwrap();

    assert_eq!(h.control.session().renew().await, RenewOutcome::Ended);
    assert_eq!(h.control.session().state(), AdminSessionState::Inactive);
    assert_eq!(h.control.session().renew().await, RenewOutcome::NotActive);
}

#[tokio::test]
async fn server_error_is_reported_once() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    mount_status(&h.server, "u1", "shadowban", 500).await;

    let err = h
        .control
        .gateway()
        .execute("u1", Moderation::Shadowban { reason: "bots" })
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::RemoteExchangeFailed(_)));
    assert_eq!(
        request_paths(&h.server).await,
        vec!["/api/admin/users/u1/shadowban"]
    );
}

#[tokio::test]
async fn signed_out_credential_blocks_the_request() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.credentials.replace(None);
    assert!(h.credentials.token().is_none());

    let err = h
        .control
        .gateway()
        .execute("u1", Moderation::Unban)
        .await
        .unwrap_err();

    assert_eq!(err, AdminError::NotAuthenticated);
    assert_eq!(h.verifier.prompts(), vec!["unban user"]);
    assert!(request_paths(&h.server).await.is_empty());
}

#[tokio::test]
async fn reversals_and_timed_bans_hit_their_endpoints() {
    let h = harness(Some(founder_token())).await;
    for _ in 0..3 {
        h.verifier.push(true);
    }
    mount_ok(&h.server, "u1", "unban", json!({})).await;
    mount_ok(&h.server, "u1", "unshadowban", json!({})).await;
    Mock::given(method("POST"))
        .and(path("/api/admin/users/u1/ban"))
        .and(body_json(json!({"reason": "cool off", "duration": 48})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    assert!(h.control.gateway().unban("u1").await);
    assert!(h.control.gateway().unshadowban("u1").await);
    assert!(
        h.control
            .gateway()
            .ban_for("u1", "cool off", BanDuration::from_hours(48))
            .await
    );

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
    assert!(requests[1].body.is_empty());
    assert_eq!(
        h.verifier.prompts(),
        vec!["unban user", "unshadowban user", "ban user"]
    );
}

#[tokio::test]
async fn dot_segment_user_never_reaches_the_backend() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.verifier.push(true);

    let err = h
        .control
        .gateway()
        .execute(
            "..",
            Moderation::Ban {
                reason: "spam",
                duration: BanDuration::Permanent,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AdminError::ValidationFailed(ValidationError::DotSegmentUserId)
    );
    assert!(!h.control.gateway().unban(".").await);
    assert!(h.verifier.prompts().is_empty());
    assert!(request_paths(&h.server).await.is_empty());
}
