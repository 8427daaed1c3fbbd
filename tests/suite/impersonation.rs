//! Two-factor impersonation against a mocked admin backend.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use warden_engine::IMPERSONATION_TTL;
use warden_types::{AdminError, Password, ValidationError};

use crate::common::{DEVICE_ID, founder_token, harness, mount_ok, mount_status, request_paths};

const REASON: &str = "reviewing reported checkout bug";

#[tokio::test]
async fn impersonation_exchange_starts_session_and_end_notifies_backend() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);

    Mock::given(method("POST"))
        .and(path("/api/admin/users/u7/impersonate"))
        .and(header("x-device-id", DEVICE_ID))
        .and(body_json(json!({"reason": REASON, "password": "s3cret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"impersonation_token": "imp-xyz"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/users/u7/end-impersonation"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let session = h
        .control
        .gateway()
        .impersonate("u7", REASON, &Password::new("s3cret"))
        .await
        .unwrap();

    assert_eq!(session.token().expose(), "imp-xyz");
    assert_eq!(session.expires_at() - session.started_at(), IMPERSONATION_TTL);
    assert_eq!(h.control.impersonation().current(), Some(session.clone()));

    assert!(h.control.impersonation().end(&session).await);
    assert!(!h.control.impersonation().end(&session).await);
    assert!(h.control.impersonation().current().is_none());
    assert_eq!(h.verifier.prompts(), vec!["impersonate — step 1"]);

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[1].body.is_empty());
}

#[tokio::test]
async fn short_reason_is_rejected_locally() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);

    let err = h
        .control
        .gateway()
        .impersonate("u7", "too short", &Password::new("s3cret"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AdminError::ValidationFailed(ValidationError::ReasonTooShort { min: 20, actual: 9 })
    );
    assert_eq!(err.user_message(), "Reason must be at least 20 characters");
    assert!(h.verifier.prompts().is_empty());
    assert!(request_paths(&h.server).await.is_empty());
}

#[tokio::test]
async fn rejected_password_fails_the_exchange() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    mount_status(&h.server, "u7", "impersonate", 401).await;

    let err = h
        .control
        .gateway()
        .impersonate("u7", REASON, &Password::new("wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::RemoteExchangeFailed(_)));
    assert!(!h.control.impersonation().is_active());
}

#[tokio::test]
async fn response_without_token_fails_the_exchange() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    mount_ok(&h.server, "u7", "impersonate", json!({"ok": true})).await;

    let err = h
        .control
        .gateway()
        .impersonate("u7", REASON, &Password::new("s3cret"))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::RemoteExchangeFailed(_)));
    assert!(!h.control.impersonation().is_active());
}

#[tokio::test]
async fn failed_end_notification_still_ends_locally() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    mount_ok(
        &h.server,
        "u7",
        "impersonate",
        json!({"impersonation_token": "imp-xyz"}),
    )
    .await;
    mount_status(&h.server, "u7", "end-impersonation", 502).await;

    h.control
        .gateway()
        .impersonate("u7", REASON, &Password::new("s3cret"))
        .await
        .unwrap();

    assert!(h.control.gateway().end_impersonation().await);
    assert!(!h.control.impersonation().is_active());
    assert_eq!(
        request_paths(&h.server).await,
        vec![
            "/api/admin/users/u7/impersonate",
            "/api/admin/users/u7/end-impersonation"
        ]
    );
}

#[tokio::test]
async fn leaving_admin_mode_keeps_impersonation_alive() {
    let h = harness(Some(founder_token())).await;
    h.verifier.push(true);
    h.verifier.push(true);
    mount_ok(
        &h.server,
        "u7",
        "impersonate",
        json!({"impersonation_token": "imp-xyz"}),
    )
    .await;

    h.control.session().enter().await.unwrap();
    h.control
        .gateway()
        .impersonate("u7", REASON, &Password::new("s3cret"))
        .await
        .unwrap();

    assert!(h.control.session().end());
    assert!(h.control.impersonation().is_active());
    assert_eq!(request_paths(&h.server).await.len(), 1);
}
