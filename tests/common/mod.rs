//! Shared test utilities and fixtures
//!
//! Builds a fully wired `AdminControl` against a wiremock admin backend.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use warden_client::{HttpAdminApi, HttpSettings};
use warden_engine::{AdminControl, DeviceVerifier, StaticCredentials, VerifyFut};
use warden_types::{BearerToken, DeviceId, FOUNDER_USERNAME};

pub const DEVICE_ID: &str = "test-device";

/// An unsigned JWT-shaped token carrying the given claims.
pub fn token_for(username: &str, is_founder: bool) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "sub": format!("id-{username}"),
            "username": username,
            "is_founder": is_founder,
        })
        .to_string(),
    );
    format!("{header}.{payload}.signature")
}

pub fn founder_token() -> String {
    token_for(FOUNDER_USERNAME, true)
}

/// Device verifier answering from a queue; declines once the queue is empty.
#[derive(Default)]
pub struct QueueVerifier {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl QueueVerifier {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn push(&self, answer: bool) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl DeviceVerifier for QueueVerifier {
    fn can_verify(&self) -> bool {
        true
    }

    fn verify<'a>(&'a self, reason: &'a str) -> VerifyFut<'a> {
        self.prompts.lock().unwrap().push(reason.to_string());
        let answer = self.answers.lock().unwrap().pop_front().unwrap_or(false);
        Box::pin(async move { answer })
    }
}

pub struct Harness {
    pub server: MockServer,
    pub verifier: Arc<QueueVerifier>,
    pub credentials: Arc<StaticCredentials>,
    pub control: AdminControl,
}

/// Base URL of the mocked admin API on `server`.
pub fn admin_base(server: &MockServer) -> String {
    format!("{}/api/admin", server.uri())
}

pub async fn harness(token: Option<String>) -> Harness {
    let server = MockServer::start().await;
    let settings = HttpSettings::new(&admin_base(&server)).unwrap();
    let api = HttpAdminApi::new(&settings).unwrap();
    let verifier = Arc::new(QueueVerifier::default());
    let credentials = Arc::new(StaticCredentials::new(token.and_then(BearerToken::new)));

    let control = AdminControl::new(
        credentials.clone(),
        verifier.clone(),
        Arc::new(api),
        DeviceId::new(DEVICE_ID),
    );

    Harness {
        server,
        verifier,
        credentials,
        control,
    }
}

/// Mount a 200 JSON reply for `POST /api/admin/users/{user}/{segment}`.
pub async fn mount_ok(server: &MockServer, user: &str, segment: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("/api/admin/users/{user}/{segment}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, user: &str, segment: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(format!("/api/admin/users/{user}/{segment}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
