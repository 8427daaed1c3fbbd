//! Doubles shared by the engine's unit tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tokio::sync::{Semaphore, watch};
use warden_client::{AdminApi, AdminCall, AdminReply, ApiError, ApiFut};
use warden_types::{FOUNDER_USERNAME, PrivilegedAction};

use crate::step_up::{DeviceVerifier, VerifyFut};

pub fn token_for(username: &str, is_founder: bool) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "sub": format!("id-{username}"), "username": username, "is_founder": is_founder })
            .to_string(),
    );
    format!("{header}.{payload}.sig")
}

pub fn founder_token() -> String {
    token_for(FOUNDER_USERNAME, true)
}

/// Answers prompts from a script. Once `answers` runs dry, `gated` answers are
/// handed out only after [`ScriptedVerifier::release`]; past that, it declines.
pub struct ScriptedVerifier {
    available: bool,
    answers: Mutex<VecDeque<bool>>,
    gated: Mutex<VecDeque<bool>>,
    gate: Semaphore,
    prompts: Mutex<Vec<String>>,
    prompt_count: watch::Sender<usize>,
}

impl ScriptedVerifier {
    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
        let (prompt_count, _) = watch::channel(0);
        Self {
            available: true,
            answers: Mutex::new(answers.into_iter().collect()),
            gated: Mutex::new(VecDeque::new()),
            gate: Semaphore::new(0),
            prompts: Mutex::new(Vec::new()),
            prompt_count,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::answering([])
        }
    }

    pub fn with_gated_answers(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.gated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(answers);
        self
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Resolves once `count` prompts have been shown in total.
    pub async fn wait_for_prompt(&self, count: usize) {
        let mut rx = self.prompt_count.subscribe();
        rx.wait_for(|shown| *shown >= count)
            .await
            .expect("verifier dropped");
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeviceVerifier for ScriptedVerifier {
    fn can_verify(&self) -> bool {
        self.available
    }

    fn verify<'a>(&'a self, reason: &'a str) -> VerifyFut<'a> {
        Box::pin(async move {
            self.prompts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(reason.to_string());
            self.prompt_count.send_modify(|shown| *shown += 1);

            let scripted = self
                .answers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            if let Some(answer) = scripted {
                return answer;
            }
            let gated = self
                .gated
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match gated {
                Some(answer) => {
                    self.gate.acquire().await.expect("gate closed").forget();
                    answer
                }
                None => false,
            }
        })
    }
}

/// Scripted outcome for one [`RecordingApi`] call.
#[derive(Debug, Clone)]
pub enum Scripted {
    Ok(Value),
    Status(u16),
}

/// Records every call; replies from a script, then with an empty 200.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<AdminCall>>,
    replies: Mutex<VecDeque<Scripted>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(replies: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            calls: Mutex::default(),
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    pub fn calls(&self) -> Vec<AdminCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn actions(&self) -> Vec<PrivilegedAction> {
        self.calls().into_iter().map(|call| call.action).collect()
    }
}

impl AdminApi for RecordingApi {
    fn send(&self, call: AdminCall) -> ApiFut<'_, AdminReply> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Scripted::Ok(Value::Null));
        Box::pin(async move {
            match reply {
                Scripted::Ok(body) => Ok(AdminReply::ok(body)),
                Scripted::Status(status) => Err(ApiError::Status {
                    status,
                    body: String::new(),
                }),
            }
        })
    }
}
