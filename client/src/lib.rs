//! Admin backend API client.
//!
//! # Architecture
//!
//! - [`AdminApi`] - Object-safe seam the control plane sends privileged calls through
//! - [`HttpAdminApi`] - `reqwest` implementation against the `/api/admin` root
//! - [`AdminCall`] - One outbound request: action, target, optional JSON body, credentials
//!
//! # Endpoints
//!
//! | Action | Request |
//! |--------|---------|
//! | `Ban` | `POST /users/{id}/ban` body `{reason, duration}` |
//! | `Unban` | `POST /users/{id}/unban` |
//! | `Shadowban` | `POST /users/{id}/shadowban` body `{reason}` |
//! | `Unshadowban` | `POST /users/{id}/unshadowban` |
//! | `Impersonate` | `POST /users/{id}/impersonate` body `{reason, password}` |
//! | `EndImpersonation` | `POST /users/{id}/end-impersonation` |
//!
//! Every request carries `Authorization: Bearer <token>` and `X-Device-ID`.
//!
//! # Error Handling
//!
//! Calls are never retried. Transport failures, non-2xx statuses and
//! undecodable bodies are reported as [`ApiError`] and the caller decides
//! whether to re-invoke.

mod http;

pub use http::HttpAdminApi;

use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use warden_types::{BearerToken, DeviceId, PrivilegedAction, UserId};

pub use warden_types;

/// Default admin service root, matching the local development deployment.
pub const DEFAULT_ADMIN_BASE_URL: &str = "http://localhost:8005/api/admin";

/// Audit attribution header sent with every admin request.
pub const DEVICE_ID_HEADER: &str = "X-Device-ID";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Admin API future type alias.
pub type ApiFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid admin base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("admin service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A single outbound admin request.
#[derive(Debug, Clone)]
pub struct AdminCall {
    pub action: PrivilegedAction,
    pub target: UserId,
    pub body: Option<Value>,
    pub bearer: BearerToken,
    pub device_id: DeviceId,
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminReply {
    pub status: u16,
    /// Parsed JSON body; `Null` when empty or not JSON.
    pub body: Value,
}

impl AdminReply {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Seam between the control plane and the admin backend.
pub trait AdminApi: Send + Sync {
    fn send(&self, call: AdminCall) -> ApiFut<'_, AdminReply>;
}

/// Connection settings for [`HttpAdminApi`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: reqwest::Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Refuse plain-HTTP endpoints.
    pub https_only: bool,
}

impl HttpSettings {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_only: false,
        })
    }

    #[must_use]
    pub fn https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    #[must_use]
    pub fn timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

pub fn parse_base_url(raw: &str) -> Result<reqwest::Url, ApiError> {
    let invalid = |reason: &str| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = reqwest::Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot be used as a base"));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    Ok(url)
}

/// Whether the host is a loopback address, where plain HTTP is tolerated.
#[must_use]
pub fn is_loopback(url: &reqwest::Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

fn base_client_builder(settings: &HttpSettings) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(settings.https_only)
}

pub fn http_client(settings: &HttpSettings) -> Result<reqwest::Client, ApiError> {
    Ok(base_client_builder(settings).build()?)
}

pub(crate) async fn read_capped_error_body(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
