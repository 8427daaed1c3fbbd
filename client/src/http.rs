//! `reqwest` implementation of [`AdminApi`].

use serde_json::Value;
use warden_types::{PrivilegedAction, UserId};

use crate::{
    AdminApi, AdminCall, AdminReply, ApiError, ApiFut, DEVICE_ID_HEADER, HttpSettings,
    http_client, read_capped_error_body,
};

/// Admin backend client rooted at a base URL such as `https://host/api/admin`.
#[derive(Debug, Clone)]
pub struct HttpAdminApi {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpAdminApi {
    pub fn new(settings: &HttpSettings) -> Result<Self, ApiError> {
        Ok(Self {
            client: http_client(settings)?,
            base_url: settings.base_url.clone(),
        })
    }

    /// Use a caller-provided client (shared pools, tests).
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: reqwest::Url) -> Self {
        Self { client, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// `{base}/users/{id}/{action}`, with the user id percent-encoded as a
    /// single path segment.
    pub fn endpoint(
        &self,
        action: PrivilegedAction,
        target: &UserId,
    ) -> Result<reqwest::Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["users", target.as_str(), action.path_segment()]);
        Ok(url)
    }

    async fn execute(&self, call: AdminCall) -> Result<AdminReply, ApiError> {
        let url = self.endpoint(call.action, &call.target)?;

        let mut request = self
            .client
            .post(url)
            .bearer_auth(call.bearer.expose())
            .header(DEVICE_ID_HEADER, call.device_id.as_str());
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            tracing::warn!(
                action = %call.action,
                status = status.as_u16(),
                "Admin request rejected"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        tracing::debug!(action = %call.action, status = status.as_u16(), "Admin request accepted");
        Ok(AdminReply {
            status: status.as_u16(),
            body,
        })
    }
}

impl AdminApi for HttpAdminApi {
    fn send(&self, call: AdminCall) -> ApiFut<'_, AdminReply> {
        Box::pin(self.execute(call))
    }
}
