//! Privileged remote operations behind mandatory step-up.
//!
//! Every call asks for a fresh confirmation scoped to its own purpose, even
//! while an admin session is active. Requests that escalate privilege can only
//! be built from a [`StepUpGrant`]. Nothing here is retried; the caller decides
//! whether to invoke again.

use std::sync::Arc;

use serde_json::Value;
use warden_client::{AdminApi, AdminCall, AdminReply};
use warden_types::{
    AdminError, BanBody, BanDuration, BearerToken, DeviceId, ImpersonateBody, ImpersonateResponse,
    ImpersonationReason, ImpersonationToken, Password, PrivilegedAction, ShadowbanBody, UserId,
};

use crate::credentials::CredentialProvider;
use crate::impersonation::{ImpersonationSession, ImpersonationSessionController};
use crate::step_up::{StepUpAuthenticator, StepUpGrant};

// ============================================================================
// PrivilegedActionRequest
// ============================================================================

/// An outbound privileged request, attributed to this device.
#[derive(Debug, Clone)]
pub struct PrivilegedActionRequest {
    action: PrivilegedAction,
    target: UserId,
    body: Option<Value>,
    device_id: DeviceId,
}

impl PrivilegedActionRequest {
    /// Consumes the grant: one confirmation, one request.
    fn authorized(
        grant: StepUpGrant,
        action: PrivilegedAction,
        target: UserId,
        body: Option<Value>,
        device_id: DeviceId,
    ) -> Self {
        debug_assert_eq!(Some(grant.purpose()), action.step_up_purpose());
        Self {
            action,
            target,
            body,
            device_id,
        }
    }

    /// Ending impersonation only drops privilege, so it needs no grant.
    pub(crate) fn end_impersonation(target: UserId, device_id: DeviceId) -> Self {
        Self {
            action: PrivilegedAction::EndImpersonation,
            target,
            body: None,
            device_id,
        }
    }

    #[must_use]
    pub fn action(&self) -> PrivilegedAction {
        self.action
    }

    #[must_use]
    pub fn target(&self) -> &UserId {
        &self.target
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn into_call(self, bearer: BearerToken) -> AdminCall {
        AdminCall {
            action: self.action,
            target: self.target,
            body: self.body,
            bearer,
            device_id: self.device_id,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Attaches the stored credential and sends. Converts every client failure
/// into [`AdminError::RemoteExchangeFailed`].
#[derive(Clone)]
pub(crate) struct Dispatcher {
    api: Arc<dyn AdminApi>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Dispatcher {
    pub(crate) fn new(api: Arc<dyn AdminApi>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { api, credentials }
    }

    pub(crate) async fn send(
        &self,
        request: PrivilegedActionRequest,
    ) -> Result<AdminReply, AdminError> {
        let action = request.action;
        let Some(bearer) = self.credentials.token() else {
            tracing::warn!(%action, "No stored credential for admin request");
            return Err(AdminError::NotAuthenticated);
        };
        let target = request.target.clone();
        self.api
            .send(request.into_call(bearer))
            .await
            .map_err(|e| {
                tracing::warn!(%action, target_user = %target, error = %e, "Admin request failed");
                AdminError::RemoteExchangeFailed(e.to_string())
            })
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// A reversible moderation action against one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moderation<'a> {
    Ban {
        reason: &'a str,
        duration: BanDuration,
    },
    Shadowban {
        reason: &'a str,
    },
    Unban,
    Unshadowban,
}

impl Moderation<'_> {
    #[must_use]
    pub fn action(&self) -> PrivilegedAction {
        match self {
            Self::Ban { .. } => PrivilegedAction::Ban,
            Self::Shadowban { .. } => PrivilegedAction::Shadowban,
            Self::Unban => PrivilegedAction::Unban,
            Self::Unshadowban => PrivilegedAction::Unshadowban,
        }
    }

    fn body(&self) -> Result<Option<Value>, AdminError> {
        let body = match *self {
            Self::Ban { reason, duration } => Some(serde_json::to_value(BanBody {
                reason,
                duration: duration.as_wire_hours(),
            })),
            Self::Shadowban { reason } => Some(serde_json::to_value(ShadowbanBody { reason })),
            Self::Unban | Self::Unshadowban => None,
        };
        body.transpose()
            .map_err(|e| AdminError::RemoteExchangeFailed(e.to_string()))
    }
}

#[derive(Clone)]
pub struct PrivilegedActionGateway {
    step_up: StepUpAuthenticator,
    dispatcher: Dispatcher,
    device_id: DeviceId,
    impersonation: ImpersonationSessionController,
}

impl PrivilegedActionGateway {
    pub(crate) fn new(
        step_up: StepUpAuthenticator,
        dispatcher: Dispatcher,
        device_id: DeviceId,
        impersonation: ImpersonationSessionController,
    ) -> Self {
        Self {
            step_up,
            dispatcher,
            device_id,
            impersonation,
        }
    }

    /// Validate, confirm, then send. No network traffic unless the step-up succeeded.
    pub async fn execute(&self, user_id: &str, moderation: Moderation<'_>) -> Result<(), AdminError> {
        let target = UserId::new(user_id)?;
        let body = moderation.body()?;
        let action = moderation.action();

        let reply = self.send_authorized(action, target.clone(), body).await?;
        tracing::info!(%action, target_user = %target, status = reply.status, "Privileged action applied");
        Ok(())
    }

    /// Permanent ban.
    pub async fn ban(&self, user_id: &str, reason: &str) -> bool {
        self.ban_for(user_id, reason, BanDuration::Permanent).await
    }

    pub async fn ban_for(&self, user_id: &str, reason: &str, duration: BanDuration) -> bool {
        self.execute(user_id, Moderation::Ban { reason, duration })
            .await
            .is_ok()
    }

    pub async fn shadowban(&self, user_id: &str, reason: &str) -> bool {
        self.execute(user_id, Moderation::Shadowban { reason })
            .await
            .is_ok()
    }

    pub async fn unban(&self, user_id: &str) -> bool {
        self.execute(user_id, Moderation::Unban).await.is_ok()
    }

    pub async fn unshadowban(&self, user_id: &str) -> bool {
        self.execute(user_id, Moderation::Unshadowban).await.is_ok()
    }

    /// Two-factor exchange: reason length, step-up, then password-verified
    /// remote call. On success the returned session is already live with its
    /// own expiry timer.
    pub async fn impersonate(
        &self,
        user_id: &str,
        reason: &str,
        password: &Password,
    ) -> Result<ImpersonationSession, AdminError> {
        let target = UserId::new(user_id)?;
        let reason = ImpersonationReason::new(reason)?;

        let body = serde_json::to_value(ImpersonateBody {
            reason: reason.as_str(),
            password: password.expose(),
        })
        .map_err(|e| AdminError::RemoteExchangeFailed(e.to_string()))?;

        let reply = self
            .send_authorized(PrivilegedAction::Impersonate, target.clone(), Some(body))
            .await?;

        let token = reply
            .json::<ImpersonateResponse>()
            .ok()
            .and_then(|response| ImpersonationToken::new(response.impersonation_token))
            .ok_or_else(|| {
                tracing::warn!(target_user = %target, "Impersonation response carried no token");
                AdminError::RemoteExchangeFailed("response carried no impersonation token".into())
            })?;

        Ok(self.impersonation.start(target, token).await)
    }

    /// Ends the live impersonation session, if any. Never prompts.
    pub async fn end_impersonation(&self) -> bool {
        self.impersonation.end_current().await
    }

    #[must_use]
    pub fn impersonation(&self) -> &ImpersonationSessionController {
        &self.impersonation
    }

    async fn send_authorized(
        &self,
        action: PrivilegedAction,
        target: UserId,
        body: Option<Value>,
    ) -> Result<AdminReply, AdminError> {
        let Some(purpose) = action.step_up_purpose() else {
            return self
                .dispatcher
                .send(PrivilegedActionRequest::end_impersonation(
                    target,
                    self.device_id.clone(),
                ))
                .await;
        };
        let grant = self.step_up.grant(purpose).await?;
        let request =
            PrivilegedActionRequest::authorized(grant, action, target, body, self.device_id.clone());
        self.dispatcher.send(request).await
    }
}
