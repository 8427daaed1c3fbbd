//! Founder admin-mode control plane.
//!
//! This crate owns the session state machines and the privileged action
//! gateway, with no terminal or HTTP wiring of its own. Callers construct one
//! [`AdminControl`] per process and pass it where it is needed.
//!
//! Identity claims are decoded without signature verification. They only gate
//! local affordances; the admin backend remains the authority for every
//! privileged call.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;

mod admin_session;
mod config;
mod credentials;
mod gateway;
mod identity;
mod impersonation;
mod step_up;
mod timer;
mod trigger;

#[cfg(test)]
mod test_support;

pub use admin_session::{
    ADMIN_SESSION_TTL, AdminSessionController, AdminSessionState, ENTER_PURPOSE, RENEW_PURPOSE,
    RenewOutcome, SessionEnd,
};
pub use config::{
    AdminConfig, BASE_URL_ENV, ConfigError, CredentialsConfig, DEFAULT_TOKEN_ENV, DEVICE_ID_ENV,
    WardenConfig, config_path, expand_env_vars,
};
pub use credentials::{
    ChainedCredentials, CredentialProvider, EnvCredentials, FileCredentials, StaticCredentials,
};
pub use gateway::{Moderation, PrivilegedActionGateway, PrivilegedActionRequest};
pub use identity::IdentityClaimReader;
pub use impersonation::{IMPERSONATION_TTL, ImpersonationSession, ImpersonationSessionController};
pub use step_up::{DeviceVerifier, StepUpAuthenticator, StepUpGrant, VerifyFut};
pub use timer::ExpiryTimer;
pub use trigger::{DEFAULT_REQUIRED_TAPS, DEFAULT_TAP_WINDOW, TapSequence};

pub use warden_client::{self, AdminApi};
pub use warden_types::{self, AdminError, DeviceId};

use gateway::Dispatcher;

// ============================================================================
// AdminControl
// ============================================================================

/// Composition root: one of each controller, sharing a single step-up
/// authenticator, credential source, admin API and device id.
pub struct AdminControl {
    identity: IdentityClaimReader,
    session: AdminSessionController,
    gateway: PrivilegedActionGateway,
    trigger: Mutex<TapSequence>,
    device_id: DeviceId,
}

impl AdminControl {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        verifier: Arc<dyn DeviceVerifier>,
        api: Arc<dyn AdminApi>,
        device_id: DeviceId,
    ) -> Self {
        let identity = IdentityClaimReader::new(credentials.clone());
        let step_up = StepUpAuthenticator::new(verifier);
        let dispatcher = Dispatcher::new(api, credentials);
        let impersonation = ImpersonationSessionController::new(dispatcher.clone(), device_id.clone());

        Self {
            session: AdminSessionController::new(identity.clone(), step_up.clone()),
            gateway: PrivilegedActionGateway::new(step_up, dispatcher, device_id.clone(), impersonation),
            identity,
            trigger: Mutex::new(TapSequence::default()),
            device_id,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClaimReader {
        &self.identity
    }

    #[must_use]
    pub fn session(&self) -> &AdminSessionController {
        &self.session
    }

    #[must_use]
    pub fn gateway(&self) -> &PrivilegedActionGateway {
        &self.gateway
    }

    #[must_use]
    pub fn impersonation(&self) -> &ImpersonationSessionController {
        self.gateway.impersonation()
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Feed one tap of the hidden gesture. `true` means the caller should
    /// start the admin entry flow.
    pub fn register_trigger_tap(&self) -> bool {
        self.register_trigger_tap_at(Instant::now())
    }

    pub fn register_trigger_tap_at(&self, at: Instant) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register_tap(at)
    }

    /// Process teardown: end the admin session and any live impersonation.
    pub async fn shutdown(&self) {
        let admin_ended = self.session.end();
        let impersonation_ended = self.impersonation().end_current().await;
        tracing::info!(admin_ended, impersonation_ended, "Admin control shut down");
    }
}
