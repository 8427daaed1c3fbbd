//! Purpose-scoped step-up authentication.
//!
//! Every sensitive operation asks the device owner to confirm presence at the
//! moment it happens. Results are never cached: two calls with the same
//! purpose prompt twice.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use warden_types::AdminError;

/// Verification future type alias.
pub type VerifyFut<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Biometric or device-owner verification capability provided by the platform.
///
/// Implementations that render prompts are responsible for running them on a
/// UI-capable context; the returned future resolves once the prompt closes.
pub trait DeviceVerifier: Send + Sync {
    /// Whether verification is possible at all (enrolled biometric, hardware present).
    fn can_verify(&self) -> bool;

    /// Show the prompt with `reason` as its text and report whether the owner confirmed.
    fn verify<'a>(&'a self, reason: &'a str) -> VerifyFut<'a>;
}

/// Proof that a step-up check succeeded for a specific purpose.
///
/// Only [`StepUpAuthenticator::grant`] constructs it, so any request built
/// from a grant is unreachable without a fresh confirmation.
///
/// ```compile_fail
/// let grant = warden_engine::StepUpGrant { purpose: "ban user" };
/// ```
#[derive(Debug)]
pub struct StepUpGrant {
    purpose: &'static str,
}

impl StepUpGrant {
    #[must_use]
    pub fn purpose(&self) -> &'static str {
        self.purpose
    }
}

#[derive(Clone)]
pub struct StepUpAuthenticator {
    verifier: Arc<dyn DeviceVerifier>,
}

impl StepUpAuthenticator {
    #[must_use]
    pub fn new(verifier: Arc<dyn DeviceVerifier>) -> Self {
        Self { verifier }
    }

    /// Resolves `false` without prompting when the capability is unavailable.
    pub async fn authenticate(&self, purpose: &str) -> bool {
        if !self.verifier.can_verify() {
            tracing::warn!(purpose, "Device verification unavailable");
            return false;
        }
        let confirmed = self.verifier.verify(purpose).await;
        if !confirmed {
            tracing::warn!(purpose, "Device verification declined");
        }
        confirmed
    }

    pub async fn grant(&self, purpose: &'static str) -> Result<StepUpGrant, AdminError> {
        if self.authenticate(purpose).await {
            Ok(StepUpGrant { purpose })
        } else {
            Err(AdminError::StepUpFailed { purpose })
        }
    }
}
