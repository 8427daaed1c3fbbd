//! The single in-process admin-mode session.
//!
//! ```text
//!            enter: founder + step-up
//! Inactive ----------------------------> Active(expires_at)
//!    ^                                      |  renew: step-up ok -> Active(now + ttl)
//!    |   timer fire | end | renew declined  |
//!    +--------------------------------------+
//! ```
//!
//! All transitions happen under one mutex. The expiry timer is re-armed on
//! every activation and renewal, and a superseded timer cannot end the
//! session. Being in admin mode does not authorize privileged remote calls:
//! the gateway asks for its own confirmation every time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use warden_types::AdminError;

use crate::identity::IdentityClaimReader;
use crate::step_up::StepUpAuthenticator;
use crate::timer::ExpiryTimer;

/// Lifetime of an admin session from activation or renewal.
pub const ADMIN_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

pub const ENTER_PURPOSE: &str = "enter admin mode";
pub const RENEW_PURPOSE: &str = "extend admin session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSessionState {
    Inactive,
    Active { expires_at: Instant },
}

impl AdminSessionState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        match self {
            Self::Active { expires_at } => Some(*expires_at),
            Self::Inactive => None,
        }
    }
}

/// Why a session went back to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Expired,
    Ended,
    RenewalDeclined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed { expires_at: Instant },
    /// The session was not active; nothing happened and no prompt was shown.
    NotActive,
    /// Step-up was declined and the session has been ended.
    Ended,
    /// The session changed while the prompt was open (ended, expired, or
    /// re-armed by a concurrent call); this renewal had no effect.
    Superseded,
}

struct AdminInner {
    state: AdminSessionState,
    timer: ExpiryTimer,
    updates: watch::Sender<AdminSessionState>,
}

impl AdminInner {
    fn deactivate(&mut self, reason: SessionEnd) -> bool {
        self.timer.cancel();
        if !self.state.is_active() {
            return false;
        }
        self.state = AdminSessionState::Inactive;
        self.updates.send_replace(self.state);
        tracing::info!(?reason, "Admin session ended");
        true
    }

    fn live_expiry(&self, now: Instant) -> Option<Instant> {
        self.state.expires_at().filter(|expires_at| *expires_at > now)
    }
}

fn lock(inner: &Mutex<AdminInner>) -> MutexGuard<'_, AdminInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct AdminSessionController {
    inner: Arc<Mutex<AdminInner>>,
    identity: IdentityClaimReader,
    step_up: StepUpAuthenticator,
    ttl: Duration,
}

impl AdminSessionController {
    #[must_use]
    pub fn new(identity: IdentityClaimReader, step_up: StepUpAuthenticator) -> Self {
        Self::with_ttl(identity, step_up, ADMIN_SESSION_TTL)
    }

    #[must_use]
    pub fn with_ttl(
        identity: IdentityClaimReader,
        step_up: StepUpAuthenticator,
        ttl: Duration,
    ) -> Self {
        let (updates, _) = watch::channel(AdminSessionState::Inactive);
        Self {
            inner: Arc::new(Mutex::new(AdminInner {
                state: AdminSessionState::Inactive,
                timer: ExpiryTimer::new(),
                updates,
            })),
            identity,
            step_up,
            ttl,
        }
    }

    /// Enter admin mode: founder check first, then step-up, then activation.
    ///
    /// Entering while already active restarts the session window.
    pub async fn enter(&self) -> Result<Instant, AdminError> {
        let claims = self.identity.current_claims();
        if !claims.is_founder_identity() {
            tracing::warn!(username = %claims.username, "Admin mode refused: not the founder account");
            return Err(AdminError::NotAuthorized);
        }

        self.step_up.grant(ENTER_PURPOSE).await?;

        let mut inner = lock(&self.inner);
        let expires_at = self.arm(&mut inner);
        tracing::info!(
            subject = %claims.subject_id,
            ttl_secs = self.ttl.as_secs(),
            "Admin session activated"
        );
        Ok(expires_at)
    }

    /// Extend an active session after a fresh step-up. A declined step-up ends it.
    pub async fn renew(&self) -> RenewOutcome {
        let generation = {
            let inner = lock(&self.inner);
            if inner.live_expiry(Instant::now()).is_none() {
                return RenewOutcome::NotActive;
            }
            inner.timer.generation()
        };

        let confirmed = self.step_up.authenticate(RENEW_PURPOSE).await;

        let mut inner = lock(&self.inner);
        if inner.timer.generation() != generation || !inner.state.is_active() {
            tracing::debug!("Admin session changed during renewal prompt");
            return RenewOutcome::Superseded;
        }
        if inner.live_expiry(Instant::now()).is_none() {
            inner.deactivate(SessionEnd::Expired);
            return RenewOutcome::Superseded;
        }

        if confirmed {
            let expires_at = self.arm(&mut inner);
            tracing::info!(ttl_secs = self.ttl.as_secs(), "Admin session renewed");
            RenewOutcome::Renewed { expires_at }
        } else {
            inner.deactivate(SessionEnd::RenewalDeclined);
            RenewOutcome::Ended
        }
    }

    /// Returns `true` if a session was active. A session whose window has
    /// elapsed counts as already expired, matching [`Self::state`].
    pub fn end(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.live_expiry(Instant::now()).is_none() {
            inner.deactivate(SessionEnd::Expired);
            return false;
        }
        inner.deactivate(SessionEnd::Ended)
    }

    /// Current state as seen now: an elapsed `expires_at` reads as `Inactive`
    /// even if the timer task has not run yet.
    #[must_use]
    pub fn state(&self) -> AdminSessionState {
        let inner = lock(&self.inner);
        match inner.live_expiry(Instant::now()) {
            Some(expires_at) => AdminSessionState::Active { expires_at },
            None => AdminSessionState::Inactive,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.state()
            .expires_at()
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Receives every transition, including timer-driven expiry.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AdminSessionState> {
        lock(&self.inner).updates.subscribe()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(test)]
    fn timer_armed(&self) -> bool {
        lock(&self.inner).timer.is_armed()
    }

    fn arm(&self, inner: &mut AdminInner) -> Instant {
        let expires_at = Instant::now() + self.ttl;
        let weak: Weak<Mutex<AdminInner>> = Arc::downgrade(&self.inner);
        inner.timer.arm(expires_at, move |generation| async move {
            let Some(inner) = weak.upgrade() else { return };
            let mut inner = lock(&inner);
            if inner.timer.claim(generation) {
                inner.deactivate(SessionEnd::Expired);
            }
        });
        inner.state = AdminSessionState::Active { expires_at };
        inner.updates.send_replace(inner.state);
        expires_at
    }
}
