//! The impersonation sub-session.
//!
//! Independent of the admin session: it has its own shorter timer and is
//! never ended by admin-session teardown. Ending it always clears local state
//! first; the remote notification is best-effort and never retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use warden_types::{DeviceId, ImpersonationToken, UserId};

use crate::gateway::{Dispatcher, PrivilegedActionRequest};
use crate::timer::ExpiryTimer;

pub const IMPERSONATION_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationSession {
    target_user_id: UserId,
    token: ImpersonationToken,
    started_at: Instant,
    expires_at: Instant,
}

impl ImpersonationSession {
    #[must_use]
    pub fn target_user_id(&self) -> &UserId {
        &self.target_user_id
    }

    #[must_use]
    pub fn token(&self) -> &ImpersonationToken {
        &self.token
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

#[derive(Default)]
struct ImpersonationInner {
    current: Option<ImpersonationSession>,
    timer: ExpiryTimer,
}

fn lock(inner: &Mutex<ImpersonationInner>) -> MutexGuard<'_, ImpersonationInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends the end-impersonation notification. Failures are logged and dropped.
#[derive(Clone)]
struct Teardown {
    dispatcher: Dispatcher,
    device_id: DeviceId,
}

impl Teardown {
    async fn notify(&self, session: &ImpersonationSession) -> bool {
        let request = PrivilegedActionRequest::end_impersonation(
            session.target_user_id.clone(),
            self.device_id.clone(),
        );
        match self.dispatcher.send(request).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    target_user = %session.target_user_id,
                    error = %e,
                    "End-impersonation notification not acknowledged"
                );
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct ImpersonationSessionController {
    inner: Arc<Mutex<ImpersonationInner>>,
    teardown: Teardown,
    ttl: Duration,
}

impl ImpersonationSessionController {
    pub(crate) fn new(dispatcher: Dispatcher, device_id: DeviceId) -> Self {
        Self {
            inner: Arc::default(),
            teardown: Teardown {
                dispatcher,
                device_id,
            },
            ttl: IMPERSONATION_TTL,
        }
    }

    /// Make `token` the live session and arm its timer. A session that was
    /// still live is torn down in the same step and notified afterwards.
    pub(crate) async fn start(&self, target: UserId, token: ImpersonationToken) -> ImpersonationSession {
        let started_at = Instant::now();
        let session = ImpersonationSession {
            target_user_id: target,
            token,
            started_at,
            expires_at: started_at + self.ttl,
        };

        let displaced = {
            let mut inner = lock(&self.inner);
            let weak = Arc::downgrade(&self.inner);
            let teardown = self.teardown.clone();
            inner.timer.arm(session.expires_at, move |generation| async move {
                let expired = {
                    let Some(inner) = weak.upgrade() else { return };
                    let mut inner = lock(&inner);
                    if !inner.timer.claim(generation) {
                        return;
                    }
                    inner.current.take()
                };
                if let Some(session) = expired {
                    tracing::info!(target_user = %session.target_user_id, "Impersonation session expired");
                    teardown.notify(&session).await;
                }
            });
            inner.current.replace(session.clone())
        };

        tracing::info!(
            target_user = %session.target_user_id,
            ttl_secs = self.ttl.as_secs(),
            "Impersonation session started"
        );
        if let Some(previous) = displaced {
            tracing::info!(target_user = %previous.target_user_id, "Impersonation session replaced");
            self.teardown.notify(&previous).await;
        }
        session
    }

    /// End `session` if it is still the live one. Safe to call repeatedly:
    /// only the first call clears state and notifies the backend.
    pub async fn end(&self, session: &ImpersonationSession) -> bool {
        let ended = {
            let mut inner = lock(&self.inner);
            if inner.current.as_ref().map(ImpersonationSession::token) != Some(&session.token) {
                return false;
            }
            inner.timer.cancel();
            inner.current.take()
        };
        self.finish(ended).await
    }

    /// End whatever session is live.
    pub async fn end_current(&self) -> bool {
        let ended = {
            let mut inner = lock(&self.inner);
            inner.timer.cancel();
            inner.current.take()
        };
        self.finish(ended).await
    }

    /// The live session, if its window has not elapsed.
    #[must_use]
    pub fn current(&self) -> Option<ImpersonationSession> {
        let now = Instant::now();
        lock(&self.inner)
            .current
            .clone()
            .filter(|session| session.expires_at > now)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    async fn finish(&self, ended: Option<ImpersonationSession>) -> bool {
        let Some(session) = ended else {
            return false;
        };
        tracing::info!(target_user = %session.target_user_id, "Impersonation session ended");
        self.teardown.notify(&session).await;
        true
    }
}
