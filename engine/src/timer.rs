//! One-shot, cancellable expiry timer.
//!
//! Contract: a timer fires at most once, can be cancelled before firing, and
//! re-arming supersedes any previous arm. Each arm gets a new generation.
//! The firing task must call [`ExpiryTimer::claim`] with its generation while
//! holding the owner's lock; a superseded or cancelled generation is refused,
//! so a stale task that woke up concurrently with a re-arm does nothing.

use std::future::Future;

use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep_until};

#[derive(Debug, Default)]
pub struct ExpiryTimer {
    generation: u64,
    armed: Option<AbortHandle>,
}

impl ExpiryTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire(generation)` at `deadline`, cancelling any previous arm.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&mut self, deadline: Instant, on_fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            on_fire(generation).await;
        });
        self.armed = Some(task.abort_handle());
        generation
    }

    /// Abort the pending arm, if any. Its generation can no longer be claimed.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }

    /// Called by the firing task. Returns `true` exactly once for the current
    /// arm; afterwards the timer is disarmed and `cancel` will not abort the
    /// task that claimed it.
    pub fn claim(&mut self, generation: u64) -> bool {
        if self.armed.is_some() && self.generation == generation {
            self.armed = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
