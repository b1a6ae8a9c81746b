//! Idle shutdown timer for the daemon.
//!
//! The timer is a single deadline behind a mutex. Every request pushes the
//! deadline out under the lock, and the watcher only declares the daemon
//! idle after re-reading the deadline under the same lock, so a reset racing
//! with an expiry always wins: an expiry that was already due but not yet
//! acted on is discarded by the reset.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

pub struct IdleTimer {
    /// `None` disables idle shutdown.
    timeout: Option<Duration>,
    deadline: Mutex<Option<Instant>>,
    rearmed: Notify,
}

impl IdleTimer {
    /// Create a timer armed to fire `timeout` from now. A zero timeout, or
    /// one too large to represent as a deadline, never fires.
    pub fn new(timeout: Option<Duration>) -> Self {
        let timeout = timeout.filter(|t| !t.is_zero());
        Self { timeout, deadline: Mutex::new(deadline_after(timeout)), rearmed: Notify::new() }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the timer, drop any pending expiry, and rearm it for a full
    /// timeout from now. Atomic with respect to other resets and to
    /// [`IdleTimer::expired`] deciding the daemon is idle.
    pub fn reset(&self) {
        let mut deadline = self.lock();
        *deadline = deadline_after(self.timeout);
        drop(deadline);
        self.rearmed.notify_waiters();
    }

    /// Resolve once a full timeout passes with no [`IdleTimer::reset`].
    ///
    /// Never resolves for a disabled timer. Dropping the future is safe; a
    /// new call picks up the current deadline.
    pub async fn expired(&self) {
        loop {
            let rearmed = self.rearmed.notified();
            tokio::pin!(rearmed);
            // Register before reading the deadline so a reset in between
            // is not missed.
            rearmed.as_mut().enable();

            let deadline = *self.lock();
            let Some(deadline) = deadline else {
                rearmed.await;
                continue;
            };

            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    let idle = self.lock().is_some_and(|d| d <= Instant::now());
                    if idle {
                        return;
                    }
                    tracing::debug!("Idle timer was reset while expiring");
                }
                () = &mut rearmed => {}
            }
        }
    }
}

fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}
