//! Single-flight token refresh.
//!
//! The first request to hit a 401 becomes the initiator and performs the
//! refresh. Requests that hit a 401 while it is in flight queue up and are
//! resolved with the same outcome once it settles.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use rim_core::AccessToken;
use rim_core::error::AuthError;

pub(crate) type RefreshOutcome = Result<AccessToken, AuthError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owns the "refreshing" flag and the queue of waiting requests.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a request that hit a 401 has to do next.
pub(crate) enum RefreshRole<'a> {
    /// Perform the refresh, then settle the guard.
    Initiator(RefreshGuard<'a>),
    /// Wait for someone else's refresh.
    Waiter(PendingRefresh),
}

impl RefreshCoordinator {
    /// Become the initiator, or join the refresh already in flight.
    pub fn join(&self) -> RefreshRole<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            debug!(queued = state.pending.len(), "Joined in-flight refresh");
            RefreshRole::Waiter(PendingRefresh(rx))
        } else {
            state.refreshing = true;
            RefreshRole::Initiator(RefreshGuard {
                coordinator: self,
                outcome: None,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    pub fn queued(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A queued request's handle on the in-flight refresh.
pub(crate) struct PendingRefresh(oneshot::Receiver<RefreshOutcome>);

impl PendingRefresh {
    pub async fn wait(self) -> RefreshOutcome {
        self.0.await.unwrap_or(Err(AuthError::RefreshAbandoned))
    }
}

/// Held by the initiator while the refresh runs.
///
/// Dropping the guard clears the refreshing flag and drains the queue, so
/// this happens on every path out of the refresh, including cancellation.
/// Waiters are handed the settled outcome, or see
/// [`AuthError::RefreshAbandoned`] if the guard was never settled.
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: Option<RefreshOutcome>,
}

impl RefreshGuard<'_> {
    /// Record the refresh outcome and release every queued request.
    pub fn settle(mut self, outcome: RefreshOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let pending = {
            let mut state = self.coordinator.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        match self.outcome.take() {
            Some(outcome) => {
                debug!(
                    waiters = pending.len(),
                    ok = outcome.is_ok(),
                    "Refresh settled"
                );
                for waiter in pending {
                    // A waiter whose request future was dropped is gone; skip it.
                    let _ = waiter.send(outcome.clone());
                }
            }
            None if !pending.is_empty() => {
                warn!(
                    waiters = pending.len(),
                    "Refresh abandoned; rejecting queued requests"
                );
            }
            None => {}
        }
    }
}
