//! Single-flight refresh coordination.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::auth::refresh::RefreshError;

/// New access credential, or why it could not be obtained.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    // Released when the most recently queued caller has replayed.
    last_turn: Option<oneshot::Receiver<()>>,
}

/// Owns the refresh-in-flight flag and the queue of parked callers.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of asking to refresh.
#[derive(Debug)]
pub enum RefreshTicket<'a> {
    /// Caller must perform the refresh and drain the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is already running; wait for its outcome.
    Waiter(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Become the refresh leader, or join the queue behind the current one.
    pub fn acquire_or_enqueue(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            let (release, next) = oneshot::channel();
            let turn = ReplayTurn {
                after: state.last_turn.replace(next),
                _release: release,
            };
            tracing::debug!(position = state.waiters.len(), "Refresh in flight, request queued");
            RefreshTicket::Waiter(RefreshWaiter { rx, turn })
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshLease {
                coordinator: self,
                drained: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of callers parked behind the current refresh.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    fn drain(&self, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            state.last_turn = None;
            std::mem::take(&mut state.waiters)
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose call was dropped no longer cares.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Proof that the holder is the one caller allowed to refresh right now.
#[derive(Debug)]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    drained: bool,
}

impl RefreshLease<'_> {
    /// Finish the refresh: resume every queued caller, in arrival order,
    /// with `outcome` and return to idle. Returns how many were resumed.
    pub fn drain(mut self, outcome: RefreshOutcome) -> usize {
        self.drained = true;
        self.coordinator.drain(outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.drained {
            let stranded = self.coordinator.drain(Err(RefreshError::Abandoned));
            tracing::warn!(stranded, "Refresh abandoned before completing");
        }
    }
}

/// A caller parked behind an in-flight refresh.
#[derive(Debug)]
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
    turn: ReplayTurn,
}

impl RefreshWaiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.wait_in_line().await.map(|(token, _)| token)
    }

    /// Like [`wait`](Self::wait), but keeps the caller's place in the
    /// replay order. Replays must hold the turn until they are on the wire.
    pub async fn wait_in_line(self) -> Result<(String, ReplayTurn), RefreshError> {
        let token = self.rx.await.unwrap_or(Err(RefreshError::Abandoned))?;
        Ok((token, self.turn))
    }
}

/// A queued caller's place in the replay order.
///
/// [`ready`](Self::ready) resolves once the caller queued just before has
/// released its turn. Dropping the turn releases it.
#[derive(Debug)]
pub struct ReplayTurn {
    after: Option<oneshot::Receiver<()>>,
    _release: oneshot::Sender<()>,
}

impl ReplayTurn {
    pub async fn ready(&mut self) {
        if let Some(after) = self.after.take() {
            // Nothing is ever sent: the predecessor signals by dropping its turn.
            let _ = after.await;
        }
    }
}
