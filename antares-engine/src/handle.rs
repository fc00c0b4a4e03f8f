//! The caller's view of one submitted action.

use antares_core::{Action, RenderOutcome};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Handle to one invocation (or non-invocation) of a renderer.
///
/// Returned immediately by [`crate::RenderEngine::submit`]. Await
/// [`RenderHandle::settled`] to observe how it ended; dropping the handle
/// does not cancel the invocation.
#[derive(Debug)]
pub struct RenderHandle {
    id: u64,
    action: Action,
    token: CancellationToken,
    outcome: oneshot::Receiver<RenderOutcome>,
}

impl RenderHandle {
    pub(crate) fn new(
        id: u64,
        action: Action,
        token: CancellationToken,
        outcome: oneshot::Receiver<RenderOutcome>,
    ) -> Self {
        Self {
            id,
            action,
            token,
            outcome,
        }
    }

    /// A handle that has already settled with `outcome`.
    pub(crate) fn ready(id: u64, action: Action, outcome: RenderOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self::new(id, action, CancellationToken::new(), rx)
    }

    /// Engine-assigned invocation id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The action that triggered this invocation.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Ask the invocation to stop. Cooperative: the renderer sees the
    /// signal, and whatever it returns afterwards is discarded. A queued
    /// serial invocation that is cancelled never starts.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this invocation has been cancelled, by the caller or by a
    /// `cutoff` replacement.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The outcome, if the invocation has already settled.
    pub fn try_outcome(&mut self) -> Option<RenderOutcome> {
        self.outcome.try_recv().ok()
    }

    /// Wait for the invocation to settle.
    pub async fn settled(self) -> RenderOutcome {
        // The sender only disappears if the runtime shut down under us.
        self.outcome.await.unwrap_or(RenderOutcome::Cancelled)
    }
}
