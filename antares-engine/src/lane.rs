//! Per-type bookkeeping. A lane is only touched under its registration's
//! lock, so admission and settlement never interleave.

use antares_core::{Action, Concurrency, RenderError, RenderOutcome};
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// An invocation that has been assigned an id but not started.
pub(crate) struct Pending {
    pub id: u64,
    pub action: Action,
    pub token: CancellationToken,
    pub tx: oneshot::Sender<RenderOutcome>,
}

/// What `admit` decided.
pub(crate) enum Admission {
    Start(Pending),
    Queued,
    Dropped(Pending),
}

/// The raw end of a renderer task: the renderer's own result, or the
/// panic message if the task died.
pub(crate) type RunResult = Result<Result<serde_json::Value, RenderError>, String>;

#[derive(Default)]
pub(crate) struct Lane {
    /// The single running invocation under serial, cutoff and mute.
    active: Option<(u64, CancellationToken)>,
    /// Every running invocation under parallel.
    running: HashMap<u64, CancellationToken>,
    /// Waiting invocations under serial, FIFO.
    queue: VecDeque<Pending>,
    /// Last result that was kept.
    current: Option<serde_json::Value>,
}

impl Lane {
    pub(crate) fn admit(&mut self, policy: Concurrency, pending: Pending) -> Admission {
        match policy {
            Concurrency::Parallel => {
                self.running.insert(pending.id, pending.token.clone());
                Admission::Start(pending)
            }
            Concurrency::Serial => {
                if self.active.is_some() {
                    self.queue.push_back(pending);
                    Admission::Queued
                } else {
                    self.active = Some((pending.id, pending.token.clone()));
                    Admission::Start(pending)
                }
            }
            Concurrency::Cutoff => {
                // cancel before the replacement is spawned
                if let Some((superseded, token)) =
                    self.active.replace((pending.id, pending.token.clone()))
                {
                    token.cancel();
                    tracing::debug!(
                        superseded,
                        by = pending.id,
                        action_type = pending.action.action_type(),
                        "antares.engine.cutoff"
                    );
                }
                Admission::Start(pending)
            }
            Concurrency::Mute => {
                if self.active.is_some() {
                    Admission::Dropped(pending)
                } else {
                    self.active = Some((pending.id, pending.token.clone()));
                    Admission::Start(pending)
                }
            }
        }
    }

    /// Record the end of invocation `id` and decide its outcome. A token
    /// cancelled by now means the result is discarded, whatever it was.
    /// Returns the next serial invocation to start, if any.
    pub(crate) fn settle(
        &mut self,
        policy: Concurrency,
        id: u64,
        token: &CancellationToken,
        result: RunResult,
    ) -> (RenderOutcome, Option<Pending>) {
        match policy {
            Concurrency::Parallel => {
                self.running.remove(&id);
            }
            _ => {
                if self.active.as_ref().is_some_and(|(active, _)| *active == id) {
                    self.active = None;
                }
            }
        }

        let outcome = if token.is_cancelled() {
            RenderOutcome::Cancelled
        } else {
            match result {
                Ok(Ok(value)) => {
                    self.current = Some(value.clone());
                    RenderOutcome::Completed(value)
                }
                Ok(Err(error)) => RenderOutcome::Failed(error),
                Err(panic) => RenderOutcome::Failed(RenderError::Panicked(panic)),
            }
        };

        let next = if policy == Concurrency::Serial && self.active.is_none() {
            self.next_queued()
        } else {
            None
        };
        (outcome, next)
    }

    fn next_queued(&mut self) -> Option<Pending> {
        while let Some(pending) = self.queue.pop_front() {
            if pending.token.is_cancelled() {
                let _ = pending.tx.send(RenderOutcome::Cancelled);
                continue;
            }
            self.active = Some((pending.id, pending.token.clone()));
            return Some(pending);
        }
        None
    }

    /// Nothing running, nothing queued, nothing kept.
    pub(crate) fn is_idle(&self) -> bool {
        self.active.is_none()
            && self.running.is_empty()
            && self.queue.is_empty()
            && self.current.is_none()
    }

    pub(crate) fn current(&self) -> Option<serde_json::Value> {
        self.current.clone()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.running.len() + usize::from(self.active.is_some())
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }
}
