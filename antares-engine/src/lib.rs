#![deny(missing_docs)]
//! Renderer concurrency engine for antares.
//!
//! A [`RenderEngine`] maps action types to renderers, each under one
//! [`Concurrency`] policy, and owns the bookkeeping for in-flight
//! invocations. [`RenderEngine::submit`] never waits on a renderer: it
//! decides what happens to the action under the type's policy, spawns
//! whatever should start, and returns a [`RenderHandle`].
//!
//! | Policy | New action while one is running |
//! |--------|--------------------------------|
//! | `parallel` | starts immediately |
//! | `serial` | waits its turn, FIFO |
//! | `cutoff` | cancels the running one and starts immediately |
//! | `mute` | is dropped |
//!
//! Bookkeeping is per (registration, action type): two types never
//! interact, even when one wildcard registration covers both.

mod handle;
mod lane;

pub use handle::RenderHandle;

use antares_core::{
    Action, ActionMatcher, Concurrency, RenderContext, RenderError, RenderOutcome, Renderer,
};
use lane::{Admission, Lane, Pending, RunResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

struct Registration {
    matcher: ActionMatcher,
    renderer: Arc<dyn Renderer>,
    concurrency: Concurrency,
    lanes: Mutex<HashMap<String, Lane>>,
}

impl Registration {
    fn lanes(&self) -> MutexGuard<'_, HashMap<String, Lane>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(
        &self,
        action_type: &str,
        id: u64,
        token: &CancellationToken,
        result: RunResult,
    ) -> (RenderOutcome, Option<Pending>) {
        let mut lanes = self.lanes();
        let lane = lanes.entry(action_type.to_owned()).or_default();
        let settled = lane.settle(self.concurrency, id, token, result);
        if lane.is_idle() {
            lanes.remove(action_type);
        }
        settled
    }
}

struct Inner {
    registrations: Vec<Arc<Registration>>,
    root: CancellationToken,
    next_id: AtomicU64,
}

/// The concurrency engine. Cheap to clone; clones share bookkeeping.
#[derive(Clone)]
pub struct RenderEngine {
    inner: Arc<Inner>,
}

/// Collects renderer registrations. Registrations are fixed once
/// [`RenderEngineBuilder::build`] is called.
#[must_use]
#[derive(Default)]
pub struct RenderEngineBuilder {
    registrations: Vec<Registration>,
}

impl RenderEngineBuilder {
    /// Register `renderer` for actions matching `matcher` under `concurrency`.
    ///
    /// When several registrations match a type, the first one registered
    /// owns it.
    pub fn on(
        mut self,
        matcher: impl Into<ActionMatcher>,
        renderer: Arc<dyn Renderer>,
        concurrency: Concurrency,
    ) -> Self {
        self.registrations.push(Registration {
            matcher: matcher.into(),
            renderer,
            concurrency,
            lanes: Mutex::new(HashMap::new()),
        });
        self
    }

    /// Freeze the registrations into an engine.
    pub fn build(self) -> RenderEngine {
        RenderEngine {
            inner: Arc::new(Inner {
                registrations: self.registrations.into_iter().map(Arc::new).collect(),
                root: CancellationToken::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl RenderEngine {
    /// Start collecting registrations.
    pub fn builder() -> RenderEngineBuilder {
        RenderEngineBuilder::default()
    }

    fn route(&self, action_type: &str) -> Option<&Arc<Registration>> {
        self.inner
            .registrations
            .iter()
            .find(|r| r.matcher.matches(action_type))
    }

    /// The policy that governs `action_type`, if any renderer covers it.
    pub fn policy_for(&self, action_type: &str) -> Option<Concurrency> {
        self.route(action_type).map(|r| r.concurrency)
    }

    /// Hand `action` to the renderer registered for its type.
    ///
    /// Returns at once. With no matching renderer the handle is already
    /// settled with [`RenderOutcome::Skipped`]; a busy `mute` renderer
    /// settles it with [`RenderOutcome::Dropped`]. Starting an invocation
    /// needs a Tokio runtime; outside one the handle settles as failed.
    pub fn submit(&self, action: Action) -> RenderHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let Some(registration) = self.route(action.action_type()) else {
            tracing::trace!(
                action_type = action.action_type(),
                "antares.engine.no_renderer"
            );
            return RenderHandle::ready(id, action, RenderOutcome::Skipped);
        };

        if self.inner.root.is_cancelled() {
            return RenderHandle::ready(id, action, RenderOutcome::Cancelled);
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                action_type = action.action_type(),
                "antares.engine.no_runtime"
            );
            return RenderHandle::ready(
                id,
                action,
                RenderOutcome::Failed(RenderError::Failed(
                    "renderers need a Tokio runtime".into(),
                )),
            );
        };

        let action_type = action.action_type().to_owned();
        let token = self.inner.root.child_token();
        let (tx, rx) = oneshot::channel();
        let handle = RenderHandle::new(id, action.clone(), token.clone(), rx);
        let pending = Pending {
            id,
            action,
            token,
            tx,
        };

        let admission = registration
            .lanes()
            .entry(action_type.clone())
            .or_default()
            .admit(registration.concurrency, pending);

        match admission {
            Admission::Start(pending) => {
                spawn_invocation(&runtime, Arc::clone(registration), action_type, pending);
            }
            Admission::Queued => {
                tracing::trace!(invocation = id, action_type = %action_type, "antares.engine.queued");
            }
            Admission::Dropped(pending) => {
                tracing::debug!(invocation = id, action_type = %action_type, "antares.engine.muted");
                let _ = pending.tx.send(RenderOutcome::Dropped);
            }
        }

        handle
    }

    /// The most recent result for `action_type` that was kept. Results of
    /// cancelled invocations never appear here.
    pub fn current(&self, action_type: &str) -> Option<serde_json::Value> {
        let registration = self.route(action_type)?;
        registration.lanes().get(action_type).and_then(Lane::current)
    }

    /// Invocations of `action_type` currently running.
    pub fn in_flight(&self, action_type: &str) -> usize {
        self.route(action_type)
            .and_then(|r| r.lanes().get(action_type).map(Lane::in_flight))
            .unwrap_or(0)
    }

    /// Invocations of `action_type` waiting for a serial renderer.
    pub fn queued(&self, action_type: &str) -> usize {
        self.route(action_type)
            .and_then(|r| r.lanes().get(action_type).map(Lane::queued))
            .unwrap_or(0)
    }

    /// Number of action types the engine is holding bookkeeping for: those
    /// with invocations running or queued, or with a kept result. A type
    /// whose invocations all ended without a kept result is forgotten.
    pub fn tracked_types(&self) -> usize {
        self.inner
            .registrations
            .iter()
            .map(|r| r.lanes().len())
            .sum()
    }

    /// Cancel every running and queued invocation. Later submissions
    /// settle as cancelled without running.
    pub fn shutdown(&self) {
        tracing::debug!("antares.engine.shutdown");
        self.inner.root.cancel();
    }

    /// Whether [`RenderEngine::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Run one invocation. The renderer gets its own task so that a panic is
/// contained and the lane is always settled.
fn spawn_invocation(
    runtime: &Handle,
    registration: Arc<Registration>,
    action_type: String,
    pending: Pending,
) {
    let Pending {
        id,
        action,
        token,
        tx,
    } = pending;

    tracing::trace!(invocation = id, action_type = %action_type, "antares.engine.start");
    let renderer = Arc::clone(&registration.renderer);
    let ctx = RenderContext::new(id, token.clone());
    let task = runtime.spawn(async move { renderer.render(action, ctx).await });

    let next_runtime = runtime.clone();
    runtime.spawn(async move {
        let result = task.await.map_err(|e| e.to_string());
        let (outcome, next) = registration.settle(&action_type, id, &token, result);
        tracing::debug!(
            invocation = id,
            action_type = %action_type,
            completed = outcome.is_completed(),
            "antares.engine.settled"
        );
        let _ = tx.send(outcome);
        if let Some(next) = next {
            spawn_invocation(&next_runtime, registration, action_type, next);
        }
    });
}
