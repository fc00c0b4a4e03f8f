//! The Filter interface: functions run on every action entering an agent.

use crate::{
    action::{Action, MetaUpdate},
    error::FilterError,
    id::AgentId,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// An async side effect scheduled by a filter. It runs independently of
/// the pipeline and never changes the action.
pub type DeferredEffect = Pin<Box<dyn Future<Output = Result<(), FilterError>> + Send + 'static>>;

/// What a filter sees. Read-only; filters describe changes through
/// [`FilterAction::Merge`], they don't mutate the action.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// The action as left by the previous filter.
    pub action: &'a Action,
    /// The agent running the pipeline.
    pub agent_id: &'a AgentId,
    /// Whether that agent is a relay hub.
    pub relay_actions: bool,
}

impl<'a> FilterContext<'a> {
    /// Create a context for a non-hub agent.
    pub fn new(action: &'a Action, agent_id: &'a AgentId) -> Self {
        Self {
            action,
            agent_id,
            relay_actions: false,
        }
    }

    /// Mark the running agent as a relay hub.
    pub fn with_relay_actions(mut self, relay_actions: bool) -> Self {
        self.relay_actions = relay_actions;
        self
    }
}

/// What a filter decides to do.
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the action on unchanged.
    Continue,
    /// Pass on a copy with these metadata overrides. Downstream filters and
    /// the render engine see the new action.
    Merge(MetaUpdate),
    /// Pass the action on unchanged and run this side effect asynchronously.
    Defer(DeferredEffect),
}

impl FilterAction {
    /// Box a future as a deferred side effect.
    pub fn defer<F>(effect: F) -> Self
    where
        F: Future<Output = Result<(), FilterError>> + Send + 'static,
    {
        FilterAction::Defer(Box::pin(effect))
    }
}

impl fmt::Debug for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterAction::Continue => f.write_str("Continue"),
            FilterAction::Merge(update) => f.debug_tuple("Merge").field(update).finish(),
            FilterAction::Defer(_) => f.write_str("Defer(..)"),
        }
    }
}

/// A function run on every action passing through an agent.
///
/// Filters run synchronously and in registration order. Returning an error
/// aborts the rest of the pipeline and the error reaches the caller of
/// `process`/`announce`. Work that has to wait on I/O goes in a
/// [`FilterAction::Defer`].
///
/// Implementations:
/// - AgentConfigFilter: stamp `agentId`
/// - RandomIdFilter: stamp a unique `actionId`
/// - StoreFilter: hand the action to a collaborator store
/// - TracingFilter: emit a `tracing` event per action
pub trait Filter: Send + Sync {
    /// Name used in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Inspect the action and decide what happens to it.
    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError>;
}

/// A [`Filter`] backed by a closure. Build one with [`filter_fn`].
pub struct FnFilter<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`Filter`].
pub fn filter_fn<F>(name: impl Into<String>, f: F) -> FnFilter<F>
where
    F: Fn(&FilterContext<'_>) -> Result<FilterAction, FilterError> + Send + Sync,
{
    FnFilter {
        name: name.into(),
        f,
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&FilterContext<'_>) -> Result<FilterAction, FilterError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        (self.f)(ctx)
    }
}
