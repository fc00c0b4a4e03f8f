//! Filters most agents want.

use antares_core::{Filter, FilterAction, FilterContext, FilterError, MetaUpdate, Store};
use std::sync::Arc;

/// Stamps `meta.antares.agentId` with the id of the agent running the
/// pipeline. Every other metadata field is left as it was.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentConfigFilter;

impl AgentConfigFilter {
    /// Create a new `AgentConfigFilter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Filter for AgentConfigFilter {
    fn name(&self) -> &str {
        "agent_config"
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        Ok(FilterAction::Merge(
            MetaUpdate::new().agent_id(ctx.agent_id.clone()),
        ))
    }
}

/// Stamps a random `meta.antares.actionId` on actions that don't have one.
/// An id survives relay hops, so every agent sees the same one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdFilter;

impl RandomIdFilter {
    /// Metadata field the id is written to.
    pub const FIELD: &'static str = "actionId";

    /// Create a new `RandomIdFilter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Filter for RandomIdFilter {
    fn name(&self) -> &str {
        "random_id"
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        if ctx.action.antares().extra.contains_key(Self::FIELD) {
            return Ok(FilterAction::Continue);
        }
        let id = uuid::Uuid::new_v4().to_string();
        Ok(FilterAction::Merge(
            MetaUpdate::new().antares_field(Self::FIELD, serde_json::Value::String(id)),
        ))
    }
}

/// Hands every action to a collaborator [`Store`] as a deferred effect.
///
/// Use this on agents that should reduce relayed actions as well as their
/// own. Agents configured with a store through their builder already
/// reduce on `announce`; adding this filter as well reduces twice.
pub struct StoreFilter {
    store: Arc<dyn Store>,
}

impl StoreFilter {
    /// Create a filter that dispatches into `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl Filter for StoreFilter {
    fn name(&self) -> &str {
        "store"
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        let store = Arc::clone(&self.store);
        let action = ctx.action.clone();
        Ok(FilterAction::defer(async move {
            store
                .dispatch(&action)
                .await
                .map(|_| ())
                .map_err(|e| FilterError::Other(Box::new(e)))
        }))
    }
}

/// A [`Filter`] that emits a structured [`tracing`] event per action.
///
/// Always returns [`FilterAction::Continue`]; it observes and never changes
/// the action. Events are emitted at `DEBUG` as `antares.filter.action`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFilter;

impl TracingFilter {
    /// Create a new `TracingFilter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Filter for TracingFilter {
    fn name(&self) -> &str {
        "tracing"
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        let meta = ctx.action.antares();
        tracing::debug!(
            agent = %ctx.agent_id,
            action_type = ctx.action.action_type(),
            origin = meta.origin_agent_id.as_ref().map(|id| id.as_str()),
            push = ?meta.push,
            local_only = meta.local_only,
            "antares.filter.action"
        );
        Ok(FilterAction::Continue)
    }
}
