#![deny(missing_docs)]
//! Ordered filter pipeline for antares agents.
//!
//! The [`FilterPipeline`] runs every action entering an agent through its
//! [`Filter`]s in registration order. Metadata merges are threaded through,
//! so each filter sees the action as left by the previous one. A filter
//! error aborts the pipeline and reaches the caller. Deferred side effects
//! are spawned and never block the pipeline; their failures are logged.

mod builtin;

pub use builtin::{AgentConfigFilter, RandomIdFilter, StoreFilter, TracingFilter};

use antares_core::{
    Action, AgentId, AntaresError, DeferredEffect, Filter, FilterAction, FilterContext,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A pipeline that runs actions through an ordered list of filters.
pub struct FilterPipeline {
    filters: Vec<Arc<dyn Filter>>,
}

/// The result of running the pipeline: the final action plus handles to
/// any side effects the filters scheduled.
#[derive(Debug)]
pub struct Filtered {
    /// The action as transformed by every filter.
    pub action: Action,
    /// Deferred side effects, still running.
    pub deferred: Vec<JoinHandle<()>>,
}

impl Filtered {
    /// Wait for every deferred side effect, then return the action.
    pub async fn settle(self) -> Action {
        for handle in self.deferred {
            // Failures were already logged by the task itself.
            let _ = handle.await;
        }
        self.action
    }
}

impl FilterPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the pipeline.
    pub fn add(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `action` through the pipeline on behalf of `agent_id`.
    ///
    /// Returns as soon as the last filter has run; deferred effects may
    /// still be pending. Must be called from within a Tokio runtime if any
    /// filter defers work.
    pub fn run(
        &self,
        agent_id: &AgentId,
        relay_actions: bool,
        action: Action,
    ) -> Result<Filtered, AntaresError> {
        let mut current = action;
        let mut deferred = Vec::new();

        for filter in &self.filters {
            let ctx = FilterContext::new(&current, agent_id).with_relay_actions(relay_actions);
            match filter.apply(&ctx) {
                Ok(FilterAction::Merge(update)) => {
                    current = current.with_meta(update);
                }
                Ok(FilterAction::Defer(effect)) => {
                    deferred.push(spawn_deferred(filter.name(), effect)?);
                }
                Ok(_) => {}
                Err(source) => {
                    tracing::debug!(
                        agent = %agent_id,
                        filter = filter.name(),
                        action_type = current.action_type(),
                        "antares.filter.abort"
                    );
                    return Err(AntaresError::Filter {
                        filter: filter.name().to_owned(),
                        source,
                    });
                }
            }
        }

        Ok(Filtered {
            action: current,
            deferred,
        })
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_deferred(filter: &str, effect: DeferredEffect) -> Result<JoinHandle<()>, AntaresError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
        AntaresError::Protocol(format!(
            "filter {filter} deferred work outside of a Tokio runtime"
        ))
    })?;
    let filter = filter.to_owned();
    Ok(runtime.spawn(async move {
        if let Err(error) = effect.await {
            tracing::warn!(filter = %filter, %error, "antares.filter.deferred_failed");
        }
    }))
}
