#![deny(missing_docs)]
//! The antares agent.
//!
//! An [`Agent`] binds an identity, a [`FilterPipeline`] and a
//! [`RenderEngine`]. Actions arriving from peers go through
//! [`Agent::process`]; actions originating here go through
//! [`Agent::announce`], which also reduces them into the collaborator
//! store and notifies the parent agent.
//!
//! ```no_run
//! # use antares_agent::{Agent, AgentConfig};
//! # use antares_core::{Action, Concurrency};
//! # async fn demo(renderer: std::sync::Arc<dyn antares_core::Renderer>) -> Result<(), antares_core::AntaresError> {
//! let agent = Agent::builder(AgentConfig::new().agent_id("player1"))
//!     .on("Game.question", renderer, Concurrency::Cutoff)
//!     .build();
//! agent.announce(Action::new("Game.answer", serde_json::json!("Paris"))).await?;
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::AgentConfig;

use antares_core::{
    ANTARES_INIT, Action, ActionMatcher, AgentId, AntaresError, Concurrency, Filter, MetaUpdate,
    ParentNotifier, Renderer, Store,
};
use antares_engine::{RenderEngine, RenderEngineBuilder, RenderHandle};
use antares_filters::FilterPipeline;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;

/// One processing unit in an antares topology.
pub struct Agent {
    id: AgentId,
    relay_actions: bool,
    parent_agent_id: RwLock<Option<AgentId>>,
    pipeline: FilterPipeline,
    engine: RenderEngine,
    store: Option<Arc<dyn Store>>,
    notifier: Option<Arc<dyn ParentNotifier>>,
}

/// Collects an agent's filters, renderers and collaborators.
#[must_use]
pub struct AgentBuilder {
    config: AgentConfig,
    pipeline: FilterPipeline,
    engine: RenderEngineBuilder,
    store: Option<Arc<dyn Store>>,
    notifier: Option<Arc<dyn ParentNotifier>>,
}

/// Everything [`Agent::process_with_handle`] started.
#[derive(Debug)]
pub struct Processed {
    /// The action as left by the filter pipeline.
    pub action: Action,
    /// The renderer invocation for the action (settled as skipped when no
    /// renderer covers its type).
    pub render: RenderHandle,
    /// Side effects deferred by filters, still running.
    pub deferred: Vec<JoinHandle<()>>,
}

impl AgentBuilder {
    /// Append a filter to the pipeline.
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.pipeline.add(filter);
        self
    }

    /// Register a renderer for actions matching `matcher`.
    pub fn on(
        mut self,
        matcher: impl Into<ActionMatcher>,
        renderer: Arc<dyn Renderer>,
        concurrency: Concurrency,
    ) -> Self {
        self.engine = self.engine.on(matcher, renderer, concurrency);
        self
    }

    /// The store that [`Agent::announce`] reduces into.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// The hook that [`Agent::announce`] uses to reach the parent agent.
    pub fn notifier(mut self, notifier: Arc<dyn ParentNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the agent. Picks a random id if the config has none.
    pub fn build(self) -> Agent {
        let id = self
            .config
            .agent_id
            .unwrap_or_else(|| AgentId::new(uuid::Uuid::new_v4().to_string()));
        tracing::debug!(
            agent = %id,
            relay_actions = self.config.relay_actions,
            filters = self.pipeline.len(),
            "antares.agent.built"
        );
        Agent {
            id,
            relay_actions: self.config.relay_actions,
            parent_agent_id: RwLock::new(self.config.parent_agent_id),
            pipeline: self.pipeline,
            engine: self.engine.build(),
            store: self.store,
            notifier: self.notifier,
        }
    }
}

impl Agent {
    /// Start building an agent from `config`.
    pub fn builder(config: AgentConfig) -> AgentBuilder {
        AgentBuilder {
            config,
            pipeline: FilterPipeline::new(),
            engine: RenderEngine::builder(),
            store: None,
            notifier: None,
        }
    }

    /// This agent's identity.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Whether this agent is a relay hub.
    pub fn relay_actions(&self) -> bool {
        self.relay_actions
    }

    /// The agent this one was initialized from, once an `Antares.init`
    /// action naming it has been processed.
    pub fn parent_agent_id(&self) -> Option<AgentId> {
        self.parent_agent_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The renderer engine, for reading current results or shutting down.
    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    /// Run `action` through the filters and hand it to the renderers.
    /// Returns the filtered action without waiting for any renderer.
    pub fn process(&self, action: Action) -> Result<Action, AntaresError> {
        Ok(self.process_with_handle(action)?.action)
    }

    /// [`Agent::process`], keeping hold of the renderer handle and the
    /// filters' deferred effects.
    pub fn process_with_handle(&self, action: Action) -> Result<Processed, AntaresError> {
        action.validate()?;

        let filtered = self.pipeline.run(&self.id, self.relay_actions, action)?;

        // only an accepted init may move the agent
        if filtered.action.action_type() == ANTARES_INIT {
            if let Some(parent) = &filtered.action.antares().parent_agent_id {
                tracing::debug!(agent = %self.id, parent = %parent, "antares.agent.parent");
                *self
                    .parent_agent_id
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(parent.clone());
            }
        }

        let render = self.engine.submit(filtered.action.clone());
        tracing::trace!(
            agent = %self.id,
            action_type = filtered.action.action_type(),
            invocation = render.id(),
            "antares.agent.process"
        );
        Ok(Processed {
            action: filtered.action,
            render,
            deferred: filtered.deferred,
        })
    }

    /// Originate `action` at this agent.
    ///
    /// Stamps `originAgentId` unless already set, processes the action,
    /// waits for the store to reduce it, then notifies the parent unless
    /// the action is `localOnly`. A reduction failure is returned as
    /// [`AntaresError::Reduction`] and the parent is not notified. A
    /// notification failure is returned as
    /// [`AntaresError::ParentNotification`]; the reduction stands.
    pub async fn announce(&self, action: Action) -> Result<Action, AntaresError> {
        action.validate()?;
        let action = if action.antares().origin_agent_id.is_none() {
            action.with_meta(MetaUpdate::new().origin_agent_id(self.id.clone()))
        } else {
            action
        };

        tracing::debug!(
            agent = %self.id,
            action_type = action.action_type(),
            "antares.agent.announce"
        );
        let processed = self.process_with_handle(action)?;
        let action = processed.action;

        if let Some(store) = &self.store {
            store.dispatch(&action).await.map_err(|e| {
                tracing::debug!(agent = %self.id, error = %e, "antares.agent.reduction_failed");
                AntaresError::Reduction(e)
            })?;
        }

        if action.antares().local_only {
            return Ok(action);
        }
        if let Some(notifier) = &self.notifier {
            notifier.notify_parent(&action).await.map_err(|e| {
                tracing::debug!(agent = %self.id, error = %e, "antares.agent.notify_failed");
                AntaresError::ParentNotification(e)
            })?;
        }

        Ok(action)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("relay_actions", &self.relay_actions)
            .field("parent_agent_id", &self.parent_agent_id())
            .field("filters", &self.pipeline.len())
            .finish_non_exhaustive()
    }
}
