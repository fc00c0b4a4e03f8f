#![deny(missing_docs)]
//! # antares: umbrella crate
//!
//! A single import surface for the antares action protocol. Re-exports the
//! protocol and its implementations behind feature flags, plus a `prelude`
//! for the happy path.

pub use antares_core;
#[cfg(feature = "agent")]
pub use antares_agent;
#[cfg(feature = "engine")]
pub use antares_engine;
#[cfg(feature = "filters")]
pub use antares_filters;
#[cfg(feature = "relay")]
pub use antares_relay;
#[cfg(feature = "store-memory")]
pub use antares_store_memory;

/// Happy-path imports for composing antares agents.
pub mod prelude {
    pub use antares_core::{
        Action, ActionMatcher, AgentId, AntaresError, Concurrency, Filter, FilterAction,
        FilterContext, FilterError, Key, MetaUpdate, NotifyError, ParentNotifier, RenderContext,
        RenderError, RenderOutcome, Renderer, Store, StoreError, filter_fn, renderer_fn,
    };

    #[cfg(feature = "filters")]
    pub use antares_filters::{
        AgentConfigFilter, FilterPipeline, RandomIdFilter, StoreFilter, TracingFilter,
    };

    #[cfg(feature = "engine")]
    pub use antares_engine::{RenderEngine, RenderHandle};

    #[cfg(feature = "agent")]
    pub use antares_agent::{Agent, AgentConfig, Processed};

    #[cfg(feature = "relay")]
    pub use antares_relay::{AgentSet, Relayed, Topology};

    #[cfg(feature = "store-memory")]
    pub use antares_store_memory::{AppendReducer, KeyReducer, KeyedStore, MergeReducer};
}
