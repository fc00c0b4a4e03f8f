//! # antares-core: Protocol types for the antares action protocol
//!
//! This crate defines the values and seams that every other antares crate
//! composes: the immutable [`Action`] record, the filter and renderer
//! interfaces, and the traits for the collaborators antares does not own.
//!
//! ## The Pieces
//!
//! | Piece | Types | What it does |
//! |-------|-------|-------------|
//! | ① Action | [`Action`], [`Meta`], [`AntaresMeta`], [`MetaUpdate`] | Immutable typed event + append-only metadata |
//! | ② Filter | [`Filter`], [`FilterContext`], [`FilterAction`] | Runs on every action entering an agent |
//! | ③ Render | [`Renderer`], [`Concurrency`], [`RenderOutcome`] | Type-keyed side effects under a concurrency policy |
//! | ④ Collaborators | [`Store`], [`ParentNotifier`] | Reduction and upstream notification, implemented elsewhere |
//!
//! ## Dependency Notes
//!
//! Payloads and unknown metadata namespaces are `serde_json::Value`. The
//! protocol does not own a wire format, but everything it hands to a
//! transport is already serializable as JSON.

#![deny(missing_docs)]

pub mod action;
pub mod collaborator;
pub mod error;
pub mod filter;
pub mod id;
pub mod render;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use action::{
    ANTARES_INIT, ANTARES_STORE, ANTARES_UPDATE, Action, AntaresMeta, Key, Meta, MetaUpdate,
    VIEW_PREFIX,
};
pub use collaborator::{ParentNotifier, Store};
pub use error::{AntaresError, FilterError, NotifyError, RenderError, StoreError};
pub use filter::{DeferredEffect, Filter, FilterAction, FilterContext, FnFilter, filter_fn};
pub use id::AgentId;
pub use render::{
    ActionMatcher, Concurrency, FnRenderer, RenderContext, RenderOutcome, Renderer, renderer_fn,
};
