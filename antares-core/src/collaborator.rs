//! Collaborators antares calls but does not implement.

use crate::{
    action::Action,
    error::{NotifyError, StoreError},
};
use async_trait::async_trait;

/// The backing state container that reduces actions into state.
///
/// Implementations:
/// - KeyedStore (antares-store-memory): JSON tree with keyed reducers
/// - a Redux-style store behind an FFI or channel boundary
/// - a database-backed store that diffs and persists each reduction
///
/// Antares never inspects the state beyond this call. An `Err` from
/// `dispatch` during `announce` becomes [`crate::AntaresError::Reduction`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Reduce `action` into the store and return the new state.
    async fn dispatch(&self, action: &Action) -> Result<serde_json::Value, StoreError>;
}

/// The hook that sends a locally-announced action upstream, over whatever
/// transport connects this agent to its parent.
#[async_trait]
pub trait ParentNotifier: Send + Sync {
    /// Deliver `action` to the parent agent. Resolves when the parent has
    /// accepted it, not when the parent has processed it.
    async fn notify_parent(&self, action: &Action) -> Result<(), NotifyError>;
}
