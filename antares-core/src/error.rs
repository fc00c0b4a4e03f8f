//! Error types for each protocol seam.

use thiserror::Error;

/// Errors surfaced by agents to callers of `process` and `announce`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AntaresError {
    /// The action failed its structural contract before entering the
    /// pipeline (e.g. a missing or empty `type`).
    #[error("type validation error: {0}")]
    TypeValidation(String),

    /// The collaborator store rejected the action. Engine state is
    /// unaffected and the parent was not notified.
    #[error("reduction error: {0}")]
    Reduction(#[source] StoreError),

    /// The action was reduced locally but the parent notification failed.
    /// The local reduction is not undone.
    #[error("parent notification error: {0}")]
    ParentNotification(#[source] NotifyError),

    /// A filter failed; the remaining filters did not run.
    #[error("filter {filter} failed: {source}")]
    Filter {
        /// Name of the filter that failed.
        filter: String,
        /// What went wrong.
        #[source]
        source: FilterError,
    },

    /// No agent with this id is known to the agent set.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Misuse of the protocol.
    #[error("antares error: {0}")]
    Protocol(String),
}

/// Filter errors. These abort the rest of the pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter rejected the action.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Renderer errors. Scoped to the invocation's handle; they never escape
/// `submit` or `process`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer failed.
    #[error("render failed: {0}")]
    Failed(String),

    /// The renderer observed its cancellation signal and stopped early.
    #[error("render cancelled")]
    Cancelled,

    /// The renderer panicked.
    #[error("renderer panicked: {0}")]
    Panicked(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Collaborator store errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update targeted a key that was never stored.
    #[error("store has no value at {key}")]
    NoValueAt {
        /// The key that was targeted.
        key: String,
    },

    /// The reducer rejected the action.
    #[error("reducer failed: {0}")]
    ReducerFailed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Parent notification errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The parent could not be reached or refused the action.
    #[error("notify failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
