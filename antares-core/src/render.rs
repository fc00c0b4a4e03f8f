//! The Render interface: type-keyed side effects under a concurrency policy.

use crate::{action::Action, error::RenderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// How overlapping invocations of one renderer for one action type are
/// scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Every action starts a new invocation immediately. Nothing is
    /// delayed, dropped, or cancelled because of another invocation.
    #[default]
    Parallel,
    /// Actions queue FIFO; at most one invocation runs at a time.
    Serial,
    /// A new action cancels the running invocation and starts at once.
    Cutoff,
    /// While an invocation runs, new actions are dropped.
    Mute,
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Concurrency::Parallel => "parallel",
            Concurrency::Serial => "serial",
            Concurrency::Cutoff => "cutoff",
            Concurrency::Mute => "mute",
        })
    }
}

impl FromStr for Concurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel" => Ok(Concurrency::Parallel),
            "serial" => Ok(Concurrency::Serial),
            "cutoff" => Ok(Concurrency::Cutoff),
            "mute" => Ok(Concurrency::Mute),
            other => Err(format!("unknown concurrency policy: {other}")),
        }
    }
}

/// Which action types a renderer registration covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionMatcher {
    /// Every action type.
    Any,
    /// Exactly this type.
    Exact(String),
    /// Every type starting with this prefix.
    Prefix(String),
}

impl ActionMatcher {
    /// Whether this matcher covers `action_type`.
    pub fn matches(&self, action_type: &str) -> bool {
        match self {
            ActionMatcher::Any => true,
            ActionMatcher::Exact(t) => t == action_type,
            ActionMatcher::Prefix(p) => action_type.starts_with(p.as_str()),
        }
    }
}

/// `"*"` matches everything, `"game/*"` matches by prefix, anything else
/// matches exactly.
impl From<&str> for ActionMatcher {
    fn from(s: &str) -> Self {
        if s == "*" {
            ActionMatcher::Any
        } else if let Some(prefix) = s.strip_suffix('*') {
            ActionMatcher::Prefix(prefix.to_owned())
        } else {
            ActionMatcher::Exact(s.to_owned())
        }
    }
}

impl From<String> for ActionMatcher {
    fn from(s: String) -> Self {
        ActionMatcher::from(s.as_str())
    }
}

/// Per-invocation context handed to a renderer.
///
/// Cancellation is cooperative: a renderer that never looks at the token
/// still runs to completion, but the engine discards its result.
#[derive(Debug, Clone)]
pub struct RenderContext {
    invocation: u64,
    token: CancellationToken,
}

impl RenderContext {
    /// Create a context for invocation `invocation` cancelled via `token`.
    pub fn new(invocation: u64, token: CancellationToken) -> Self {
        Self { invocation, token }
    }

    /// Engine-assigned id of this invocation.
    pub fn invocation(&self) -> u64 {
        self.invocation
    }

    /// Poll for cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once this invocation is cancelled. Use in `tokio::select!`.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The underlying token, for handing to nested work.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A side effect run for actions of a given type.
///
/// The engine calls `render` on a spawned task; the returned value is the
/// invocation's result and is reported on its handle.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Run the side effect for one action.
    async fn render(
        &self,
        action: Action,
        ctx: RenderContext,
    ) -> Result<serde_json::Value, RenderError>;
}

/// A [`Renderer`] backed by an async closure. Build one with [`renderer_fn`].
pub struct FnRenderer<F> {
    f: F,
}

/// Wrap an async closure as a [`Renderer`].
pub fn renderer_fn<F, Fut>(f: F) -> FnRenderer<F>
where
    F: Fn(Action, RenderContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, RenderError>> + Send,
{
    FnRenderer { f }
}

#[async_trait]
impl<F, Fut> Renderer for FnRenderer<F>
where
    F: Fn(Action, RenderContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, RenderError>> + Send,
{
    async fn render(
        &self,
        action: Action,
        ctx: RenderContext,
    ) -> Result<serde_json::Value, RenderError> {
        (self.f)(action, ctx).await
    }
}

/// How one invocation ended, as reported on its handle.
#[non_exhaustive]
#[derive(Debug)]
pub enum RenderOutcome {
    /// The renderer finished and its result is current.
    Completed(serde_json::Value),
    /// The renderer returned an error or panicked.
    Failed(RenderError),
    /// The invocation was cancelled; any result it produced was discarded.
    Cancelled,
    /// A `mute` renderer was busy; the renderer was never called.
    Dropped,
    /// No renderer is registered for the action type.
    Skipped,
}

impl RenderOutcome {
    /// Whether the renderer ran to completion and its result was kept.
    pub fn is_completed(&self) -> bool {
        matches!(self, RenderOutcome::Completed(_))
    }

    /// The kept result, if any.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            RenderOutcome::Completed(v) => Some(v),
            _ => None,
        }
    }
}
