//! RecordingFilter: records every action and always returns Continue.

use crate::action::Action;
use crate::error::FilterError;
use crate::filter::{Filter, FilterAction, FilterContext};
use std::sync::Mutex;

/// A filter that records every action it sees and always returns
/// [`FilterAction::Continue`]. Use `.actions()` to inspect what was recorded.
pub struct RecordingFilter {
    name: String,
    actions: Mutex<Vec<Action>>,
}

impl RecordingFilter {
    /// Create a new RecordingFilter with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Mutex::new(Vec::new()),
        }
    }

    /// Return a snapshot of all recorded actions.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// Types of the recorded actions, in order.
    pub fn types(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.action_type().to_owned())
            .collect()
    }
}

impl Default for RecordingFilter {
    fn default() -> Self {
        Self::new("recording")
    }
}

impl Filter for RecordingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &FilterContext<'_>) -> Result<FilterAction, FilterError> {
        self.actions.lock().unwrap().push(ctx.action.clone());
        Ok(FilterAction::Continue)
    }
}
