//! FailingStore: a collaborator store whose dispatch always fails.

use crate::action::Action;
use crate::collaborator::Store;
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A store that rejects every action and counts the attempts.
#[derive(Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    /// Create a new FailingStore.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `dispatch` was called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn dispatch(&self, action: &Action) -> Result<serde_json::Value, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::ReducerFailed(format!(
            "refusing {}",
            action.action_type()
        )))
    }
}
