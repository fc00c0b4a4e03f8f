//! RecordingNotifier: a parent notifier that records what it was sent.

use crate::action::Action;
use crate::collaborator::ParentNotifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use std::sync::Mutex;

/// A notifier that records every action, optionally failing each call.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<Action>>,
}

impl RecordingNotifier {
    /// A notifier that accepts every action.
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records, then rejects, every action.
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Actions handed to the notifier so far.
    pub fn sent(&self) -> Vec<Action> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ParentNotifier for RecordingNotifier {
    async fn notify_parent(&self, action: &Action) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(action.clone());
        if self.fail {
            return Err(NotifyError::Failed("comm error".into()));
        }
        Ok(())
    }
}
