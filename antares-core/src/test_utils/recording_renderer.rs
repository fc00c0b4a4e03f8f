//! RecordingRenderer: a timed renderer that records what happened when.

use crate::action::Action;
use crate::error::RenderError;
use crate::render::{RenderContext, Renderer};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// What happened to one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEventKind {
    /// The renderer was called.
    Started,
    /// The renderer returned after its full delay.
    Finished,
    /// The renderer saw its cancellation signal and stopped.
    Cancelled,
}

/// A recorded renderer event for inspection in tests.
#[derive(Debug, Clone)]
pub struct RenderEvent {
    /// What happened.
    pub kind: RenderEventKind,
    /// Payload of the action being rendered.
    pub payload: serde_json::Value,
    /// Time since the renderer was created.
    pub at: Duration,
}

/// A renderer that sleeps for a fixed delay and returns the action's
/// payload. By default it stops early when cancelled; see
/// [`RecordingRenderer::ignoring_cancellation`].
pub struct RecordingRenderer {
    delay: Duration,
    honor_cancel: bool,
    fail: bool,
    epoch: Instant,
    events: Mutex<Vec<RenderEvent>>,
}

impl RecordingRenderer {
    /// Create a renderer that takes `delay` per invocation.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            honor_cancel: true,
            fail: false,
            epoch: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Keep running to completion even after cancellation.
    pub fn ignoring_cancellation(mut self) -> Self {
        self.honor_cancel = false;
        self
    }

    /// Return an error instead of the payload once the delay elapses.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Return a snapshot of all recorded events.
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Payloads of events of the given kind, in the order they happened.
    pub fn payloads(&self, kind: RenderEventKind) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.payload)
            .collect()
    }

    /// `(payload, time)` of every completed invocation.
    pub fn finished(&self) -> Vec<(serde_json::Value, Duration)> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == RenderEventKind::Finished)
            .map(|e| (e.payload, e.at))
            .collect()
    }

    fn record(&self, kind: RenderEventKind, payload: &serde_json::Value) {
        self.events.lock().unwrap().push(RenderEvent {
            kind,
            payload: payload.clone(),
            at: self.epoch.elapsed(),
        });
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(
        &self,
        action: Action,
        ctx: RenderContext,
    ) -> Result<serde_json::Value, RenderError> {
        let payload = action.payload().clone();
        self.record(RenderEventKind::Started, &payload);

        if self.honor_cancel {
            tokio::select! {
                _ = ctx.cancelled() => {
                    self.record(RenderEventKind::Cancelled, &payload);
                    return Err(RenderError::Cancelled);
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        } else {
            tokio::time::sleep(self.delay).await;
        }

        self.record(RenderEventKind::Finished, &payload);
        if self.fail {
            return Err(RenderError::Failed(format!("failed on {payload}")));
        }
        Ok(payload)
    }
}
