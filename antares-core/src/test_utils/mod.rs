//! In-memory doubles for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that make filters, renderers, and collaborators
//! observable from tests.

mod failing_store;
mod recording_filter;
mod recording_notifier;
mod recording_renderer;

pub use failing_store::FailingStore;
pub use recording_filter::RecordingFilter;
pub use recording_notifier::RecordingNotifier;
pub use recording_renderer::{RecordingRenderer, RenderEvent, RenderEventKind};
