//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the batch. Callers can forward
//! events to a progress bar, a log, or a channel without the library
//! knowing how the host application communicates.

use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// Implementations must be `Send + Sync`: extraction events may fire
/// concurrently from the bounded worker pool. Generation events are
/// sequential (one in-flight request at a time), but implementations
/// should not rely on that.
///
/// All methods default to no-ops so callers only override what they
/// care about.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after input expansion, before any extraction.
    fn on_run_start(&self, total_docs: usize) {
        let _ = total_docs;
    }

    /// Called when a document has been extracted, normalized, and
    /// rendered into a prompt (or failed on the way there).
    fn on_document_prepared(&self, identifier: &str, ok: bool) {
        let _ = (identifier, ok);
    }

    /// Called just before the generation request for a document is
    /// dispatched.
    fn on_generation_start(&self, index: usize, total_docs: usize, identifier: &str) {
        let _ = (index, total_docs, identifier);
    }

    /// Called when a document reaches a terminal result.
    fn on_document_complete(&self, index: usize, total_docs: usize, identifier: &str, ok: bool) {
        let _ = (index, total_docs, identifier, ok);
    }

    /// Called once after every document has a result.
    fn on_run_complete(&self, total_docs: usize, success_count: usize) {
        let _ = (total_docs, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
