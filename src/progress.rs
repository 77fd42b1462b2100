//! Progress-callback trait for translation job events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::translate::Orchestrator::with_progress`] to observe a job as it
//! moves through upload, polling and download. The CLI uses it to drive a
//! spinner; tests use it to count polls.
//!
//! # Example
//!
//! ```rust
//! use doctrans::TranslationProgressCallback;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl TranslationProgressCallback for PollCounter {
//!     fn on_poll(&self, attempt: u32, max_attempts: u32, _seconds_remaining: Option<u64>) {
//!         self.0.store(attempt, Ordering::SeqCst);
//!         eprintln!("status check {attempt}/{max_attempts}");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the orchestrator as a job advances.
///
/// All methods default to no-ops so implementors override only what they
/// need. Implementations must be `Send + Sync`: one orchestrator serves
/// many concurrent requests.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once the request is validated and the upload is stashed.
    fn on_job_start(&self, file_name: &str, target_lang: &str) {
        let _ = (file_name, target_lang);
    }

    /// Called after the provider accepted the document.
    fn on_uploaded(&self) {}

    /// Called after each status check that did not finish the job.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed status check number
    /// * `max_attempts`: poll budget
    /// * `seconds_remaining`: provider estimate, when given
    fn on_poll(&self, attempt: u32, max_attempts: u32, seconds_remaining: Option<u64>) {
        let _ = (attempt, max_attempts, seconds_remaining);
    }

    /// Called once the translated document has been downloaded.
    fn on_done(&self, billed_characters: Option<u64>) {
        let _ = billed_characters;
    }

    /// Called when the job ends in any error state.
    fn on_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
