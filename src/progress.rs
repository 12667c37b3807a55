//! Progress-callback trait for per-record export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events while the export worker walks the drawer.
//!
//! Callbacks run on the export worker thread, never on the caller's thread.
//! They should return quickly; forward to a channel (see
//! [`crate::stream::event_channel`]) or a UI dispatcher when the receiving
//! side needs its own thread.
//!
//! # Example
//!
//! ```rust
//! use drawer_export::{ExportConfig, ExportProgress, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LastPercentage(AtomicUsize);
//!
//! impl ExportProgressCallback for LastPercentage {
//!     fn on_progress(&self, progress: &ExportProgress) {
//!         self.0.store(progress.percentage as usize, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(Arc::new(LastPercentage(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ExportProgress, ExportSummary};
use std::sync::Arc;

/// Called by the export worker as it processes each record.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Exactly one of `on_completed`, `on_cancelled` or
/// `on_aborted` is called per run, and it is always the last event.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once after the records were retrieved and the destination is
    /// ready, before any record is processed.
    fn on_export_start(&self, total_records: usize) {
        let _ = total_records;
    }

    /// Called when a record is skipped because it has no pages.
    fn on_record_excluded(&self, folder_id: &str, remaining_records: usize) {
        let _ = (folder_id, remaining_records);
    }

    /// Called after every processed record, in record order.
    fn on_progress(&self, progress: &ExportProgress) {
        let _ = progress;
    }

    /// Called once the summary log has been written for a finished run.
    fn on_completed(&self, summary: &ExportSummary) {
        let _ = summary;
    }

    /// Called once the summary log has been written for a cancelled run.
    fn on_cancelled(&self, summary: &ExportSummary) {
        let _ = summary;
    }

    /// Called when a fatal error stops the run.
    fn on_aborted(&self, reason: &str) {
        let _ = reason;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
