//! Channel-backed event stream for export progress.
//!
//! The progress callback runs on the export worker. Callers living on an
//! async runtime (or a UI thread) usually want the events delivered to them
//! instead; [`event_channel`] returns a callback that forwards every event
//! into an unbounded channel, plus the receiving [`EventStream`].
//!
//! Sending never blocks the worker. The stream ends once the callback (and
//! with it the config holding it) has been dropped.
//!
//! ```rust,no_run
//! use drawer_export::{event_channel, ExportConfig, ExportEvent, Exporter, ManifestSource};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (callback, mut events) = event_channel();
//! let config = ExportConfig::builder().progress_callback(callback).build()?;
//! let exporter = Exporter::new(ManifestSource::new("drawer.json"), config);
//! let _handle = exporter.start_export("/exports/run1")?;
//!
//! while let Some(event) = events.next().await {
//!     if let ExportEvent::Progress(p) = &event {
//!         println!("{}%", p.percentage);
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::output::{ExportProgress, ExportSummary};
use crate::progress::{ExportProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

/// One progress notification, as an owned value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExportEvent {
    Started { total_records: usize },
    RecordExcluded { folder_id: String, remaining_records: usize },
    Progress(ExportProgress),
    Completed(ExportSummary),
    Cancelled(ExportSummary),
    Aborted { reason: String },
}

impl ExportEvent {
    /// Whether this is the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportEvent::Completed(_) | ExportEvent::Cancelled(_) | ExportEvent::Aborted { .. }
        )
    }
}

/// A boxed stream of export events.
pub type EventStream = Pin<Box<dyn Stream<Item = ExportEvent> + Send>>;

/// Progress callback that forwards every event into a channel.
pub struct ChannelProgressCallback {
    tx: mpsc::UnboundedSender<ExportEvent>,
}

impl ChannelProgressCallback {
    fn send(&self, event: ExportEvent) {
        // The receiver may have been dropped; the run continues regardless.
        let _ = self.tx.send(event);
    }
}

impl ExportProgressCallback for ChannelProgressCallback {
    fn on_export_start(&self, total_records: usize) {
        self.send(ExportEvent::Started { total_records });
    }

    fn on_record_excluded(&self, folder_id: &str, remaining_records: usize) {
        self.send(ExportEvent::RecordExcluded {
            folder_id: folder_id.to_string(),
            remaining_records,
        });
    }

    fn on_progress(&self, progress: &ExportProgress) {
        self.send(ExportEvent::Progress(progress.clone()));
    }

    fn on_completed(&self, summary: &ExportSummary) {
        self.send(ExportEvent::Completed(summary.clone()));
    }

    fn on_cancelled(&self, summary: &ExportSummary) {
        self.send(ExportEvent::Cancelled(summary.clone()));
    }

    fn on_aborted(&self, reason: &str) {
        self.send(ExportEvent::Aborted {
            reason: reason.to_string(),
        });
    }
}

/// Create a forwarding progress callback and the stream it feeds.
pub fn event_channel() -> (ProgressCallback, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: ProgressCallback = Arc::new(ChannelProgressCallback { tx });
    (callback, Box::pin(UnboundedReceiverStream::new(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_arrive_in_order_and_stream_ends() {
        let (callback, events) = event_channel();

        callback.on_export_start(2);
        callback.on_record_excluded("F1", 1);
        callback.on_progress(&ExportProgress {
            processed: 1,
            total: 1,
            success_count: 1,
            failure_count: 1,
            percentage: 100,
        });
        callback.on_completed(&ExportSummary::default());
        drop(callback);

        let collected: Vec<ExportEvent> = events.collect().await;
        assert_eq!(collected.len(), 4);
        assert_eq!(collected[0], ExportEvent::Started { total_records: 2 });
        assert!(matches!(
            &collected[1],
            ExportEvent::RecordExcluded { folder_id, remaining_records: 1 } if folder_id == "F1"
        ));
        assert!(matches!(&collected[2], ExportEvent::Progress(p) if p.percentage == 100));
        assert!(collected[3].is_terminal());
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (callback, events) = event_channel();
        drop(events);
        callback.on_aborted("gone");
    }

    #[test]
    fn event_serialises_with_tag() {
        let json = serde_json::to_value(ExportEvent::Aborted {
            reason: "disk full".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "aborted");
        assert_eq!(json["reason"], "disk full");
    }
}
