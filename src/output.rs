//! Result types reported by an export run.

use crate::record::DrawerInfo;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a run that reached its summary ended.
///
/// An aborted run has no state: it ends in an [`ExportError`](crate::ExportError)
/// instead of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Completed,
    Cancelled,
}

/// Snapshot emitted after each processed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    /// Records processed so far (excluded records are not counted).
    pub processed: usize,
    /// Current denominator: records not excluded so far.
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// `processed / total` as an integer percentage in `[0, 100]`.
    pub percentage: u8,
}

/// Aggregate counts for a finished or cancelled run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Records retrieved minus records excluded for having no pages.
    pub total_records: usize,
    /// Records originally retrieved from the source.
    pub retrieved_records: usize,
    /// Records whose pages were processed before the run ended.
    pub processed_records: usize,
    /// Records excluded for having no pages.
    pub excluded_records: usize,
    /// Output files produced.
    pub success_count: usize,
    /// Failed output units plus excluded records.
    pub failure_count: usize,
    /// Index lines appended to `import.txt`.
    pub index_lines: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub destination: PathBuf,
    pub drawer: DrawerInfo,
}

impl ExportSummary {
    /// Wall-clock duration of the run in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// What a non-aborted run returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    /// [`RunState::Completed`] or [`RunState::Cancelled`].
    pub state: RunState,
    pub summary: ExportSummary,
}
