//! Append-only text logs in the destination directory.
//!
//! * [`ErrorSink`] — `ErrorLog.txt`: one entry per failed record or unit,
//!   each followed by a blank line.
//! * [`SummarySink`] — `export.log`: one fixed-format banner per run.
//!
//! Both files are opened per write in append mode and never truncated.

use crate::output::{ExportSummary, RunState};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const RULE: &str = "================================================================";
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

fn append(path: &Path, text: &str, sync: bool) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

// ── Error log ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ErrorSink {
    path: PathBuf,
}

impl ErrorSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` followed by a blank line.
    ///
    /// A failure to write the error log is itself only logged: losing an
    /// error entry must not stop the run.
    pub fn append(&self, message: &str) {
        if let Err(e) = append(&self.path, &format!("{message}\n\n"), false) {
            warn!(
                "Could not append to {}: {} (entry: {})",
                self.path.display(),
                e,
                message
            );
        }
    }
}

// ── Summary log ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SummarySink {
    path: PathBuf,
}

impl SummarySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the banner for a finished run and sync it to disk.
    pub fn write(&self, summary: &ExportSummary, state: RunState) -> io::Result<()> {
        append(&self.path, &format_banner(summary, state), true)
    }
}

fn timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Render the `export.log` banner for one run.
pub fn format_banner(summary: &ExportSummary, state: RunState) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "                    Extraction Information".to_string(),
        RULE.to_string(),
        format!("     Extraction Started: {}", timestamp(&summary.started_at)),
        String::new(),
        format!("     Drawer Id: {}", summary.drawer.id),
        format!("     Drawer Name: {}", summary.drawer.name),
        String::new(),
        format!("     Export Destination: {}", summary.destination.display()),
        String::new(),
        format!("     Total Records: {}", summary.total_records),
        format!("     Total Successful Exports: {}", summary.success_count),
    ];
    if summary.failure_count > 0 {
        lines.push(format!("     Errors: {}", summary.failure_count));
    }
    lines.push(String::new());

    let footer = match state {
        RunState::Cancelled => "Extraction Cancelled",
        RunState::Completed => "Extraction Completed",
    };
    lines.push(format!("     {footer}: {}", timestamp(&summary.finished_at)));
    lines.push(RULE.to_string());
    lines.push(RULE.to_string());

    let mut banner = lines.join("\n");
    banner.push('\n');
    banner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DrawerInfo;
    use chrono::TimeZone;

    fn summary(failures: usize) -> ExportSummary {
        let started_at = Local.with_ymd_and_hms(2026, 10, 19, 9, 15, 2).unwrap();
        let finished_at = Local.with_ymd_and_hms(2026, 10, 19, 21, 15, 9).unwrap();
        ExportSummary {
            total_records: 2,
            retrieved_records: 2,
            processed_records: 2,
            success_count: 3,
            failure_count: failures,
            started_at,
            finished_at,
            destination: PathBuf::from("/exports/run1"),
            drawer: DrawerInfo::new("7", "Invoices"),
            ..Default::default()
        }
    }

    #[test]
    fn banner_layout() {
        let banner = format_banner(&summary(1), RunState::Completed);
        let lines: Vec<&str> = banner.lines().collect();

        assert_eq!(lines[0], RULE);
        assert_eq!(lines[1].trim(), "Extraction Information");
        assert_eq!(lines[3], "     Extraction Started: 10/19/2026 09:15:02 AM");
        assert_eq!(lines[5], "     Drawer Id: 7");
        assert_eq!(lines[6], "     Drawer Name: Invoices");
        assert_eq!(lines[8], "     Export Destination: /exports/run1");
        assert_eq!(lines[10], "     Total Records: 2");
        assert_eq!(lines[11], "     Total Successful Exports: 3");
        assert_eq!(lines[12], "     Errors: 1");
        assert_eq!(lines[14], "     Extraction Completed: 10/19/2026 09:15:09 PM");
        assert_eq!(lines[15], RULE);
        assert_eq!(lines[16], RULE);
        assert_eq!(lines.len(), 17);
    }

    #[test]
    fn errors_line_only_when_failures() {
        let banner = format_banner(&summary(0), RunState::Completed);
        assert!(!banner.contains("Errors:"));
    }

    #[test]
    fn cancelled_footer() {
        let banner = format_banner(&summary(0), RunState::Cancelled);
        assert!(banner.contains("     Extraction Cancelled: "));
        assert!(!banner.contains("Extraction Completed"));
    }

    #[test]
    fn summary_sink_appends_banners() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SummarySink::new(dir.path().join("export.log"));
        sink.write(&summary(0), RunState::Completed).unwrap();
        sink.write(&summary(0), RunState::Completed).unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(text.matches("Extraction Information").count(), 2);
    }

    #[test]
    fn error_sink_separates_entries_with_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ErrorSink::new(dir.path().join("ErrorLog.txt"));
        sink.append("Error Retrieving Images [F1]");
        sink.append("second");

        let text = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(text, "Error Retrieving Images [F1]\n\nsecond\n\n");
    }

    #[test]
    fn error_sink_survives_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ErrorSink::new(dir.path().join("missing").join("ErrorLog.txt"));
        sink.append("lost");
        assert!(!sink.path().exists());
    }
}
