//! The export run: record loop, notifications, and the background worker.
//!
//! [`run_export`] is the synchronous pipeline. It walks the source's records
//! in order, renders every page into `Images/`, appends index lines, logs
//! per-item failures and finishes with the summary banner. Per-item failures
//! never stop the run; only setup failures (source, destination, index) and
//! a failed summary write abort it.
//!
//! [`Exporter`] owns a record source and runs [`run_export`] on a
//! `spawn_blocking` worker, rejecting a second start while a run is in
//! flight. The returned [`ExportHandle`] cancels or awaits the run.

use crate::config::{
    ExportConfig, IndexPolicy, ERROR_LOG_FILE, IMAGES_DIR, INDEX_FILE, SUMMARY_LOG_FILE,
};
use crate::error::{ExportError, PageError};
use crate::output::{ExportReport, ExportSummary, RunState};
use crate::pipeline::accumulator::RunAccumulator;
use crate::pipeline::allocator::SequenceAllocator;
use crate::pipeline::index::IndexWriter;
use crate::pipeline::logs::{ErrorSink, SummarySink};
use crate::pipeline::render::{PageRenderer, RenderUnit};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::record::FolderRecord;
use crate::source::RecordSource;
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ── Cancellation ─────────────────────────────────────────────────────────

/// Cooperative cancellation flag, checked before each record.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop after the record in progress.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Synchronous pipeline ─────────────────────────────────────────────────

/// Export every record of `source` into `dest`.
///
/// Blocks the calling thread for the whole run; use [`Exporter`] to run it
/// in the background.
///
/// # Returns
/// `Ok(ExportReport)` with state [`RunState::Completed`] or
/// [`RunState::Cancelled`], even when individual pages failed (check
/// `summary.failure_count` and `ErrorLog.txt`).
///
/// # Errors
/// Returns `Err(ExportError)` only for fatal errors, after notifying
/// `on_aborted`:
/// - the source could not list its records (nothing is written)
/// - `dest/Images` could not be created
/// - `import.txt` could not be opened
/// - the summary banner could not be written
pub fn run_export(
    source: &mut dyn RecordSource,
    dest: &Path,
    config: &ExportConfig,
    cancel: &CancelSignal,
) -> Result<ExportReport, ExportError> {
    let callback: ProgressCallback = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));

    let result = run(source, dest, config, cancel, &callback);
    if let Err(ref e) = result {
        error!("Export aborted: {}", e);
        callback.on_aborted(&e.to_string());
    }
    result
}

fn run(
    source: &mut dyn RecordSource,
    dest: &Path,
    config: &ExportConfig,
    cancel: &CancelSignal,
    callback: &ProgressCallback,
) -> Result<ExportReport, ExportError> {
    let started_at = Local::now();
    info!("Starting export to {}", dest.display());

    // ── Step 1: Retrieve records ─────────────────────────────────────────
    let records = source
        .retrieve_records()
        .map_err(|e| ExportError::SourceUnavailable {
            reason: e.to_string(),
        })?;
    let drawer = source.active_drawer();
    info!(
        "Found {} records in drawer {} ({})",
        records.len(),
        drawer.name,
        drawer.id
    );

    // ── Step 2: Prepare destination ──────────────────────────────────────
    let images_dir = dest.join(IMAGES_DIR);
    std::fs::create_dir_all(&images_dir).map_err(|source| {
        ExportError::DestinationUnavailable {
            path: images_dir.clone(),
            source,
        }
    })?;

    let index_path = dest.join(INDEX_FILE);
    let mut index = IndexWriter::open(&index_path).map_err(|source| {
        ExportError::IndexUnavailable {
            path: index_path.clone(),
            source,
        }
    })?;
    if config.relative_index_paths {
        index = index.relative_to(dest);
    }

    let renderer = PageRenderer::new(
        config.codec(),
        config.pdf_engine.clone(),
        config.points_per_pixel,
        config.indexes_failures(),
    );
    let slots = SequenceAllocator::new(
        &images_dir,
        renderer.codec().extension(),
        config.start_sequence,
    );

    let mut ctx = RunContext {
        renderer,
        slots,
        index,
        errors: ErrorSink::new(dest.join(ERROR_LOG_FILE)),
        acc: RunAccumulator::new(records.len()),
        policy: config.index_policy,
    };

    callback.on_export_start(records.len());

    // ── Step 3: Record loop ──────────────────────────────────────────────
    let mut state = RunState::Completed;
    for mut record in records {
        if cancel.is_cancelled() {
            info!(
                "Export cancelled after {} records",
                ctx.acc.processed_records()
            );
            state = RunState::Cancelled;
            break;
        }

        match source.get_pages(&record.folder_id) {
            Ok(pages) => record.pages = pages,
            Err(e) => {
                ctx.exclude(&record, Some(e.to_string()));
                callback.on_record_excluded(&record.folder_id, ctx.acc.remaining_records());
                continue;
            }
        }
        if !record.has_pages() {
            ctx.exclude(&record, None);
            callback.on_record_excluded(&record.folder_id, ctx.acc.remaining_records());
            continue;
        }

        ctx.export_record(&record);
        ctx.acc.finish_record();
        callback.on_progress(&ctx.acc.snapshot());
    }

    // ── Step 4: Summary ──────────────────────────────────────────────────
    if let Err(e) = ctx.index.flush() {
        warn!("Failed to flush {}: {}", index_path.display(), e);
        ctx.errors.append(&format!("Failed to flush {}: {e}", index_path.display()));
    }

    let summary = ExportSummary {
        total_records: ctx.acc.remaining_records(),
        retrieved_records: ctx.acc.retrieved_records(),
        processed_records: ctx.acc.processed_records(),
        excluded_records: ctx.acc.excluded_records(),
        success_count: ctx.acc.success_count(),
        failure_count: ctx.acc.failure_count(),
        index_lines: ctx.index.lines(),
        started_at,
        finished_at: Local::now(),
        destination: dest.to_path_buf(),
        drawer,
    };

    let summary_sink = SummarySink::new(dest.join(SUMMARY_LOG_FILE));
    summary_sink
        .write(&summary, state)
        .map_err(|source| ExportError::SummaryWriteFailed {
            path: summary_sink.path().to_path_buf(),
            source,
        })?;

    info!(
        "Export {}: {} records, {} files, {} errors in {}ms",
        if state == RunState::Cancelled {
            "cancelled"
        } else {
            "completed"
        },
        summary.total_records,
        summary.success_count,
        summary.failure_count,
        summary.duration_ms()
    );

    match state {
        RunState::Cancelled => callback.on_cancelled(&summary),
        RunState::Completed => callback.on_completed(&summary),
    }

    Ok(ExportReport { state, summary })
}

/// Per-run state owned by the worker.
struct RunContext<W: Write> {
    renderer: PageRenderer,
    slots: SequenceAllocator,
    index: IndexWriter<W>,
    errors: ErrorSink,
    acc: RunAccumulator,
    policy: IndexPolicy,
}

impl<W: Write> RunContext<W> {
    /// Drop a record with no pages from the run.
    fn exclude(&mut self, record: &FolderRecord, detail: Option<String>) {
        let err = PageError::NoPages {
            folder_id: record.folder_id.clone(),
            detail,
        };
        warn!("{}", err);
        self.errors.append(&err.to_string());
        self.acc.exclude_record();
    }

    fn export_record(&mut self, record: &FolderRecord) {
        debug!(
            "Exporting record {} ({} pages)",
            record.folder_id,
            record.pages.len()
        );

        let mut key_pending = true;
        for page in &record.pages {
            let outcome = self.renderer.render(page, &mut self.slots);

            // The key goes on the first line the position-1 page emits.
            let mut key = if page.is_first() && key_pending {
                key_pending = false;
                Some(record.delimited_index.as_str())
            } else {
                None
            };

            for unit in &outcome.units {
                let success = self.settle_unit(record, unit, &mut key);
                self.acc.record_outcome(success);
            }
        }

        if let Err(e) = self.index.flush() {
            let err = PageError::IndexWriteFailed {
                path: PathBuf::from(INDEX_FILE),
                detail: e.to_string(),
            };
            self.log_failure(record, &err);
        }
    }

    /// Log and index one render unit. Returns whether it counts as a success.
    fn settle_unit(
        &mut self,
        record: &FolderRecord,
        unit: &RenderUnit,
        key: &mut Option<&str>,
    ) -> bool {
        if let Err(e) = &unit.result {
            self.log_failure(record, e);
        }

        let indexed = match (&unit.slot, self.policy) {
            (Some(slot), IndexPolicy::Always) => Some(slot),
            (Some(slot), IndexPolicy::OnSuccess) if unit.is_success() => Some(slot),
            _ => None,
        };

        let Some(slot) = indexed else {
            return unit.is_success();
        };

        // The key is spent only once a line carrying it is written.
        match self.index.write_line(*key, &slot.path) {
            Ok(()) => {
                key.take();
                unit.is_success()
            }
            Err(e) => {
                let err = PageError::IndexWriteFailed {
                    path: slot.path.clone(),
                    detail: e.to_string(),
                };
                self.log_failure(record, &err);
                false
            }
        }
    }

    fn log_failure(&mut self, record: &FolderRecord, err: &PageError) {
        warn!("Record {}: {}", record.folder_id, err);
        self.errors.append(&format!("[{}] {}", record.folder_id, err));
    }
}

// ── Background worker ────────────────────────────────────────────────────

/// Runs exports in the background, one at a time.
///
/// # Example
/// ```rust,no_run
/// use drawer_export::{ExportConfig, Exporter, ManifestSource};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let exporter = Exporter::new(ManifestSource::new("drawer.json"), ExportConfig::default());
/// let handle = exporter.start_export("/exports/run1")?;
/// let report = handle.wait().await?;
/// println!("{} files written", report.summary.success_count);
/// # Ok(())
/// # }
/// ```
pub struct Exporter {
    source: Arc<Mutex<Box<dyn RecordSource>>>,
    config: ExportConfig,
    busy: Arc<AtomicBool>,
}

impl Exporter {
    pub fn new(source: impl RecordSource + 'static, config: ExportConfig) -> Self {
        Self {
            source: Arc::new(Mutex::new(Box::new(source))),
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a run into `dest` on a blocking worker.
    ///
    /// Must be called from within a Tokio runtime. Returns
    /// [`ExportError::AlreadyRunning`] while another run is in flight.
    pub fn start_export(&self, dest: impl Into<PathBuf>) -> Result<ExportHandle, ExportError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected export start: a run is already in flight");
            return Err(ExportError::AlreadyRunning);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let dest = dest.into();
        let cancel = CancelSignal::new();
        let worker_cancel = cancel.clone();
        let source = Arc::clone(&self.source);
        let config = self.config.clone();

        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut source = source.lock().unwrap_or_else(PoisonError::into_inner);
            run_export(&mut **source, &dest, &config, &worker_cancel)
        });

        Ok(ExportHandle { task, cancel })
    }
}

/// Clears the busy flag when the worker ends, including by panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A run started by [`Exporter::start_export`].
pub struct ExportHandle {
    task: JoinHandle<Result<ExportReport, ExportError>>,
    cancel: CancelSignal,
}

impl ExportHandle {
    /// Stop the run after the record in progress.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's cancel flag, e.g. for a Ctrl-C handler.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Wait for the run to end.
    pub async fn wait(self) -> Result<ExportReport, ExportError> {
        self.task
            .await
            .map_err(|e| ExportError::Internal(format!("export worker failed: {e}")))?
    }
}
