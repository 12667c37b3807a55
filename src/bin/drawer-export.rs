//! CLI binary for drawer-export.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExportConfig`, runs one export from a JSON manifest and prints the
//! summary.

use anyhow::{Context, Result};
use clap::Parser;
use drawer_export::{
    ExportConfig, ExportProgress, ExportProgressCallback, ExportSummary, Exporter, IndexPolicy,
    ManifestSource, OutputFormat, PdfEngine, PdfiumEngine, ProgressCallback, RunState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one bar over the drawer's records. The bar's
/// length follows the shrinking record total as empty records are excluded.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading records…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_records: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} records  {msg}  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_records as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Exporting");
        self.bar.set_message("");
    }

    fn on_record_excluded(&self, folder_id: &str, remaining_records: usize) {
        self.bar.println(format!(
            "  {} record {}  {}",
            yellow("⊘"),
            folder_id,
            dim("no pages, excluded")
        ));
        self.bar.set_length(remaining_records as u64);
    }

    fn on_progress(&self, progress: &ExportProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.processed as u64);
        self.bar.set_message(dim(&format!(
            "{} files, {} errors",
            progress.success_count, progress.failure_count
        )));
    }

    fn on_completed(&self, _summary: &ExportSummary) {
        self.bar.finish_and_clear();
    }

    fn on_cancelled(&self, _summary: &ExportSummary) {
        self.bar.finish_and_clear();
    }

    fn on_aborted(&self, _reason: &str) {
        self.bar.abandon();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export a drawer described by a manifest
  drawer-export drawer.json --dest /exports/run1

  # PNG output, index paths relative to the destination
  drawer-export drawer.json -d out --format png --relative-paths

  # Reproduce older exporters: index every attempted page
  drawer-export drawer.json -d out --index-policy always

  # JSON summary on stdout
  drawer-export drawer.json -d out --json > summary.json

MANIFEST:
  {
    "drawer":  { "id": "7", "name": "Invoices" },
    "records": [
      { "folder_id": "F-1", "delimited_index": "INV-1|2024-01-02",
        "pages": [ { "file": "store/p1.tif" }, { "file": "store/p2.pdf" } ] }
    ]
  }

OUTPUT:
  <dest>/Images/NNNN.<ext>   one file per page (one per internal PDF page)
  <dest>/import.txt          <key>@<path>, key on each record's first line
  <dest>/ErrorLog.txt        failed records and pages
  <dest>/export.log          run summary banner

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Overrides the log filter (e.g. drawer_export=debug)
"#;

/// Export drawer folder records to numbered images plus an import index.
#[derive(Parser, Debug)]
#[command(
    name = "drawer-export",
    version,
    about = "Export drawer folder records to numbered images plus an import index",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON manifest describing the drawer's records and page files.
    manifest: PathBuf,

    /// Destination directory (created if missing).
    #[arg(short, long, env = "DRAWER_EXPORT_DEST")]
    dest: PathBuf,

    /// Output image format.
    #[arg(long, env = "DRAWER_EXPORT_FORMAT", value_enum, default_value = "tiff")]
    format: FormatArg,

    /// JPEG quality (1–100), used with --format jpeg.
    #[arg(long, env = "DRAWER_EXPORT_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF points per output pixel; smaller values render larger bitmaps.
    #[arg(long, env = "DRAWER_EXPORT_POINTS_PER_PIXEL", default_value_t = 0.24)]
    points_per_pixel: f32,

    /// First sequence number to probe in Images/.
    #[arg(long, env = "DRAWER_EXPORT_START_SEQUENCE", default_value_t = 1)]
    start_sequence: u32,

    /// Which pages get an index line: on-success or always.
    #[arg(long, env = "DRAWER_EXPORT_INDEX_POLICY", value_enum, default_value = "on-success")]
    index_policy: IndexPolicyArg,

    /// Write index paths relative to the destination.
    #[arg(long, env = "DRAWER_EXPORT_RELATIVE_PATHS")]
    relative_paths: bool,

    /// Path to libpdfium. Without it PDFIUM_LIB_PATH, the working directory
    /// and the system library path are tried.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "DRAWER_EXPORT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DRAWER_EXPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DRAWER_EXPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DRAWER_EXPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Tiff,
    Png,
    Jpeg,
    Bmp,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Tiff => OutputFormat::Tiff,
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Bmp => OutputFormat::Bmp,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum IndexPolicyArg {
    OnSuccess,
    Always,
}

impl From<IndexPolicyArg> for IndexPolicy {
    fn from(v: IndexPolicyArg) -> Self {
        match v {
            IndexPolicyArg::OnSuccess => IndexPolicy::OnSuccess,
            IndexPolicyArg::Always => IndexPolicy::Always,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, bind_pdf_engine(&cli), progress_cb)?;

    // ── Run export ───────────────────────────────────────────────────────
    let exporter = Exporter::new(ManifestSource::new(&cli.manifest), config);
    let handle = exporter
        .start_export(&cli.dest)
        .context("Failed to start export")?;

    let cancel = handle.cancel_signal();
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if !quiet {
                eprintln!("{}", yellow("Cancelling after the current record…"));
            }
            cancel.cancel();
        }
    });

    let report = handle.wait().await.context("Export failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(report.state, &report.summary);
    }

    Ok(())
}

/// Bind pdfium. Without it the export still runs; PDF pages are then
/// logged as failures.
fn bind_pdf_engine(cli: &Cli) -> Option<Arc<dyn PdfEngine>> {
    let bound = match &cli.pdfium_lib {
        Some(path) => PdfiumEngine::bind_from_path(path),
        None => PdfiumEngine::bind(),
    };
    match bound {
        Ok(engine) => Some(Arc::new(engine) as Arc<dyn PdfEngine>),
        Err(e) => {
            warn!("{}", e);
            if !cli.quiet && !cli.json {
                eprintln!(
                    "{} pdfium not available, PDF pages will be logged as errors",
                    yellow("⚠")
                );
            }
            None
        }
    }
}

/// Map CLI args to `ExportConfig`.
fn build_config(
    cli: &Cli,
    pdf_engine: Option<Arc<dyn PdfEngine>>,
    progress: Option<ProgressCallback>,
) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .output_format(cli.format.into())
        .jpeg_quality(cli.jpeg_quality)
        .points_per_pixel(cli.points_per_pixel)
        .start_sequence(cli.start_sequence)
        .index_policy(cli.index_policy.into())
        .relative_index_paths(cli.relative_paths);

    if let Some(engine) = pdf_engine {
        builder = builder.pdf_engine(engine);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(state: RunState, summary: &ExportSummary) {
    let (mark, verb) = match state {
        RunState::Cancelled => (yellow("■"), "cancelled"),
        _ if summary.failure_count > 0 => (yellow("⚠"), "completed"),
        _ => (green("✔"), "completed"),
    };
    eprintln!(
        "{} Export {}  {}/{} records  {}ms  →  {}",
        mark,
        verb,
        summary.processed_records,
        summary.total_records,
        summary.duration_ms(),
        bold(&summary.destination.display().to_string()),
    );
    eprintln!(
        "   {} files written  /  {} index lines",
        bold(&summary.success_count.to_string()),
        summary.index_lines,
    );
    if summary.failure_count > 0 {
        eprintln!(
            "   {} errors ({} records without pages), see ErrorLog.txt",
            red(&summary.failure_count.to_string()),
            summary.excluded_records,
        );
    }
}
