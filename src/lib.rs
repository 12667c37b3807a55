//! # drawer-export
//!
//! Export a drawer's folder records into a flat directory of numbered
//! single-page raster files plus an import index.
//!
//! Each folder record is an ordered list of pages stored as raster images
//! (TIFF, JPEG, BMP, PNG) or PDFs. The export writes one output file per
//! page, and one per *internal* page for PDFs, into `Images/NNNN.<ext>`,
//! and one `<key>@<path>` line per file into `import.txt`, so a downstream
//! importer can re-associate the files with their records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RecordSource
//!  │
//!  ├─ 1. Retrieve  list the drawer's records (fatal on failure)
//!  ├─ 2. Prepare   create dest/Images, open import.txt (fatal on failure)
//!  ├─ 3. Per record
//!  │     ├─ pages     empty → excluded, logged, denominator shrinks
//!  │     ├─ allocate  next free NNNN.<ext>, probed on disk
//!  │     ├─ render    raster re-encode or PDF fan-out (pdfium)
//!  │     ├─ index     <key>@<path>, key on the record's first line
//!  │     └─ progress  counters + percentage → callback
//!  └─ 4. Summary   export.log banner, then one terminal notification
//! ```
//!
//! ## Output layout
//!
//! ```text
//! dest/
//! ├── Images/0001.tif, 0002.tif, …
//! ├── import.txt     INV-1@dest/Images/0001.tif
//! │                  @dest/Images/0002.tif
//! ├── ErrorLog.txt   one entry per failed record or page
//! └── export.log     one banner per run
//! ```
//!
//! Existing files are never overwritten: a second run into the same
//! destination continues numbering after the files already there and
//! appends to the index and logs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drawer_export::{ExportConfig, Exporter, ManifestSource, PdfiumEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExportConfig::builder()
//!         .pdf_engine(Arc::new(PdfiumEngine::bind()?))
//!         .build()?;
//!     let exporter = Exporter::new(ManifestSource::new("drawer.json"), config);
//!
//!     let report = exporter.start_export("/exports/run1")?.wait().await?;
//!     eprintln!("{} files, {} errors",
//!         report.summary.success_count,
//!         report.summary.failure_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `drawer-export` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! drawer-export = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod source;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder, IndexPolicy, OutputFormat};
pub use error::{ExportError, PageError};
pub use export::{run_export, CancelSignal, ExportHandle, Exporter};
pub use output::{ExportProgress, ExportReport, ExportSummary, RunState};
pub use pipeline::pdf::{PdfEngine, PdfiumEngine};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{DrawerInfo, FolderRecord, Page, PageKind, RasterFormat};
pub use source::{ManifestSource, RecordSource, SourceError};
pub use stream::{event_channel, EventStream, ExportEvent};
