//! Error types for the drawer-export library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExportError`] — **Fatal**: the run cannot start or cannot continue
//!   (record source unreachable, destination not writable, index file cannot
//!   be opened, another run already in flight). Returned as `Err(ExportError)`
//!   from [`crate::export::run_export`] and [`crate::export::ExportHandle::wait`].
//!
//! * [`PageError`] — **Non-fatal**: a single record or output unit failed
//!   (no pages, unsupported format, unreadable PDF, write failure). Stored in
//!   [`crate::pipeline::render::RenderUnit`], appended to `ErrorLog.txt` and
//!   counted as a failure; the run moves on to the next unit.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the drawer-export library.
#[derive(Debug, Error)]
pub enum ExportError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Records could not be retrieved at all.
    #[error("Record source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    // ── Scheduling errors ─────────────────────────────────────────────────
    /// A run is already in flight on this exporter.
    #[error("An export is already running; wait for it to finish or cancel it first")]
    AlreadyRunning,

    // ── Destination errors ────────────────────────────────────────────────
    /// The destination or its `Images/` directory could not be created.
    #[error("Cannot create export destination '{path}': {source}")]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index file could not be opened for appending.
    #[error("Cannot open index file '{path}': {source}")]
    IndexUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The end-of-run summary could not be written.
    #[error("Failed to write export summary '{path}': {source}")]
    SummaryWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panicked etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single record, page or output unit.
///
/// The `Display` text is what lands in `ErrorLog.txt`.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The record yielded no pages.
    #[error("Error Retrieving Images [{folder_id}]{}", detail_suffix(.detail))]
    NoPages {
        folder_id: String,
        detail: Option<String>,
    },

    /// Raster page stored in a format the exporter does not read.
    #[error("Invalid Image or Format Type {{ {format} : {location} }}")]
    UnsupportedFormat { format: String, location: PathBuf },

    /// A raster page could not be opened or decoded.
    #[error("Unreadable image '{location}': {detail}")]
    SourceUnreadable { location: PathBuf, detail: String },

    /// A PDF page could not be opened as a document.
    #[error("Unreadable PDF '{location}': {detail}")]
    PdfUnreadable { location: PathBuf, detail: String },

    /// One internal page of a PDF failed to rasterise.
    #[error("Rasterisation failed for page {page} of '{location}': {detail}")]
    RasterisationFailed {
        location: PathBuf,
        page: usize,
        detail: String,
    },

    /// A PDF page was met but no PDF engine is configured.
    #[error("No PDF engine available to render '{location}'")]
    PdfEngineUnavailable { location: PathBuf },

    /// The output raster could not be encoded or written.
    #[error("Failed to write output image '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// No output slot could be probed in the images directory.
    #[error("No output slot available: {detail}")]
    SlotUnavailable { detail: String },

    /// The index line for a produced file could not be appended.
    #[error("Failed to append index line for '{path}': {detail}")]
    IndexWriteFailed { path: PathBuf, detail: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}
