//! Pipeline stages for the drawer export.
//!
//! Each submodule implements one step and is driven by
//! [`crate::export::run_export`], one record at a time.
//!
//! ## Data Flow
//!
//! ```text
//! page ──▶ allocator ──▶ render ──▶ encode ──▶ index ──▶ accumulator
//!          (NNNN slot)   (raster/   (image)    (import   (counters)
//!                         pdfium)               .txt)
//! ```
//!
//! 1. [`allocator`] — probe `Images/` for the next free `NNNN.<ext>`
//! 2. [`render`] — dispatch on the page kind; PDFs fan out to one slot per
//!    internal page through [`pdf`]
//! 3. [`encode`] — decode stored rasters, write the output format atomically
//! 4. [`index`] — append `<key>@<path>` lines
//! 5. [`accumulator`] — success / failure / record counters and percentage
//! 6. [`logs`] — `ErrorLog.txt` entries and the `export.log` banner

pub mod accumulator;
pub mod allocator;
pub mod encode;
pub mod index;
pub mod logs;
pub mod pdf;
pub mod render;
