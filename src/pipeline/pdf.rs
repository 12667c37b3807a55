//! PDF rasterisation seam and its pdfium implementation.
//!
//! The exporter only needs three things from a PDF engine: how many pages a
//! document has, how large each page is in points, and a bitmap of a page at
//! a requested pixel size. [`PdfEngine`] captures exactly that so the export
//! loop can be tested without a pdfium shared library.
//!
//! ## Binding pdfium
//!
//! [`PdfiumEngine::bind`] resolves the library in this order:
//!
//! 1. `PDFIUM_LIB_PATH` (file path, or directory containing the library)
//! 2. the current working directory
//! 3. the system library search path

use crate::error::{ExportError, PageError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Opens PDF documents for rasterisation.
pub trait PdfEngine: Send + Sync {
    /// Open the document at `path`.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn OpenedPdf + 'a>, PageError>;
}

/// An opened PDF document.
///
/// Page indices are 0-based.
pub trait OpenedPdf {
    fn page_count(&self) -> usize;

    /// `(width, height)` in PDF points.
    fn page_size(&self, index: usize) -> Result<(f32, f32), PageError>;

    /// Render page `index` to a bitmap of `width_px` × `height_px`.
    fn render_page(
        &self,
        index: usize,
        width_px: u32,
        height_px: u32,
    ) -> Result<DynamicImage, PageError>;
}

/// Pixel dimensions for a page of `points` size at `points_per_pixel`.
///
/// Truncates like an integer cast and never returns 0.
pub fn pixel_size(points: (f32, f32), points_per_pixel: f32) -> (u32, u32) {
    let to_px = |p: f32| ((p / points_per_pixel) as u32).max(1);
    (to_px(points.0), to_px(points.1))
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PdfEngine`] backed by `pdfium-render`.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind to a pdfium library (see module docs for the lookup order).
    pub fn bind() -> Result<Self, ExportError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(p) if !p.is_empty() => {
                let path = PathBuf::from(p);
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                Pdfium::bind_to_library(&lib)
            }
            _ => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExportError::PdfiumBindingFailed(e.to_string()))?;

        info!("Bound pdfium library");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind to the library at an explicit `path`.
    pub fn bind_from_path(path: &Path) -> Result<Self, ExportError> {
        Pdfium::bind_to_library(path)
            .map(|bindings| Self {
                pdfium: Pdfium::new(bindings),
            })
            .map_err(|e| ExportError::PdfiumBindingFailed(format!("{}: {e}", path.display())))
    }
}

impl PdfEngine for PdfiumEngine {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn OpenedPdf + 'a>, PageError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PageError::PdfUnreadable {
                location: path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        debug!(
            "PDF loaded: {} ({} pages)",
            path.display(),
            document.pages().len()
        );

        Ok(Box::new(PdfiumDocument {
            document,
            location: path.to_path_buf(),
        }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    location: PathBuf,
}

impl PdfiumDocument<'_> {
    fn page_failure(&self, index: usize, e: PdfiumError) -> PageError {
        PageError::RasterisationFailed {
            location: self.location.clone(),
            page: index + 1,
            detail: format!("{:?}", e),
        }
    }
}

impl OpenedPdf for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), PageError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| self.page_failure(index, e))?;
        Ok((page.width().value, page.height().value))
    }

    fn render_page(
        &self,
        index: usize,
        width_px: u32,
        height_px: u32,
    ) -> Result<DynamicImage, PageError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| self.page_failure(index, e))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width_px as i32)
            .set_target_height(height_px as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| self.page_failure(index, e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
