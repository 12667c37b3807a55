//! Configuration types for a drawer export run.
//!
//! All run behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. One struct carries the encoder configuration,
//! the PDF rasterisation parameters, the index policy and the optional
//! collaborators (PDF engine, progress callback), so a run can be described
//! and logged as a single value.

use crate::error::ExportError;
use crate::pipeline::encode::ImageCodec;
use crate::pipeline::pdf::PdfEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of the image directory inside the destination.
pub const IMAGES_DIR: &str = "Images";
/// Name of the index file inside the destination.
pub const INDEX_FILE: &str = "import.txt";
/// Name of the per-item error log inside the destination.
pub const ERROR_LOG_FILE: &str = "ErrorLog.txt";
/// Name of the end-of-run summary log inside the destination.
pub const SUMMARY_LOG_FILE: &str = "export.log";

/// Configuration for an export run.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use drawer_export::{ExportConfig, IndexPolicy, OutputFormat};
///
/// let config = ExportConfig::builder()
///     .output_format(OutputFormat::Png)
///     .index_policy(IndexPolicy::Always)
///     .start_sequence(100)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_format.extension(), "png");
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Raster format written for every output file. Default: TIFF.
    pub output_format: OutputFormat,

    /// JPEG quality (1–100), used only when `output_format` is JPEG. Default: 90.
    pub jpeg_quality: u8,

    /// PDF points per output pixel. Default: 0.24.
    ///
    /// Pixel dimensions of a rasterised PDF page are
    /// `page_size_in_points / points_per_pixel`; this is the only
    /// resolution setting for PDF pages.
    pub points_per_pixel: f32,

    /// First sequence number probed in `Images/`. Default: 1.
    pub start_sequence: u32,

    /// When index lines are written. Default: [`IndexPolicy::OnSuccess`].
    pub index_policy: IndexPolicy,

    /// Write index paths relative to the destination instead of as allocated.
    /// Default: false.
    pub relative_index_paths: bool,

    /// PDF rasteriser. PDF pages fail individually when absent.
    pub pdf_engine: Option<Arc<dyn PdfEngine>>,

    /// Optional progress callback, invoked on the export worker.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
            points_per_pixel: 0.24,
            start_sequence: 1,
            index_policy: IndexPolicy::default(),
            relative_index_paths: false,
            pdf_engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("output_format", &self.output_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("points_per_pixel", &self.points_per_pixel)
            .field("start_sequence", &self.start_sequence)
            .field("index_policy", &self.index_policy)
            .field("relative_index_paths", &self.relative_index_paths)
            .field(
                "pdf_engine",
                &self.pdf_engine.as_ref().map(|_| "<dyn PdfEngine>"),
            )
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// The encoder configuration derived from this config.
    pub fn codec(&self) -> ImageCodec {
        ImageCodec::new(self.output_format, self.jpeg_quality)
    }

    /// Whether a failed unit still gets an index line (and keeps its slot).
    pub fn indexes_failures(&self) -> bool {
        self.index_policy == IndexPolicy::Always
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn points_per_pixel(mut self, scale: f32) -> Self {
        self.config.points_per_pixel = scale;
        self
    }

    pub fn start_sequence(mut self, seq: u32) -> Self {
        self.config.start_sequence = seq.max(1);
        self
    }

    pub fn index_policy(mut self, policy: IndexPolicy) -> Self {
        self.config.index_policy = policy;
        self
    }

    pub fn relative_index_paths(mut self, v: bool) -> Self {
        self.config.relative_index_paths = v;
        self
    }

    pub fn pdf_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.config.pdf_engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if !(c.points_per_pixel.is_finite() && c.points_per_pixel > 0.0) {
            return Err(ExportError::InvalidConfig(format!(
                "points-per-pixel must be a positive number, got {}",
                c.points_per_pixel
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Raster format of the exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-purpose archival format expected by most import tools. (default)
    #[default]
    Tiff,
    Png,
    Jpeg,
    Bmp,
}

impl OutputFormat {
    /// File extension used for `Images/NNNN.<ext>`.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Tiff => "tif",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Tiff => image::ImageFormat::Tiff,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Which output units get a line in `import.txt`.
///
/// | Policy | Lines written for |
/// |--------|-------------------|
/// | `OnSuccess` | files that were actually produced (default) |
/// | `Always` | every attempted unit, including failed ones whose file does not exist |
///
/// `Always` reproduces what older exporters did; downstream importers then
/// have to tolerate dangling paths. Under `Always` a failed unit also keeps
/// its sequence number, so the dangling path is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPolicy {
    #[default]
    OnSuccess,
    Always,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_older_exporters() {
        let c = ExportConfig::default();
        assert_eq!(c.points_per_pixel, 0.24);
        assert_eq!(c.start_sequence, 1);
        assert_eq!(c.output_format.extension(), "tif");
        assert_eq!(c.index_policy, IndexPolicy::OnSuccess);
        assert!(!c.indexes_failures());
    }

    #[test]
    fn builder_clamps() {
        let c = ExportConfig::builder()
            .jpeg_quality(0)
            .start_sequence(0)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.start_sequence, 1);
    }

    #[test]
    fn builder_rejects_bad_scale() {
        let err = ExportConfig::builder()
            .points_per_pixel(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));

        assert!(ExportConfig::builder()
            .points_per_pixel(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let c = ExportConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("pdf_engine: None"));
    }

    #[test]
    fn always_policy_indexes_failures() {
        let c = ExportConfig::builder()
            .index_policy(IndexPolicy::Always)
            .build()
            .unwrap();
        assert!(c.indexes_failures());
    }
}
