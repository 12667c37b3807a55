//! Record and page model as delivered by a [`crate::source::RecordSource`].
//!
//! A drawer holds folder records; each record is an ordered list of pages.
//! A page is either a single raster image or a PDF that may itself contain
//! several internal pages. The page kind is a closed tagged variant so the
//! renderer can match on it exhaustively instead of inspecting file types at
//! run time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One logical document in the drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Opaque record key used to look up the record's pages.
    pub folder_id: String,

    /// Key written to the index file on the record's first page.
    pub delimited_index: String,

    /// Pages in record order. Empty until fetched with
    /// [`crate::source::RecordSource::get_pages`].
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl FolderRecord {
    pub fn new(folder_id: impl Into<String>, delimited_index: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            delimited_index: delimited_index.into(),
            pages: Vec::new(),
        }
    }

    /// A record is exportable only when at least one page was retrieved.
    pub fn has_pages(&self) -> bool {
        !self.pages.is_empty()
    }
}

/// One source unit within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Path of the stored page file.
    pub location: PathBuf,

    /// Raster image or PDF.
    pub kind: PageKind,

    /// 1-based position in the record. Position 1 carries the index key.
    pub position: u32,
}

impl Page {
    pub fn new(location: impl Into<PathBuf>, kind: PageKind, position: u32) -> Self {
        Self {
            location: location.into(),
            kind,
            position,
        }
    }

    pub fn raster(location: impl Into<PathBuf>, format: RasterFormat, position: u32) -> Self {
        Self::new(location, PageKind::Raster(format), position)
    }

    pub fn pdf(location: impl Into<PathBuf>, position: u32) -> Self {
        Self::new(location, PageKind::Pdf, position)
    }

    /// Whether this page carries the record's index key.
    pub fn is_first(&self) -> bool {
        self.position == 1
    }
}

/// What a page file contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// A single raster image in the given format.
    Raster(RasterFormat),
    /// A PDF document with one or more internal pages.
    Pdf,
}

impl PageKind {
    /// Infer the page kind from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_type_name(ext)
    }

    /// Parse a type tag such as `"pdf"`, `"tiff"` or `"jpg"`.
    pub fn from_type_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pdf" => PageKind::Pdf,
            other => PageKind::Raster(RasterFormat::from_name(other)),
        }
    }
}

/// Raster formats a page may be stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterFormat {
    Tiff,
    Jpeg,
    Bmp,
    Png,
    /// Anything else; kept with its original name for the error log.
    Unsupported(String),
}

impl RasterFormat {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "tif" | "tiff" => RasterFormat::Tiff,
            "jpg" | "jpeg" => RasterFormat::Jpeg,
            "bmp" => RasterFormat::Bmp,
            "png" => RasterFormat::Png,
            other => RasterFormat::Unsupported(other.to_string()),
        }
    }

    /// The `image` crate format used to decode a supported raster.
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            RasterFormat::Tiff => Some(image::ImageFormat::Tiff),
            RasterFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            RasterFormat::Bmp => Some(image::ImageFormat::Bmp),
            RasterFormat::Png => Some(image::ImageFormat::Png),
            RasterFormat::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterFormat::Tiff => f.write_str("TIFF"),
            RasterFormat::Jpeg => f.write_str("JPEG"),
            RasterFormat::Bmp => f.write_str("BMP"),
            RasterFormat::Png => f.write_str("PNG"),
            RasterFormat::Unsupported(name) if name.is_empty() => f.write_str("unknown"),
            RasterFormat::Unsupported(name) => write!(f, "unsupported ({name})"),
        }
    }
}

/// The drawer currently selected in the source, reported in the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawerInfo {
    pub id: String,
    pub name: String,
}

impl DrawerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
