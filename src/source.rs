//! Record sources: where folder records and their pages come from.
//!
//! The exporter never talks to a document store directly. It asks a
//! [`RecordSource`] for the drawer's records, then for each record's pages,
//! always from the export worker and never concurrently.
//!
//! [`ManifestSource`] is the bundled implementation: a JSON manifest on disk
//! describing the drawer, its records and the page files.
//!
//! ```json
//! {
//!   "drawer": { "id": "7", "name": "Invoices" },
//!   "records": [
//!     {
//!       "folder_id": "F-1",
//!       "delimited_index": "INV-1|2024-01-02",
//!       "pages": [
//!         { "file": "store/f1/p1.tif" },
//!         { "file": "store/f1/attachment.bin", "type": "pdf" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative page paths are resolved against the manifest's directory. The
//! page type is inferred from the file extension when `type` is omitted.

use crate::record::{DrawerInfo, FolderRecord, Page, PageKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Failure reported by a [`RecordSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Cannot read manifest '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest '{path}': {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown record '{0}'")]
    UnknownRecord(String),

    #[error("{0}")]
    Other(String),
}

/// Supplies records and pages to the exporter.
///
/// `retrieve_records` returns the drawer's records in export order with
/// empty `pages`; `get_pages` is called once per record, just before the
/// record is exported.
pub trait RecordSource: Send {
    fn retrieve_records(&mut self) -> Result<Vec<FolderRecord>, SourceError>;

    fn get_pages(&mut self, folder_id: &str) -> Result<Vec<Page>, SourceError>;

    /// Drawer reported in the summary banner.
    fn active_drawer(&self) -> DrawerInfo;
}

// ── Manifest ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub drawer: DrawerInfo,
    #[serde(default)]
    pub records: Vec<ManifestRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub folder_id: String,
    #[serde(default)]
    pub delimited_index: String,
    #[serde(default)]
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPage {
    pub file: PathBuf,
    /// `"pdf"`, `"tiff"`, `"jpeg"`, … Inferred from `file` when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// [`RecordSource`] backed by a JSON manifest file.
///
/// The manifest is read on [`RecordSource::retrieve_records`], so a missing
/// or malformed file surfaces as a source failure of the run.
#[derive(Debug)]
pub struct ManifestSource {
    path: Option<PathBuf>,
    base_dir: PathBuf,
    drawer: DrawerInfo,
    records: Vec<ManifestRecord>,
    pages: HashMap<String, Vec<Page>>,
}

impl ManifestSource {
    /// A source that loads `path` when records are retrieved.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            path: Some(path),
            base_dir,
            drawer: DrawerInfo::default(),
            records: Vec::new(),
            pages: HashMap::new(),
        }
    }

    /// A source over an already parsed manifest; relative page paths are
    /// resolved against `base_dir`.
    pub fn from_manifest(manifest: Manifest, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: None,
            base_dir: base_dir.into(),
            drawer: manifest.drawer,
            records: manifest.records,
            pages: HashMap::new(),
        }
    }

    fn load(&mut self) -> Result<(), SourceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| SourceError::Manifest {
                path: path.clone(),
                source,
            })?;
        info!(
            "Loaded manifest {} ({} records)",
            path.display(),
            manifest.records.len()
        );
        self.drawer = manifest.drawer;
        self.records = manifest.records;
        Ok(())
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join(file)
        }
    }

    fn to_pages(&self, record: &ManifestRecord) -> Vec<Page> {
        record
            .pages
            .iter()
            .zip(1u32..)
            .map(|(p, position)| {
                let kind = match &p.kind {
                    Some(name) => PageKind::from_type_name(name),
                    None => PageKind::from_path(&p.file),
                };
                Page::new(self.resolve(&p.file), kind, position)
            })
            .collect()
    }
}

impl RecordSource for ManifestSource {
    fn retrieve_records(&mut self) -> Result<Vec<FolderRecord>, SourceError> {
        self.load()?;

        let pages: HashMap<String, Vec<Page>> = self
            .records
            .iter()
            .map(|r| (r.folder_id.clone(), self.to_pages(r)))
            .collect();
        self.pages = pages;

        Ok(self
            .records
            .iter()
            .map(|r| FolderRecord::new(&r.folder_id, &r.delimited_index))
            .collect())
    }

    fn get_pages(&mut self, folder_id: &str) -> Result<Vec<Page>, SourceError> {
        let pages = self
            .pages
            .get(folder_id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownRecord(folder_id.to_string()))?;
        debug!("Record {}: {} pages", folder_id, pages.len());
        Ok(pages)
    }

    fn active_drawer(&self) -> DrawerInfo {
        self.drawer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RasterFormat;

    const MANIFEST: &str = r#"{
        "drawer": { "id": "7", "name": "Invoices" },
        "records": [
            {
                "folder_id": "F-1",
                "delimited_index": "INV-1",
                "pages": [
                    { "file": "f1/p1.tif" },
                    { "file": "/abs/f1/p2.blob", "type": "pdf" }
                ]
            },
            { "folder_id": "F-2", "delimited_index": "INV-2" }
        ]
    }"#;

    #[test]
    fn manifest_file_is_loaded_on_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawer.json");
        std::fs::write(&path, MANIFEST).unwrap();

        let mut source = ManifestSource::new(&path);
        let records = source.retrieve_records().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].folder_id, "F-1");
        assert_eq!(records[0].delimited_index, "INV-1");
        assert!(records.iter().all(|r| r.pages.is_empty()));
        assert_eq!(source.active_drawer(), DrawerInfo::new("7", "Invoices"));

        let pages = source.get_pages("F-1").unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].location, dir.path().join("f1/p1.tif"));
        assert_eq!(pages[0].kind, PageKind::Raster(RasterFormat::Tiff));
        assert_eq!(pages[0].position, 1);
        assert_eq!(pages[1].location, PathBuf::from("/abs/f1/p2.blob"));
        assert_eq!(pages[1].kind, PageKind::Pdf);
        assert_eq!(pages[1].position, 2);

        assert!(source.get_pages("F-2").unwrap().is_empty());
    }

    #[test]
    fn unknown_record_is_an_error() {
        let mut source = ManifestSource::from_manifest(Manifest::default(), "/");
        source.retrieve_records().unwrap();
        assert!(matches!(
            source.get_pages("nope"),
            Err(SourceError::UnknownRecord(_))
        ));
    }

    #[test]
    fn missing_manifest_fails_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ManifestSource::new(dir.path().join("absent.json"));
        assert!(matches!(
            source.retrieve_records(),
            Err(SourceError::Io { .. })
        ));
    }

    #[test]
    fn malformed_manifest_fails_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drawer.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut source = ManifestSource::new(&path);
        assert!(matches!(
            source.retrieve_records(),
            Err(SourceError::Manifest { .. })
        ));
    }
}
