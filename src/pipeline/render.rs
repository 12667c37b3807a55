//! Page rendering: turn one source page into one or more numbered output files.
//!
//! Dispatch is an exhaustive match over [`PageKind`]:
//!
//! | Page | Output units |
//! |------|--------------|
//! | `Raster(TIFF/JPEG/BMP/PNG)` | one, re-encoded with the configured codec |
//! | `Pdf` with N internal pages | N, each on its own freshly probed slot |
//! | `Raster(Unsupported)`, unreadable source | one failed unit, nothing written |
//!
//! Failures are returned as values inside [`RenderOutcome`]; nothing here
//! aborts the record or the run.

use crate::error::PageError;
use crate::pipeline::allocator::{SequenceAllocator, Slot};
use crate::pipeline::encode::ImageCodec;
use crate::pipeline::pdf::{pixel_size, PdfEngine};
use crate::record::{Page, PageKind, RasterFormat};
use std::sync::Arc;
use tracing::debug;

/// One attempted output file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUnit {
    /// Slot the unit was written to (or would have been). `None` when no
    /// slot could be probed at all.
    pub slot: Option<Slot>,
    pub result: Result<(), PageError>,
}

impl RenderUnit {
    fn produced(slot: Slot) -> Self {
        Self {
            slot: Some(slot),
            result: Ok(()),
        }
    }

    fn failed(slot: Option<Slot>, error: PageError) -> Self {
        Self {
            slot,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every unit attempted for one page, in slot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutcome {
    pub units: Vec<RenderUnit>,
}

impl RenderOutcome {
    pub fn produced(&self) -> usize {
        self.units.iter().filter(|u| u.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.units.len() - self.produced()
    }
}

/// Renders pages into slots handed out by a [`SequenceAllocator`].
pub struct PageRenderer {
    codec: ImageCodec,
    pdf_engine: Option<Arc<dyn PdfEngine>>,
    points_per_pixel: f32,
    /// Failed units keep their slot (the index references it).
    keep_failed_slots: bool,
}

impl PageRenderer {
    pub fn new(
        codec: ImageCodec,
        pdf_engine: Option<Arc<dyn PdfEngine>>,
        points_per_pixel: f32,
        keep_failed_slots: bool,
    ) -> Self {
        Self {
            codec,
            pdf_engine,
            points_per_pixel,
            keep_failed_slots,
        }
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Render `page`, allocating one slot per produced output.
    pub fn render(&self, page: &Page, slots: &mut SequenceAllocator) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();
        match &page.kind {
            PageKind::Raster(format @ RasterFormat::Unsupported(_)) => {
                let err = PageError::UnsupportedFormat {
                    format: format.to_string(),
                    location: page.location.clone(),
                };
                self.fail(&mut outcome, slots, err);
            }
            PageKind::Raster(format) => self.render_raster(page, format, slots, &mut outcome),
            PageKind::Pdf => self.render_pdf(page, slots, &mut outcome),
        }
        outcome
    }

    fn render_raster(
        &self,
        page: &Page,
        format: &RasterFormat,
        slots: &mut SequenceAllocator,
        outcome: &mut RenderOutcome,
    ) {
        let image = match self.codec.decode(&page.location, format) {
            Ok(img) => img,
            Err(e) => return self.fail(outcome, slots, e),
        };
        let slot = match reserve(slots) {
            Ok(slot) => slot,
            Err(e) => return outcome.units.push(RenderUnit::failed(None, e)),
        };
        let result = self.codec.encode(&image, &slot.path);
        self.settle(outcome, slots, slot, result);
    }

    fn render_pdf(&self, page: &Page, slots: &mut SequenceAllocator, outcome: &mut RenderOutcome) {
        let Some(engine) = self.pdf_engine.as_deref() else {
            let err = PageError::PdfEngineUnavailable {
                location: page.location.clone(),
            };
            return self.fail(outcome, slots, err);
        };

        let document = match engine.open(&page.location) {
            Ok(doc) => doc,
            Err(e) => return self.fail(outcome, slots, e),
        };

        let page_count = document.page_count();
        if page_count == 0 {
            let err = PageError::PdfUnreadable {
                location: page.location.clone(),
                detail: "document has no pages".into(),
            };
            return self.fail(outcome, slots, err);
        }

        for index in 0..page_count {
            let slot = match reserve(slots) {
                Ok(slot) => slot,
                Err(e) => {
                    outcome.units.push(RenderUnit::failed(None, e));
                    continue;
                }
            };

            let result = document.page_size(index).and_then(|points| {
                let (width, height) = pixel_size(points, self.points_per_pixel);
                debug!(
                    "PDF page {}/{} of {}: {}x{} pt → {}x{} px",
                    index + 1,
                    page_count,
                    page.location.display(),
                    points.0,
                    points.1,
                    width,
                    height
                );
                let image = document.render_page(index, width, height)?;
                self.codec.encode(&image, &slot.path)
            });

            self.settle(outcome, slots, slot, result);
        }
    }

    /// Record a unit whose slot was already reserved.
    fn settle(
        &self,
        outcome: &mut RenderOutcome,
        slots: &mut SequenceAllocator,
        slot: Slot,
        result: Result<(), PageError>,
    ) {
        match result {
            Ok(()) => {
                slots.advance_past(&slot);
                outcome.units.push(RenderUnit::produced(slot));
            }
            Err(e) => {
                debug!("Slot {} not produced: {}", slot.path.display(), e);
                if self.keep_failed_slots {
                    slots.advance_past(&slot);
                }
                outcome.units.push(RenderUnit::failed(Some(slot), e));
            }
        }
    }

    /// Record a unit that failed before anything was written. The slot it
    /// would have used is still reported so an index line can reference it.
    fn fail(&self, outcome: &mut RenderOutcome, slots: &mut SequenceAllocator, error: PageError) {
        match reserve(slots) {
            Ok(slot) => self.settle(outcome, slots, slot, Err(error)),
            Err(_) => {
                debug!("No slot for failed unit: {}", error);
                outcome.units.push(RenderUnit::failed(None, error));
            }
        }
    }
}

fn reserve(slots: &SequenceAllocator) -> Result<Slot, PageError> {
    slots.reserve().map_err(|e| PageError::SlotUnavailable {
        detail: format!("{}: {e}", slots.dir().display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::pipeline::pdf::OpenedPdf;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::path::Path;

    /// Every document has `pages` pages; page indices listed in `broken` fail.
    struct FakePdf {
        pages: usize,
        broken: Vec<usize>,
    }

    struct FakeDoc<'a>(&'a FakePdf);

    impl PdfEngine for FakePdf {
        fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn OpenedPdf + 'a>, PageError> {
            if path.to_string_lossy().contains("corrupt") {
                return Err(PageError::PdfUnreadable {
                    location: path.to_path_buf(),
                    detail: "bad xref".into(),
                });
            }
            Ok(Box::new(FakeDoc(self)))
        }
    }

    impl OpenedPdf for FakeDoc<'_> {
        fn page_count(&self) -> usize {
            self.0.pages
        }

        fn page_size(&self, _index: usize) -> Result<(f32, f32), PageError> {
            Ok((4.8, 2.4))
        }

        fn render_page(
            &self,
            index: usize,
            width_px: u32,
            height_px: u32,
        ) -> Result<DynamicImage, PageError> {
            if self.0.broken.contains(&index) {
                return Err(PageError::RasterisationFailed {
                    location: "fake.pdf".into(),
                    page: index + 1,
                    detail: "boom".into(),
                });
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                width_px,
                height_px,
                Rgba([0, 0, 255, 255]),
            )))
        }
    }

    fn renderer(engine: Option<Arc<dyn PdfEngine>>, keep_failed: bool) -> PageRenderer {
        PageRenderer::new(
            ImageCodec::new(OutputFormat::Png, 90),
            engine,
            0.24,
            keep_failed,
        )
    }

    fn write_png(path: &Path) {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn raster_page_produces_one_file() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let page_path = src.path().join("scan.png");
        write_png(&page_path);

        let mut slots = SequenceAllocator::new(out.path(), "png", 1);
        let page = Page::raster(&page_path, RasterFormat::Png, 1);
        let outcome = renderer(None, false).render(&page, &mut slots);

        assert_eq!(outcome.produced(), 1);
        assert_eq!(outcome.failed(), 0);
        let slot = outcome.units[0].slot.as_ref().unwrap();
        assert_eq!(slot.sequence, 1);
        assert!(out.path().join("0001.png").exists());
        assert_eq!(slots.next_sequence(), 2);
    }

    #[test]
    fn pdf_fans_out_to_distinct_slots() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 3, broken: vec![] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);

        let outcome = renderer(Some(engine), false).render(&Page::pdf("doc.pdf", 1), &mut slots);

        assert_eq!(outcome.produced(), 3);
        let seqs: Vec<u32> = outcome
            .units
            .iter()
            .map(|u| u.slot.as_ref().unwrap().sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        for n in 1..=3 {
            assert!(out.path().join(format!("000{n}.png")).exists());
        }
    }

    #[test]
    fn rendered_size_follows_points_per_pixel() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 1, broken: vec![] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);
        renderer(Some(engine), false).render(&Page::pdf("doc.pdf", 1), &mut slots);

        let img = image::open(out.path().join("0001.png")).unwrap();
        // 4.8 x 2.4 pt at 0.24 pt/px
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[test]
    fn finer_points_per_pixel_renders_larger_bitmap() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 1, broken: vec![] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);
        let codec = ImageCodec::new(OutputFormat::Png, 90);
        let renderer = PageRenderer::new(codec, Some(engine), 0.12, false);
        renderer.render(&Page::pdf("doc.pdf", 1), &mut slots);

        let img = image::open(out.path().join("0001.png")).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
    }

    #[test]
    fn broken_internal_page_does_not_stop_the_rest() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 3, broken: vec![1] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);

        let outcome = renderer(Some(engine), false).render(&Page::pdf("doc.pdf", 1), &mut slots);

        assert_eq!(outcome.produced(), 2);
        assert_eq!(outcome.failed(), 1);
        // The failed slot is reused, so numbering stays gapless.
        let produced: Vec<u32> = outcome
            .units
            .iter()
            .filter(|u| u.is_success())
            .map(|u| u.slot.as_ref().unwrap().sequence)
            .collect();
        assert_eq!(produced, vec![1, 2]);
    }

    #[test]
    fn failed_slot_is_kept_when_requested() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 3, broken: vec![1] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);

        let outcome = renderer(Some(engine), true).render(&Page::pdf("doc.pdf", 1), &mut slots);

        let seqs: Vec<u32> = outcome
            .units
            .iter()
            .map(|u| u.slot.as_ref().unwrap().sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(!out.path().join("0002.png").exists());
        assert_eq!(slots.next_sequence(), 4);
    }

    #[test]
    fn unsupported_raster_fails_without_output() {
        let out = tempfile::tempdir().unwrap();
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);
        let page = Page::raster("a.gif", RasterFormat::Unsupported("gif".into()), 1);

        let outcome = renderer(None, false).render(&page, &mut slots);

        assert_eq!(outcome.produced(), 0);
        assert_eq!(outcome.failed(), 1);
        assert!(matches!(
            outcome.units[0].result,
            Err(PageError::UnsupportedFormat { .. })
        ));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
        assert_eq!(slots.next_sequence(), 1);
    }

    #[test]
    fn corrupt_pdf_is_one_failure() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 3, broken: vec![] });
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);

        let page = Page::pdf("corrupt.pdf", 1);
        let outcome = renderer(Some(engine), false).render(&page, &mut slots);

        assert_eq!(outcome.units.len(), 1);
        assert!(matches!(
            outcome.units[0].result,
            Err(PageError::PdfUnreadable { .. })
        ));
    }

    #[test]
    fn pdf_without_engine_fails() {
        let out = tempfile::tempdir().unwrap();
        let mut slots = SequenceAllocator::new(out.path(), "png", 1);
        let outcome = renderer(None, false).render(&Page::pdf("doc.pdf", 1), &mut slots);
        assert!(matches!(
            outcome.units[0].result,
            Err(PageError::PdfEngineUnavailable { .. })
        ));
    }

    #[test]
    fn missing_images_dir_reports_slot_failure() {
        let out = tempfile::tempdir().unwrap();
        let engine: Arc<dyn PdfEngine> = Arc::new(FakePdf { pages: 2, broken: vec![] });
        let mut slots = SequenceAllocator::new(out.path().join("gone"), "png", 1);

        let outcome = renderer(Some(engine), false).render(&Page::pdf("doc.pdf", 1), &mut slots);

        assert_eq!(outcome.units.len(), 2);
        assert!(outcome.units.iter().all(|u| {
            u.slot.is_none() && matches!(u.result, Err(PageError::SlotUnavailable { .. }))
        }));
    }
}
