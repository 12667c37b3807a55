//! Raster codec: decode stored page images and write output images.
//!
//! Output is written to a `.part` sibling and renamed into place, so a crash
//! or encoder error never leaves a truncated `NNNN.<ext>` that the allocator
//! would then treat as taken.

use crate::config::OutputFormat;
use crate::error::PageError;
use crate::record::RasterFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Encoder configuration: output format plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    format: OutputFormat,
    jpeg_quality: u8,
}

impl ImageCodec {
    pub fn new(format: OutputFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Load a stored raster page using its declared format.
    pub fn decode(
        &self,
        location: &Path,
        format: &RasterFormat,
    ) -> Result<DynamicImage, PageError> {
        let Some(image_format) = format.image_format() else {
            return Err(PageError::UnsupportedFormat {
                format: format.to_string(),
                location: location.to_path_buf(),
            });
        };

        let unreadable = |detail: String| PageError::SourceUnreadable {
            location: location.to_path_buf(),
            detail,
        };

        let mut reader = ImageReader::open(location).map_err(|e| unreadable(e.to_string()))?;
        reader.set_format(image_format);
        reader.decode().map_err(|e| unreadable(e.to_string()))
    }

    /// Encode `img` to `dest`.
    pub fn encode(&self, img: &DynamicImage, dest: &Path) -> Result<(), PageError> {
        let tmp = part_path(dest);
        let result = self
            .write_file(img, &tmp)
            .and_then(|()| std::fs::rename(&tmp, dest).map_err(image::ImageError::IoError));

        match result {
            Ok(()) => {
                debug!(
                    "Encoded {}x{} {:?} → {}",
                    img.width(),
                    img.height(),
                    self.format,
                    dest.display()
                );
                Ok(())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                Err(PageError::OutputWriteFailed {
                    path: dest.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        }
    }

    fn write_file(&self, img: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
        let mut writer = BufWriter::new(File::create(path)?);
        match self.format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                rgb.write_with_encoder(encoder)?;
            }
            OutputFormat::Bmp | OutputFormat::Png | OutputFormat::Tiff => {
                img.write_to(&mut writer, self.format.image_format())?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
