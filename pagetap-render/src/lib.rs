//! Document backends for pagetap: text snapshots and page rasters.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use pagetap_core::Bitmap;

#[cfg(feature = "pdf")]
mod pdfium;
mod text;

#[cfg(feature = "pdf")]
pub use pdfium::{bind_pdfium, PdfiumDocument, PDFIUM_LIBRARY_ENV};
pub use text::{TextSnapshot, HIT_TOLERANCE_PT};

/// Converts a raster into an image buffer, checking the pixel count.
pub fn to_image(bitmap: &Bitmap) -> Result<RgbaImage> {
    RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.clone()).ok_or_else(|| {
        anyhow!(
            "bitmap of page {} has {} bytes, expected {}x{} RGBA",
            bitmap.page_index,
            bitmap.pixels.len(),
            bitmap.width,
            bitmap.height
        )
    })
}

/// Writes a raster to disk; the format follows the file extension.
pub fn save_bitmap(bitmap: &Bitmap, path: &Path) -> Result<()> {
    to_image(bitmap)?
        .save(path)
        .with_context(|| format!("failed to write raster to {:?}", path))
}
