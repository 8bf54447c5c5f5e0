//! Width normalizer.
//!
//! Resizes a raster to a target width with a Lanczos filter while keeping its
//! height as-is. Pieces of different widths are stretched horizontally, which
//! distorts their aspect ratio. This is questionable for mixed page sizes and
//! is kept only for compatibility with existing composites.

use crate::error::CombineError;
use image::{imageops::FilterType, DynamicImage};
use tracing::debug;

/// Resize `raster` to `(target_width, raster.height())`.
///
/// Returns the input untouched when it already has the target width.
pub fn match_width(raster: DynamicImage, target_width: u32) -> Result<DynamicImage, CombineError> {
    if raster.width() == target_width {
        return Ok(raster);
    }
    if target_width == 0 {
        return Err(CombineError::processing(
            "width normalization",
            "target width is zero",
        ));
    }
    let height = raster.height();
    debug!("Stretching {}x{} → {}x{}", raster.width(), height, target_width, height);
    if height == 0 || raster.width() == 0 {
        return Ok(DynamicImage::new(target_width, height, raster.color()));
    }
    Ok(raster.resize_exact(target_width, height, FilterType::Lanczos3))
}
