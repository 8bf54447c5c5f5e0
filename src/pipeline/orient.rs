//! Orientation transform.
//!
//! Landscape pages are turned a quarter-turn counter-clockwise with the canvas
//! expanded, so width and height swap and nothing is clipped. Portrait is the
//! identity and borrows the input instead of copying it.

use crate::document::Orientation;
use image::DynamicImage;
use std::borrow::Cow;
use tracing::debug;

/// Apply `orientation` to `raster`.
pub fn apply(raster: &DynamicImage, orientation: Orientation) -> Cow<'_, DynamicImage> {
    match orientation {
        Orientation::Portrait => Cow::Borrowed(raster),
        Orientation::Landscape => {
            let rotated = raster.rotate270();
            debug!(
                "Rotated {}x{} → {}x{}",
                raster.width(),
                raster.height(),
                rotated.width(),
                rotated.height()
            );
            Cow::Owned(rotated)
        }
    }
}
