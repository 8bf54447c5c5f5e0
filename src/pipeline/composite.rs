//! Vertical compositor: stack two pieces on a white canvas.

use crate::error::CombineError;
use crate::pipeline::resize::match_width;
use crate::pipeline::source::WHITE;
use image::{imageops, DynamicImage, RgbImage};
use tracing::debug;

/// Stack `top` above `bottom`.
///
/// Both pieces are first normalized to the wider of the two widths. The canvas
/// is `(max width, top.height + bottom.height)` with `top` at row 0 and
/// `bottom` at row `top.height`.
pub fn stack(top: DynamicImage, bottom: DynamicImage) -> Result<DynamicImage, CombineError> {
    let target_width = top.width().max(bottom.width());
    let top = match_width(top, target_width)?.to_rgb8();
    let bottom = match_width(bottom, target_width)?.to_rgb8();

    let height = top.height().checked_add(bottom.height()).ok_or_else(|| {
        CombineError::processing(
            "composite",
            format!(
                "combined height {} + {} overflows",
                top.height(),
                bottom.height()
            ),
        )
    })?;

    let mut canvas = RgbImage::from_pixel(target_width, height, WHITE);
    imageops::replace(&mut canvas, &top, 0, 0);
    imageops::replace(&mut canvas, &bottom, 0, i64::from(top.height()));
    debug!("Composited {}x{} canvas", target_width, height);

    Ok(DynamicImage::ImageRgb8(canvas))
}
