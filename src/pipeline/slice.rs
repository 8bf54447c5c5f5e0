//! Half-slicer: split a raster at `floor(height / 2)`.
//!
//! Odd heights give the bottom half the extra row. That asymmetry is kept.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Which half of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    Top,
    Bottom,
}

/// Crop `raster` to its top or bottom half.
pub fn crop_half(raster: &DynamicImage, which: Half) -> DynamicImage {
    let (width, height) = (raster.width(), raster.height());
    let half = height / 2;
    match which {
        Half::Top => raster.crop_imm(0, 0, width, half),
        Half::Bottom => raster.crop_imm(0, half, width, height - half),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn striped(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |_, y| Rgb([y as u8, 0, 0])))
    }

    #[test]
    fn even_height_splits_evenly() {
        let img = striped(4, 10);
        assert_eq!(crop_half(&img, Half::Top).height(), 5);
        assert_eq!(crop_half(&img, Half::Bottom).height(), 5);
    }

    #[test]
    fn odd_height_gives_bottom_the_extra_row() {
        let img = striped(4, 11);
        let top = crop_half(&img, Half::Top);
        let bottom = crop_half(&img, Half::Bottom);
        assert_eq!(top.height(), 5);
        assert_eq!(bottom.height(), 6);
        assert_eq!(bottom.to_rgb8().get_pixel(0, 0), &Rgb([5, 0, 0]));
    }

    #[test]
    fn halves_keep_full_width() {
        let img = striped(9, 4);
        assert_eq!(crop_half(&img, Half::Top).width(), 9);
        assert_eq!(crop_half(&img, Half::Bottom).width(), 9);
    }

    #[test]
    fn single_row_has_empty_top() {
        let img = striped(3, 1);
        assert_eq!(crop_half(&img, Half::Top).height(), 0);
        assert_eq!(crop_half(&img, Half::Bottom).height(), 1);
    }
}
