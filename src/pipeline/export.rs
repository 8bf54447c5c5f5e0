//! Exporter: serialize a composite to disk as PDF or PNG.
//!
//! ## PDF
//!
//! A single page whose MediaBox is the raster size converted to points at the
//! requested DPI (`pixels * 72 / dpi`). The raster is embedded once as a
//! DCT-encoded (JPEG) image XObject at the requested quality and painted to
//! fill the page, so a viewer shows it at its physical size and the pixel
//! dimensions survive a round trip.
//!
//! ## PNG
//!
//! An 8-bit RGB PNG with a pHYs chunk carrying the DPI as pixels per metre.
//! PNG is lossless and ignores the quality setting.
//!
//! Both writers create the destination directory when it is missing. Each call
//! is independent; exporting a pair is not transactional.

use crate::error::CombineError;
use crate::output::ExportFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

const INCH_PER_METRE: f64 = 39.370_078_740_157_48;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Write `raster` to `path` in `format`.
pub fn export(
    raster: &DynamicImage,
    path: &Path,
    format: ExportFormat,
    quality: u8,
    dpi: u32,
) -> Result<(), CombineError> {
    if dpi == 0 {
        return Err(CombineError::export(path, "DPI must be greater than zero"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CombineError::export(path, e))?;
    }

    let rgb = raster.to_rgb8();
    match format {
        ExportFormat::Pdf => write_pdf(&rgb, path, quality, dpi)?,
        ExportFormat::Png => write_png(&rgb, path, dpi)?,
    }

    info!(
        "Exported {}x{} {} → {}",
        rgb.width(),
        rgb.height(),
        format,
        path.display()
    );
    Ok(())
}

/// Page size in points for a raster of `pixels` at `dpi`.
pub fn pixels_to_points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * POINTS_PER_INCH / dpi as f32
}

/// PNG pHYs value for `dpi`, rounded to whole pixels per metre.
pub fn dpi_to_pixels_per_metre(dpi: u32) -> u32 {
    (f64::from(dpi) * INCH_PER_METRE).round() as u32
}

fn write_pdf(rgb: &RgbImage, path: &Path, quality: u8, dpi: u32) -> Result<(), CombineError> {
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(rgb)
        .map_err(|e| CombineError::export(path, e))?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false),
    );

    let page_w = pixels_to_points(width, dpi);
    let page_h = pixels_to_points(height, dpi);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| CombineError::export(path, e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_w),
            Object::Real(page_h),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).map_err(|e| CombineError::export(path, e))?;
    Ok(())
}

fn write_png(rgb: &RgbImage, path: &Path, dpi: u32) -> Result<(), CombineError> {
    let file = File::create(path).map_err(|e| CombineError::export(path, e))?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), rgb.width(), rgb.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let ppm = dpi_to_pixels_per_metre(dpi);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));

    let mut writer = encoder
        .write_header()
        .map_err(|e| CombineError::export(path, e))?;
    writer
        .write_image_data(rgb.as_raw())
        .map_err(|e| CombineError::export(path, e))?;
    writer.finish().map_err(|e| CombineError::export(path, e))?;
    Ok(())
}
