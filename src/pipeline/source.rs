//! Page source: produce a raster for a logical page.
//!
//! A page comes either from rendering the first page of a PDF at a requested
//! DPI, or from synthesizing a uniformly white page of given pixel size.
//!
//! Rendering sits behind the [`PageRenderer`] trait. [`PdfiumRenderer`] is the
//! production implementation; tests and embedders can inject their own.
//!
//! Preview and high-resolution loads are separate calls with separate DPIs.
//! A preview raster is never reused where an export-resolution raster is
//! required.

use crate::error::CombineError;
use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Background colour of synthesized pages and composite canvases.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Renders the first page of a document at a given DPI.
///
/// Implementations must be `Send + Sync`: the pipeline that owns a renderer
/// is moved onto a background worker for long-running loads.
pub trait PageRenderer: Send + Sync {
    /// Render page 1 of `path` at `dpi` dots per inch.
    ///
    /// Returns [`CombineError::Load`] when the document has no pages or the
    /// backend cannot render it. `path` has already been validated.
    fn render_first_page(&self, path: &Path, dpi: u32) -> Result<DynamicImage, CombineError>;
}

/// [`PageRenderer`] backed by the pdfium library.
///
/// Binds pdfium per call: pdfium keeps thread-local state, and a renderer may
/// be used from whichever thread currently owns the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// Bind to the library at `library_path`, or the system library when `None`.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self, document: &Path) -> Result<Pdfium, CombineError> {
        let bindings = match &self.library_path {
            Some(lib) => Pdfium::bind_to_library(lib),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| CombineError::Load {
            path: document.to_path_buf(),
            detail: format!(
                "could not bind to pdfium ({e:?}); set PDFIUM_LIB_PATH to an existing libpdfium"
            ),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_first_page(&self, path: &Path, dpi: u32) -> Result<DynamicImage, CombineError> {
        let pdfium = self.bind(path)?;

        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| CombineError::Load {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(CombineError::Load {
                path: path.to_path_buf(),
                detail: "document contains no pages".into(),
            });
        }

        let page = pages.get(0).map_err(|e| CombineError::Load {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

        // PDF user space is 72 points per inch.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| CombineError::Load {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered {} at {} DPI → {}x{} px",
            path.display(),
            dpi,
            image.width(),
            image.height()
        );

        Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
    }
}

/// Check that `path` names an existing file with a `.pdf` extension.
pub fn validate_document_path(path: &Path) -> Result<(), CombineError> {
    if !path.is_file() {
        return Err(CombineError::InvalidInput {
            path: path.to_path_buf(),
            reason: "file does not exist".into(),
        });
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(CombineError::InvalidInput {
            path: path.to_path_buf(),
            reason: "expected a .pdf document".into(),
        });
    }
    Ok(())
}

/// Load the first page of `path` at preview resolution.
pub fn load_from_file(
    renderer: &dyn PageRenderer,
    path: &Path,
    preview_dpi: u32,
) -> Result<DynamicImage, CombineError> {
    validate_document_path(path)?;
    info!("Loading preview of {} at {} DPI", path.display(), preview_dpi);
    renderer.render_first_page(path, preview_dpi)
}

/// Load the first page of `path` at export resolution.
pub fn load_high_res(
    renderer: &dyn PageRenderer,
    path: &Path,
    export_dpi: u32,
) -> Result<DynamicImage, CombineError> {
    validate_document_path(path)?;
    info!("Loading {} at export resolution ({} DPI)", path.display(), export_dpi);
    renderer.render_first_page(path, export_dpi)
}

/// A uniformly white RGB page of exactly `width`×`height` pixels.
pub fn make_blank(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, WHITE))
}

/// Preview size of a `width`×`height` raster for the `max` preview box.
///
/// Only one edge is bounded: landscape rasters by the box width, everything
/// else by the box height, with the other edge following the aspect ratio.
/// A square or near-square raster can therefore come out wider than the box
/// (1000×1000 gives 140×140 in a 120×140 box). Neither edge grows past the
/// source and neither drops below one pixel.
pub fn fit_within(width: u32, height: u32, max: (u32, u32)) -> (u32, u32) {
    let (max_w, max_h) = max;
    let aspect = width as f64 / height.max(1) as f64;
    let (w, h) = if aspect > 1.0 {
        let w = max_w.min(width);
        (w, (w as f64 / aspect) as u32)
    } else {
        let h = max_h.min(height);
        ((h as f64 * aspect) as u32, h)
    };
    (w.max(1), h.max(1))
}

/// Resize `image` to its [`fit_within`] preview size with a Lanczos filter.
pub fn thumbnail(image: &DynamicImage, max: (u32, u32)) -> DynamicImage {
    let (w, h) = fit_within(image.width(), image.height(), max);
    image.resize_exact(w, h, FilterType::Lanczos3)
}
