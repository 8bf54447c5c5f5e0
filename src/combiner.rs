//! The document pipeline: two input slots, one output pair, and the
//! combine/export operations that connect them.
//!
//! ```text
//! slot 1 ─┐  high-res   orient   crop halves    stack
//!         ├─────────▶ ───────▶ ──────────▶ top₁ + top₂  ──▶ top composite
//! slot 2 ─┘                                bot₁ + bot₂  ──▶ bottom composite
//! ```
//!
//! The state is derived from the slots and the output rather than stored:
//!
//! | slots ready | output | format chosen | state |
//! |-------------|--------|---------------|-------|
//! | none        | –      | –             | `Empty` |
//! | first only  | –      | –             | `FirstLoaded` |
//! | second only | –      | –             | `SecondLoaded` |
//! | both        | no     | –             | `BothLoaded` |
//! | both        | yes    | no            | `Combined` |
//! | both        | yes    | yes           | `ExportReady` |
//!
//! Changing either input (new page, blank page, different orientation) drops
//! the output, so a composite always reflects the current inputs.

use crate::config::CombinerConfig;
use crate::document::{Orientation, PageInput, PageSource, PipelineState, Slot};
use crate::error::CombineError;
use crate::output::{
    suggested_filenames, unique_path, CombinedOutput, ExportFormat, ExportRequest, ExportedFiles,
};
use crate::pipeline::slice::{crop_half, Half};
use crate::pipeline::source::{self, PageRenderer, PdfiumRenderer};
use crate::pipeline::{composite, export, orient};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns both input slots and the combined output.
pub struct DocumentPipeline {
    config: CombinerConfig,
    renderer: Arc<dyn PageRenderer>,
    slots: [PageInput; 2],
    output: CombinedOutput,
    format_selected: bool,
}

impl DocumentPipeline {
    /// An empty pipeline rendering through `renderer`.
    pub fn new(config: CombinerConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        let output = CombinedOutput::new(config.default_format);
        Self {
            config,
            renderer,
            slots: Default::default(),
            output,
            format_selected: false,
        }
    }

    /// An empty pipeline rendering through pdfium, bound per the config.
    pub fn with_pdfium(config: CombinerConfig) -> Self {
        let renderer = Arc::new(PdfiumRenderer::new(config.resolved_pdfium_library()));
        Self::new(config, renderer)
    }

    pub fn config(&self) -> &CombinerConfig {
        &self.config
    }

    pub(crate) fn renderer(&self) -> Arc<dyn PageRenderer> {
        Arc::clone(&self.renderer)
    }

    pub fn page(&self, slot: Slot) -> &PageInput {
        &self.slots[slot.index()]
    }

    pub fn output(&self) -> &CombinedOutput {
        &self.output
    }

    pub fn state(&self) -> PipelineState {
        match (self.slots[0].is_ready(), self.slots[1].is_ready()) {
            (false, false) => PipelineState::Empty,
            (true, false) => PipelineState::FirstLoaded,
            (false, true) => PipelineState::SecondLoaded,
            (true, true) if !self.output.is_ready() => PipelineState::BothLoaded,
            (true, true) if self.format_selected => PipelineState::ExportReady,
            (true, true) => PipelineState::Combined,
        }
    }

    // ── Inputs ────────────────────────────────────────────────────────────

    /// Load the first page of `path` into `slot` at preview resolution.
    ///
    /// On failure the slot keeps whatever it held before.
    pub fn load_file(&mut self, slot: Slot, path: impl AsRef<Path>) -> Result<(), CombineError> {
        let path = path.as_ref();
        let preview = source::load_from_file(&*self.renderer, path, self.config.preview_dpi)?;
        info!(
            "Loaded {} into {} ({}x{} preview)",
            path.display(),
            slot,
            preview.width(),
            preview.height()
        );
        self.slots[slot.index()].set_source(PageSource::File(path.to_path_buf()), preview);
        self.invalidate_output();
        Ok(())
    }

    /// Put a synthesized white page into `slot`.
    pub fn load_blank(&mut self, slot: Slot) {
        let (w, h) = self.config.blank_page_size;
        let (pw, ph) = source::fit_within(w, h, self.config.preview_max_size);
        self.slots[slot.index()].set_source(PageSource::Blank, source::make_blank(pw, ph));
        info!("Blank page in {}", slot);
        self.invalidate_output();
    }

    pub fn set_orientation(&mut self, slot: Slot, orientation: Orientation) {
        let page = &mut self.slots[slot.index()];
        if page.orientation() == orientation {
            return;
        }
        page.set_orientation(orientation);
        debug!("{} orientation → {}", slot, orientation);
        self.invalidate_output();
    }

    /// Preview raster of `slot` as loaded, before orientation.
    pub fn preview(&self, slot: Slot) -> Option<&DynamicImage> {
        self.slots[slot.index()].preview()
    }

    /// Preview of `slot` fitted into the configured thumbnail box.
    pub fn thumbnail(&self, slot: Slot) -> Option<DynamicImage> {
        self.preview(slot)
            .map(|p| source::thumbnail(p, self.config.preview_max_size))
    }

    /// A composite fitted into the configured thumbnail box.
    pub fn output_thumbnail(&self, half: Half) -> Option<DynamicImage> {
        self.output
            .composite(half)
            .map(|c| source::thumbnail(c, self.config.preview_max_size))
    }

    /// Back to `Empty`, dropping both slots and the output.
    pub fn reset(&mut self) {
        self.slots = Default::default();
        self.output = CombinedOutput::new(self.config.default_format);
        self.format_selected = false;
        info!("Pipeline reset");
    }

    // ── Combine ───────────────────────────────────────────────────────────

    /// Produce both composites from the current inputs.
    pub fn combine(&mut self) -> Result<&CombinedOutput, CombineError> {
        self.combine_with_progress(&|_: f32, _: &str| {})
    }

    /// [`combine`](Self::combine), reporting progress as `(fraction, message)`.
    ///
    /// Fails with [`CombineError::Validation`] unless both slots are ready.
    /// Any failure while rendering or compositing is reported as
    /// [`CombineError::ImageProcessing`]. On failure the previous output, if
    /// any, is left exactly as it was.
    pub fn combine_with_progress(
        &mut self,
        progress: &dyn Fn(f32, &str),
    ) -> Result<&CombinedOutput, CombineError> {
        let state = self.state();
        if !state.can_combine() {
            return Err(CombineError::Validation(format!(
                "both pages must be loaded before combining (currently {state})"
            )));
        }

        progress(0.1, "Loading pages at export resolution");
        self.prepare_high_res()?;

        progress(0.5, "Slicing and combining halves");
        let (top, bottom) = self.compose()?;
        info!(
            "Combined: top {}x{}, bottom {}x{}",
            top.width(),
            top.height(),
            bottom.width(),
            bottom.height()
        );

        self.output.store(top, bottom);
        self.format_selected = false;
        progress(0.8, "Combined pages ready");
        progress(1.0, "Combination complete");
        Ok(&self.output)
    }

    /// Fill both high-resolution rasters and match a lone blank page to the
    /// other page's size.
    fn prepare_high_res(&mut self) -> Result<(), CombineError> {
        let (blank_w, blank_h) = self.config.blank_page_size;
        for slot in Slot::BOTH {
            let page = &mut self.slots[slot.index()];
            match page.source().cloned() {
                Some(PageSource::Blank) => page.set_high_res(source::make_blank(blank_w, blank_h)),
                Some(PageSource::File(path)) if page.high_res().is_none() => {
                    let raster =
                        source::load_high_res(&*self.renderer, &path, self.config.export_dpi)
                            .map_err(|e| {
                                CombineError::processing(
                                    "high-resolution render",
                                    format!("{slot}: {e}"),
                                )
                            })?;
                    page.set_high_res(raster);
                }
                Some(PageSource::File(_)) => debug!("{} high-res raster cached", slot),
                None => {
                    page.clear_high_res();
                    return Err(CombineError::Validation(format!("{slot} is not loaded")));
                }
            }
        }

        let [first, second] = &mut self.slots;
        let (blank, other) = match (first.is_blank(), second.is_blank()) {
            (true, false) => (first, &*second),
            (false, true) => (second, &*first),
            _ => return Ok(()),
        };
        if let Some(target) = other.high_res() {
            let (w, h) = (target.width(), target.height());
            debug!("Matching blank page to {}x{}", w, h);
            blank.set_high_res(source::make_blank(w, h));
        }
        Ok(())
    }

    fn compose(&self) -> Result<(DynamicImage, DynamicImage), CombineError> {
        let [first, second] = &self.slots;
        let first_img = orient::apply(high_res_of(first, Slot::First)?, first.orientation());
        let second_img = orient::apply(high_res_of(second, Slot::Second)?, second.orientation());

        let top = composite::stack(
            crop_half(&first_img, Half::Top),
            crop_half(&second_img, Half::Top),
        )?;
        let bottom = composite::stack(
            crop_half(&first_img, Half::Bottom),
            crop_half(&second_img, Half::Bottom),
        )?;
        Ok((top, bottom))
    }

    // ── Export ────────────────────────────────────────────────────────────

    /// Record the format the caller intends to export as.
    pub fn select_export_format(&mut self, format: ExportFormat) -> Result<(), CombineError> {
        if !self.state().can_export() {
            return Err(CombineError::Validation(
                "nothing to export; combine the pages first".into(),
            ));
        }
        self.output.export_format = format;
        self.format_selected = true;
        Ok(())
    }

    /// An export request in the recorded format, with the configured DPI and
    /// quality.
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest::new(self.output.export_format, &self.config)
    }

    /// Default `(top, bottom)` export names for the current inputs.
    pub fn suggested_filenames(&self, format: ExportFormat) -> (String, String) {
        let placeholder = &self.config.blank_placeholder;
        suggested_filenames(
            &self.slots[0].base_name(placeholder),
            &self.slots[1].base_name(placeholder),
            format,
        )
    }

    /// Write both composites into `dir`, top first.
    ///
    /// The directory is created when missing. If writing the bottom composite
    /// fails, the top file stays on disk.
    pub fn export(&self, request: &ExportRequest, dir: &Path) -> Result<ExportedFiles, CombineError> {
        let (Some(top), Some(bottom)) = (
            self.output.composite(Half::Top),
            self.output.composite(Half::Bottom),
        ) else {
            return Err(CombineError::Validation(
                "nothing to export; combine the pages first".into(),
            ));
        };

        let (suggested_top, suggested_bottom) = self.suggested_filenames(request.format);
        let top_name = request.file_name(Half::Top, &suggested_top);
        let bottom_name = request.file_name(Half::Bottom, &suggested_bottom);
        if top_name == bottom_name && !request.no_clobber {
            warn!("Top and bottom share the name {}; bottom overwrites top", top_name);
        }

        std::fs::create_dir_all(dir).map_err(|e| CombineError::export(dir, e))?;

        let target = |name: &str| -> PathBuf {
            if request.no_clobber {
                unique_path(dir, name)
            } else {
                dir.join(name)
            }
        };

        let top_path = target(&top_name);
        export::export(top, &top_path, request.format, request.quality, request.dpi)?;
        let bottom_path = target(&bottom_name);
        export::export(bottom, &bottom_path, request.format, request.quality, request.dpi)?;

        Ok(ExportedFiles {
            top: top_path,
            bottom: bottom_path,
            format: request.format,
            dpi: request.dpi,
        })
    }

    fn invalidate_output(&mut self) {
        if self.output.is_ready() {
            debug!("Inputs changed; dropping combined output");
        }
        self.output.clear();
        self.format_selected = false;
    }
}

fn high_res_of(page: &PageInput, slot: Slot) -> Result<&DynamicImage, CombineError> {
    page.high_res().ok_or_else(|| {
        CombineError::processing("high-resolution render", format!("{slot} has no raster"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::sync::Mutex;

    /// Renders a solid page whose size scales with DPI, recording each DPI.
    struct ScaledRenderer {
        size_at_100: (u32, u32),
        dpis: Mutex<Vec<u32>>,
    }

    impl ScaledRenderer {
        fn new(w: u32, h: u32) -> Arc<Self> {
            Arc::new(Self {
                size_at_100: (w, h),
                dpis: Mutex::new(Vec::new()),
            })
        }
    }

    impl PageRenderer for ScaledRenderer {
        fn render_first_page(&self, _path: &Path, dpi: u32) -> Result<DynamicImage, CombineError> {
            self.dpis.lock().unwrap().push(dpi);
            let (w, h) = self.size_at_100;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                w * dpi / 100,
                h * dpi / 100,
                Rgb([10, 20, 30]),
            )))
        }
    }

    fn small_config() -> CombinerConfig {
        CombinerConfig::builder()
            .blank_page_size(40, 60)
            .build()
            .unwrap()
    }

    fn pdf_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.4\n").unwrap();
        path
    }

    #[test]
    fn state_follows_slots() {
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        assert_eq!(p.state(), PipelineState::Empty);
        p.load_blank(Slot::Second);
        assert_eq!(p.state(), PipelineState::SecondLoaded);
        p.load_blank(Slot::First);
        assert_eq!(p.state(), PipelineState::BothLoaded);
        p.combine().unwrap();
        assert_eq!(p.state(), PipelineState::Combined);
        p.select_export_format(ExportFormat::Png).unwrap();
        assert_eq!(p.state(), PipelineState::ExportReady);
        p.reset();
        assert_eq!(p.state(), PipelineState::Empty);
    }

    #[test]
    fn export_request_follows_selected_format() {
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        assert_eq!(p.export_request().format, ExportFormat::Pdf);
        p.load_blank(Slot::First);
        p.load_blank(Slot::Second);
        p.combine().unwrap();
        p.select_export_format(ExportFormat::Png).unwrap();
        let request = p.export_request();
        assert_eq!(request.format, ExportFormat::Png);
        assert_eq!(request.dpi, p.config().export_dpi);
    }

    #[test]
    fn combine_with_one_slot_is_a_validation_error() {
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        p.load_blank(Slot::First);
        let err = p.combine().unwrap_err();
        assert!(matches!(err, CombineError::Validation(_)), "got: {err}");
        assert!(!p.output().is_ready());
    }

    #[test]
    fn two_blanks_combine_at_blank_size() {
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        p.load_blank(Slot::First);
        p.load_blank(Slot::Second);
        let out = p.combine().unwrap();
        assert_eq!(out.composite(Half::Top).unwrap().dimensions(), (40, 60));
        assert_eq!(out.composite(Half::Bottom).unwrap().dimensions(), (40, 60));
    }

    #[test]
    fn high_res_uses_export_dpi_and_preview_uses_preview_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ScaledRenderer::new(50, 70);
        let mut p = DocumentPipeline::new(small_config(), renderer.clone());
        p.load_file(Slot::First, pdf_file(dir.path(), "a.pdf")).unwrap();
        p.load_blank(Slot::Second);
        p.combine().unwrap();
        assert_eq!(*renderer.dpis.lock().unwrap(), vec![100, 300]);

        // A second combine reuses the cached raster.
        p.combine().unwrap();
        assert_eq!(renderer.dpis.lock().unwrap().len(), 2);
    }

    #[test]
    fn lone_blank_matches_the_other_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(50, 70));
        p.load_blank(Slot::First);
        p.load_file(Slot::Second, pdf_file(dir.path(), "b.pdf")).unwrap();
        p.combine().unwrap();
        assert_eq!(p.page(Slot::First).high_res().unwrap().dimensions(), (150, 210));
        assert_eq!(p.page(Slot::Second).high_res().unwrap().dimensions(), (150, 210));
        let top = p.output().composite(Half::Top).unwrap();
        assert_eq!(top.dimensions(), (150, 210));
    }

    #[test]
    fn input_change_drops_output() {
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        p.load_blank(Slot::First);
        p.load_blank(Slot::Second);
        p.combine().unwrap();
        p.set_orientation(Slot::First, Orientation::Portrait);
        assert_eq!(p.state(), PipelineState::Combined, "unchanged orientation keeps output");
        p.set_orientation(Slot::First, Orientation::Landscape);
        assert_eq!(p.state(), PipelineState::BothLoaded);
    }

    #[test]
    fn blank_preview_is_fitted_to_thumbnail_box() {
        let mut p = DocumentPipeline::new(CombinerConfig::default(), ScaledRenderer::new(8, 10));
        p.load_blank(Slot::First);
        assert_eq!(p.preview(Slot::First).unwrap().dimensions(), (98, 140));
    }

    #[test]
    fn suggestions_use_placeholder_for_blank() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        p.load_file(Slot::First, pdf_file(dir.path(), "report.pdf")).unwrap();
        p.load_blank(Slot::Second);
        let (top, bottom) = p.suggested_filenames(ExportFormat::Pdf);
        assert_eq!(top, "report_top_blank_top.pdf");
        assert_eq!(bottom, "report_bottom_blank_bottom.pdf");
    }

    #[test]
    fn export_before_combine_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = DocumentPipeline::new(small_config(), ScaledRenderer::new(8, 10));
        p.load_blank(Slot::First);
        p.load_blank(Slot::Second);
        let req = ExportRequest::new(ExportFormat::Png, p.config());
        assert!(matches!(
            p.export(&req, dir.path()),
            Err(CombineError::Validation(_))
        ));
        assert!(p.select_export_format(ExportFormat::Png).is_err());
    }
}
