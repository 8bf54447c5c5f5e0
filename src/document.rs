//! Input-side data model: the two page slots and the pipeline state.

use crate::error::CombineError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One of the two input positions. `First` supplies the upper piece of each
/// composite, `Second` the lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::First, Slot::Second];

    pub(crate) fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::First => f.write_str("page 1"),
            Slot::Second => f.write_str("page 2"),
        }
    }
}

/// Page orientation requested for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    /// Rotated a quarter-turn counter-clockwise before slicing.
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

impl FromStr for Orientation {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(CombineError::Validation(format!(
                "unknown orientation '{other}' (expected portrait or landscape)"
            ))),
        }
    }
}

/// Where a slot's page comes from. A slot holds a file or a blank, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSource {
    File(PathBuf),
    Blank,
}

/// One input slot.
///
/// The preview raster is rendered at preview DPI when the page is loaded. The
/// high-resolution raster is filled lazily by the combine step and dropped
/// whenever the source changes.
#[derive(Debug, Clone, Default)]
pub struct PageInput {
    source: Option<PageSource>,
    orientation: Orientation,
    preview: Option<DynamicImage>,
    high_res: Option<DynamicImage>,
}

impl PageInput {
    /// A source is set, either a file or a blank page.
    pub fn is_ready(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.source, Some(PageSource::Blank))
    }

    pub fn source(&self) -> Option<&PageSource> {
        self.source.as_ref()
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.source {
            Some(PageSource::File(p)) => Some(p),
            _ => None,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn preview(&self) -> Option<&DynamicImage> {
        self.preview.as_ref()
    }

    pub fn high_res(&self) -> Option<&DynamicImage> {
        self.high_res.as_ref()
    }

    /// Base name used in suggested export filenames: the file stem, or
    /// `placeholder` for blank and empty slots.
    pub fn base_name(&self, placeholder: &str) -> String {
        self.file_path()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| placeholder.to_string())
    }

    pub(crate) fn set_source(&mut self, source: PageSource, preview: DynamicImage) {
        self.source = Some(source);
        self.preview = Some(preview);
        self.high_res = None;
    }

    pub(crate) fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub(crate) fn set_high_res(&mut self, raster: DynamicImage) {
        self.high_res = Some(raster);
    }

    pub(crate) fn clear_high_res(&mut self) {
        self.high_res = None;
    }
}

/// Where the pipeline stands. Derived from the slots and the output, never
/// stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Empty,
    FirstLoaded,
    SecondLoaded,
    BothLoaded,
    Combined,
    ExportReady,
}

impl PipelineState {
    /// Combining needs both slots; an existing result may be recomputed.
    pub fn can_combine(self) -> bool {
        matches!(
            self,
            PipelineState::BothLoaded | PipelineState::Combined | PipelineState::ExportReady
        )
    }

    pub fn can_export(self) -> bool {
        matches!(self, PipelineState::Combined | PipelineState::ExportReady)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Empty => "empty",
            PipelineState::FirstLoaded => "page 1 loaded",
            PipelineState::SecondLoaded => "page 2 loaded",
            PipelineState::BothLoaded => "both pages loaded",
            PipelineState::Combined => "combined",
            PipelineState::ExportReady => "ready to export",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_parses_case_insensitively() {
        assert_eq!("Landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert_eq!(" portrait".parse::<Orientation>().unwrap(), Orientation::Portrait);
        assert!("sideways".parse::<Orientation>().is_err());
    }

    #[test]
    fn default_orientation_is_portrait() {
        assert_eq!(PageInput::default().orientation(), Orientation::Portrait);
    }

    #[test]
    fn empty_slot_is_not_ready() {
        let slot = PageInput::default();
        assert!(!slot.is_ready());
        assert!(!slot.is_blank());
        assert_eq!(slot.base_name("blank"), "blank");
    }

    #[test]
    fn file_slot_uses_stem_as_base_name() {
        let mut slot = PageInput::default();
        slot.set_source(
            PageSource::File("/scans/invoice.march.pdf".into()),
            DynamicImage::new_rgb8(1, 1),
        );
        assert!(slot.is_ready());
        assert_eq!(slot.base_name("blank"), "invoice.march");
    }

    #[test]
    fn new_source_drops_cached_high_res() {
        let mut slot = PageInput::default();
        slot.set_source(PageSource::Blank, DynamicImage::new_rgb8(1, 1));
        slot.set_high_res(DynamicImage::new_rgb8(4, 4));
        slot.set_source(PageSource::File("a.pdf".into()), DynamicImage::new_rgb8(1, 1));
        assert!(slot.high_res().is_none());
        assert!(!slot.is_blank());
    }

    #[test]
    fn only_combined_states_allow_export() {
        assert!(!PipelineState::BothLoaded.can_export());
        assert!(PipelineState::Combined.can_export());
        assert!(PipelineState::ExportReady.can_combine());
        assert!(!PipelineState::FirstLoaded.can_combine());
    }
}
