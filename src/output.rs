//! Output types: the combined composites, export requests and their results.
//!
//! [`CombinedOutput`] is only ever written as a pair. The pipeline builds both
//! composites into locals and moves them in together, so a failed run can never
//! leave one half of a new result next to one half of an old one.

use crate::config::CombinerConfig;
use crate::error::CombineError;
use crate::pipeline::slice::Half;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File format for exported composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Single-page PDF wrapping the raster. (default)
    #[default]
    Pdf,
    /// PNG raster with a pHYs DPI chunk.
    Png,
}

impl ExportFormat {
    /// Lower-case file extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => f.write_str("PDF"),
            ExportFormat::Png => f.write_str("PNG"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            _ => Err(CombineError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// The two composites produced by one successful combine.
#[derive(Debug, Clone)]
pub struct CombinedOutput {
    /// Top half of page A stacked over top half of page B.
    pub top_combined: Option<DynamicImage>,
    /// Bottom half of page A stacked over bottom half of page B.
    pub bottom_combined: Option<DynamicImage>,
    /// Format recorded by `select_export_format`; seeds
    /// `DocumentPipeline::export_request`.
    pub export_format: ExportFormat,
}

impl CombinedOutput {
    pub fn new(export_format: ExportFormat) -> Self {
        Self {
            top_combined: None,
            bottom_combined: None,
            export_format,
        }
    }

    /// Both composites are present.
    pub fn is_ready(&self) -> bool {
        self.top_combined.is_some() && self.bottom_combined.is_some()
    }

    /// Composite for one half, if combined.
    pub fn composite(&self, half: Half) -> Option<&DynamicImage> {
        match half {
            Half::Top => self.top_combined.as_ref(),
            Half::Bottom => self.bottom_combined.as_ref(),
        }
    }

    pub(crate) fn store(&mut self, top: DynamicImage, bottom: DynamicImage) {
        self.top_combined = Some(top);
        self.bottom_combined = Some(bottom);
    }

    pub(crate) fn clear(&mut self) {
        self.top_combined = None;
        self.bottom_combined = None;
    }
}

/// Parameters for one export call.
///
/// Built per export and never persisted. Filenames left as `None` (or empty
/// after sanitising) fall back to the suggestions derived from the input names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Encoder quality, 1–100.
    pub quality: u8,
    /// Resolution metadata written into both files.
    pub dpi: u32,
    pub top_filename: Option<String>,
    pub bottom_filename: Option<String>,
    /// Pick `name_1.ext`, `name_2.ext`, … instead of overwriting existing files.
    pub no_clobber: bool,
}

impl ExportRequest {
    /// Request using the configured quality and export DPI.
    pub fn new(format: ExportFormat, config: &CombinerConfig) -> Self {
        Self {
            format,
            quality: config.export_quality,
            dpi: config.export_dpi,
            top_filename: None,
            bottom_filename: None,
            no_clobber: false,
        }
    }

    pub fn top_filename(mut self, name: impl Into<String>) -> Self {
        self.top_filename = Some(name.into());
        self
    }

    pub fn bottom_filename(mut self, name: impl Into<String>) -> Self {
        self.bottom_filename = Some(name.into());
        self
    }

    pub fn no_clobber(mut self, v: bool) -> Self {
        self.no_clobber = v;
        self
    }

    /// Final file name for `half`: the user's name (sanitised) or `suggested`,
    /// with the format's extension appended when missing.
    pub fn file_name(&self, half: Half, suggested: &str) -> String {
        let user = match half {
            Half::Top => self.top_filename.as_deref(),
            Half::Bottom => self.bottom_filename.as_deref(),
        };
        let base = user
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| suggested.to_string());
        ensure_extension(&base, self.format)
    }
}

/// Where an export wrote its two files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFiles {
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub format: ExportFormat,
    pub dpi: u32,
}

/// Suggested `(top, bottom)` filenames for two input base names.
///
/// `{base1}_top_{base2}_top.{ext}` and `{base1}_bottom_{base2}_bottom.{ext}`.
pub fn suggested_filenames(base1: &str, base2: &str, format: ExportFormat) -> (String, String) {
    let ext = format.extension();
    (
        format!("{base1}_top_{base2}_top.{ext}"),
        format!("{base1}_bottom_{base2}_bottom.{ext}"),
    )
}

/// Replace characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if "<>:\"/\\|?*".contains(c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Append `.{ext}` unless `name` already ends with it (case-insensitive).
pub fn ensure_extension(name: &str, format: ExportFormat) -> String {
    let suffix = format!(".{}", format.extension());
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// First of `name`, `stem_1.ext`, `stem_2.ext`, … that does not exist in `dir`.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!(" png ".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert!(matches!(
            "tiff".parse::<ExportFormat>(),
            Err(CombineError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn suggestions_follow_top_bottom_pattern() {
        let (top, bottom) = suggested_filenames("invoice", "blank", ExportFormat::Png);
        assert_eq!(top, "invoice_top_blank_top.png");
        assert_eq!(bottom, "invoice_bottom_blank_bottom.png");
    }

    #[test]
    fn extension_appended_only_when_missing() {
        assert_eq!(ensure_extension("tops", ExportFormat::Pdf), "tops.pdf");
        assert_eq!(ensure_extension("tops.pdf", ExportFormat::Pdf), "tops.pdf");
        assert_eq!(ensure_extension("TOPS.PDF", ExportFormat::Pdf), "TOPS.PDF");
        assert_eq!(ensure_extension("tops.pdf", ExportFormat::Png), "tops.pdf.png");
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("  a/b:c*d?  "), "a_b_c_d_");
    }

    #[test]
    fn request_falls_back_to_suggestion_for_blank_names() {
        let req = ExportRequest::new(ExportFormat::Pdf, &CombinerConfig::default())
            .top_filename("   ")
            .bottom_filename("my bottoms");
        assert_eq!(req.file_name(Half::Top, "a_top_b_top.pdf"), "a_top_b_top.pdf");
        assert_eq!(
            req.file_name(Half::Bottom, "a_bottom_b_bottom.pdf"),
            "my bottoms.pdf"
        );
    }

    #[test]
    fn unique_path_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.png"), b"x").unwrap();
        std::fs::write(dir.path().join("out_1.png"), b"x").unwrap();
        assert_eq!(unique_path(dir.path(), "out.png"), dir.path().join("out_2.png"));
        assert_eq!(unique_path(dir.path(), "new.png"), dir.path().join("new.png"));
    }

    #[test]
    fn combined_output_ready_only_with_both_halves() {
        let mut out = CombinedOutput::new(ExportFormat::Pdf);
        assert!(!out.is_ready());
        out.top_combined = Some(DynamicImage::new_rgb8(1, 1));
        assert!(!out.is_ready());
        out.bottom_combined = Some(DynamicImage::new_rgb8(1, 1));
        assert!(out.is_ready());
        out.clear();
        assert!(out.composite(Half::Top).is_none());
    }
}
