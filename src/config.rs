//! Configuration types for the slice-and-combine pipeline.
//!
//! Every constant the pipeline consumes lives in [`CombinerConfig`], built via
//! its [`CombinerConfigBuilder`]. The defaults reproduce the fixed values of a
//! desktop session: 100 DPI previews, 300 DPI exports, A4-at-300-DPI blank
//! pages and a 120×140 thumbnail box.

use crate::error::CombineError;
use crate::output::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no pdfium library path is configured.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Configuration for a [`crate::DocumentPipeline`].
///
/// # Example
/// ```rust
/// use pdf_halves::CombinerConfig;
///
/// let config = CombinerConfig::builder()
///     .export_dpi(200)
///     .export_quality(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.export_dpi, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinerConfig {
    /// DPI used for on-screen previews. Range: 36–600. Default: 100.
    pub preview_dpi: u32,

    /// DPI used when re-rendering pages for the composites and as the
    /// resolution metadata of exported files. Range: 72–1200. Default: 300.
    pub export_dpi: u32,

    /// Pixel size of a synthesized blank page at export resolution.
    /// Default: 2480×3508 (A4 at 300 DPI).
    pub blank_page_size: (u32, u32),

    /// Bounding box that preview thumbnails are fitted into. Default: 120×140.
    pub preview_max_size: (u32, u32),

    /// Encoder quality for exports, 1–100. Default: 100.
    ///
    /// Drives the JPEG stream embedded in PDF exports. PNG is lossless and
    /// ignores it.
    pub export_quality: u8,

    /// Format a fresh [`crate::CombinedOutput`] starts with. Default: PDF.
    pub default_format: ExportFormat,

    /// Stand-in base name used in suggested filenames for blank slots.
    /// Default: `"blank"`.
    pub blank_placeholder: String,

    /// Explicit path to the pdfium shared library.
    ///
    /// When `None`, `PDFIUM_LIB_PATH` is consulted, then the system library
    /// search path.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            preview_dpi: 100,
            export_dpi: 300,
            blank_page_size: (2480, 3508),
            preview_max_size: (120, 140),
            export_quality: 100,
            default_format: ExportFormat::Pdf,
            blank_placeholder: "blank".to_string(),
            pdfium_library: None,
        }
    }
}

impl CombinerConfig {
    /// Create a new builder for `CombinerConfig`.
    pub fn builder() -> CombinerConfigBuilder {
        CombinerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The pdfium library to bind, resolving the environment fallback.
    pub fn resolved_pdfium_library(&self) -> Option<PathBuf> {
        self.pdfium_library.clone().or_else(|| {
            std::env::var(PDFIUM_LIB_PATH_ENV)
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// Builder for [`CombinerConfig`].
#[derive(Debug)]
pub struct CombinerConfigBuilder {
    config: CombinerConfig,
}

impl CombinerConfigBuilder {
    pub fn preview_dpi(mut self, dpi: u32) -> Self {
        self.config.preview_dpi = dpi.clamp(36, 600);
        self
    }

    pub fn export_dpi(mut self, dpi: u32) -> Self {
        self.config.export_dpi = dpi.clamp(72, 1200);
        self
    }

    pub fn blank_page_size(mut self, width: u32, height: u32) -> Self {
        self.config.blank_page_size = (width, height);
        self
    }

    pub fn preview_max_size(mut self, width: u32, height: u32) -> Self {
        self.config.preview_max_size = (width, height);
        self
    }

    pub fn export_quality(mut self, quality: u8) -> Self {
        self.config.export_quality = quality.clamp(1, 100);
        self
    }

    pub fn default_format(mut self, format: ExportFormat) -> Self {
        self.config.default_format = format;
        self
    }

    pub fn blank_placeholder(mut self, name: impl Into<String>) -> Self {
        self.config.blank_placeholder = name.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CombinerConfig, CombineError> {
        let c = &self.config;
        let (bw, bh) = c.blank_page_size;
        if bw == 0 || bh == 0 {
            return Err(CombineError::InvalidConfig(format!(
                "blank page size must be non-zero, got {bw}x{bh}"
            )));
        }
        let (pw, ph) = c.preview_max_size;
        if pw == 0 || ph == 0 {
            return Err(CombineError::InvalidConfig(format!(
                "preview box must be non-zero, got {pw}x{ph}"
            )));
        }
        if c.blank_placeholder.trim().is_empty() {
            return Err(CombineError::InvalidConfig(
                "blank placeholder name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_desktop_constants() {
        let c = CombinerConfig::default();
        assert_eq!(c.preview_dpi, 100);
        assert_eq!(c.export_dpi, 300);
        assert_eq!(c.blank_page_size, (2480, 3508));
        assert_eq!(c.preview_max_size, (120, 140));
        assert_eq!(c.export_quality, 100);
        assert_eq!(c.default_format, ExportFormat::Pdf);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = CombinerConfig::builder()
            .preview_dpi(5)
            .export_dpi(5000)
            .export_quality(0)
            .build()
            .unwrap();
        assert_eq!(c.preview_dpi, 36);
        assert_eq!(c.export_dpi, 1200);
        assert_eq!(c.export_quality, 1);
    }

    #[test]
    fn zero_blank_size_is_rejected() {
        let err = CombinerConfig::builder()
            .blank_page_size(0, 100)
            .build()
            .unwrap_err();
        assert!(matches!(err, CombineError::InvalidConfig(_)));
    }

    #[test]
    fn empty_placeholder_is_rejected() {
        let err = CombinerConfig::builder()
            .blank_placeholder("  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn explicit_library_wins_over_env() {
        let c = CombinerConfig::builder()
            .pdfium_library("/opt/pdfium/libpdfium.so")
            .build()
            .unwrap();
        assert_eq!(
            c.resolved_pdfium_library(),
            Some(PathBuf::from("/opt/pdfium/libpdfium.so"))
        );
    }
}
