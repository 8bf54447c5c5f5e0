//! Error types for the pdf-halves library.
//!
//! A single enum, [`CombineError`], is the root of every failure the pipeline
//! can report. Each variant belongs to one [`ErrorKind`], so callers can either
//! match a specific variant or branch on the coarse kind:
//!
//! * [`ErrorKind::InvalidInput`]: the source path is missing or is not a
//!   recognised document.
//! * [`ErrorKind::Load`]: the renderer could not produce a first page.
//! * [`ErrorKind::Validation`]: an operation was invoked from a state that
//!   does not allow it (e.g. combining with one slot empty).
//! * [`ErrorKind::ImageProcessing`]: any failure while transforming,
//!   cropping, resizing or compositing rasters.
//! * [`ErrorKind::Export`]: I/O or encoding failure while saving.
//! * [`ErrorKind::Config`]: builder validation failed.
//!
//! No operation retries on its own. Every error is terminal for the call that
//! produced it.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-halves library.
#[derive(Debug, Error)]
pub enum CombineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source path does not exist, is not a file, or lacks a `.pdf` extension.
    #[error("Invalid input '{}': {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    /// The document opened but rendering produced no usable page.
    #[error("Failed to load '{}': {detail}", path.display())]
    Load { path: PathBuf, detail: String },

    // ── State errors ──────────────────────────────────────────────────────
    /// The pipeline was asked to do something its current state forbids.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ── Raster errors ─────────────────────────────────────────────────────
    /// A transform/crop/resize/composite step failed.
    #[error("Image processing failed during {stage}: {detail}")]
    ImageProcessing { stage: &'static str, detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Writing or encoding an output file failed.
    #[error("Failed to export '{}': {detail}", path.display())]
    Export { path: PathBuf, detail: String },

    /// The requested export format is neither PDF nor PNG.
    #[error("Unsupported export format '{format}' (expected PDF or PNG)")]
    UnsupportedFormat { format: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of a [`CombineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    Load,
    Validation,
    ImageProcessing,
    Export,
    Config,
}

impl CombineError {
    /// The taxonomy bucket this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CombineError::InvalidInput { .. } => ErrorKind::InvalidInput,
            CombineError::Load { .. } => ErrorKind::Load,
            CombineError::Validation(_) => ErrorKind::Validation,
            CombineError::ImageProcessing { .. } => ErrorKind::ImageProcessing,
            CombineError::Export { .. } | CombineError::UnsupportedFormat { .. } => {
                ErrorKind::Export
            }
            CombineError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn processing(stage: &'static str, detail: impl Into<String>) -> Self {
        CombineError::ImageProcessing {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn export(path: impl Into<PathBuf>, detail: impl std::fmt::Display) -> Self {
        CombineError::Export {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
