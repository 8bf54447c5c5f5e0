//! # pdf-halves
//!
//! Cut two single-page documents in half and recombine the halves into two
//! new pages: the top halves stacked together, and the bottom halves stacked
//! together.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page 1 (PDF or blank) ─┐
//!                         ├─ 1. Source   render page 1 at 300 DPI via pdfium, or a white A4 page
//! page 2 (PDF or blank) ─┘   2. Match    a lone blank page takes the other page's size
//!                            3. Orient   landscape pages turn a quarter counter-clockwise
//!                            4. Slice    each page splits at floor(height / 2)
//!                            5. Stack    top₁/top₂ and bottom₁/bottom₂ on white canvases
//!                            6. Export   two PDF or PNG files carrying the DPI
//! ```
//!
//! Previews are rendered separately at a low DPI; they are never reused for the
//! export-resolution composites.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_halves::{CombinerConfig, DocumentPipeline, ExportFormat, ExportRequest, Slot};
//! use std::path::Path;
//!
//! fn main() -> Result<(), pdf_halves::CombineError> {
//!     let config = CombinerConfig::default();
//!     let mut pipeline = DocumentPipeline::with_pdfium(config);
//!     pipeline.load_file(Slot::First, "invoice.pdf")?;
//!     pipeline.load_blank(Slot::Second);
//!     pipeline.combine()?;
//!
//!     let request = ExportRequest::new(ExportFormat::Pdf, pipeline.config());
//!     let files = pipeline.export(&request, Path::new("out"))?;
//!     println!("{} / {}", files.top.display(), files.bottom.display());
//!     Ok(())
//! }
//! ```
//!
//! Event-loop hosts wrap the pipeline in a [`Session`], which runs loads and
//! combines on a blocking worker and delivers [`PipelineCallbacks`] events
//! from [`Session::poll`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-halves` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-halves = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod combiner;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use combiner::DocumentPipeline;
pub use config::{CombinerConfig, CombinerConfigBuilder, PDFIUM_LIB_PATH_ENV};
pub use document::{Orientation, PageInput, PageSource, PipelineState, Slot};
pub use error::{CombineError, ErrorKind};
pub use output::{CombinedOutput, ExportFormat, ExportRequest, ExportedFiles};
pub use pipeline::slice::Half;
pub use pipeline::source::{PageRenderer, PdfiumRenderer};
pub use progress::{Completed, NoopCallbacks, Operation, PipelineCallbacks, SharedCallbacks};
pub use worker::Session;
