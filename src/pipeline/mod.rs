//! Raster stages used by [`crate::DocumentPipeline`].
//!
//! Each submodule implements exactly one transformation step and is
//! independently testable. None of them holds state.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ orient ──▶ slice ──▶ resize ──▶ composite ──▶ export
//! (pdfium/   (quarter   (top/     (match     (stack on     (PDF/PNG
//!  blank)     turn)      bottom)   widths)    white)        + DPI)
//! ```
//!
//! 1. [`source`]    render page 1 of a PDF at a DPI, or synthesize a white page
//! 2. [`orient`]    turn landscape pages counter-clockwise, pass portrait through
//! 3. [`slice`]     crop at `floor(height / 2)`
//! 4. [`resize`]    stretch a piece to the common width, height unchanged
//! 5. [`composite`] paste two pieces one above the other
//! 6. [`export`]    write a composite with resolution metadata

pub mod composite;
pub mod export;
pub mod orient;
pub mod resize;
pub mod slice;
pub mod source;
