//! Callback trait for background-operation events.
//!
//! A [`crate::Session`] takes an [`Arc<dyn PipelineCallbacks>`] at construction
//! and invokes it from [`crate::Session::poll`], always on the thread that
//! polls. Workers never call it directly; they post messages that `poll`
//! drains.
//!
//! # Example
//!
//! ```rust
//! use pdf_halves::{Completed, PipelineCallbacks};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallbacks {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineCallbacks for CountingCallbacks {
//!     fn on_complete(&self, done: &Completed) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{done}");
//!     }
//! }
//!
//! let callbacks: Arc<dyn PipelineCallbacks> = Arc::new(CountingCallbacks {
//!     completed: AtomicUsize::new(0),
//! });
//! ```

use crate::document::Slot;
use crate::error::CombineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A long-running operation that can be handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Load(Slot),
    Combine,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load(slot) => write!(f, "load {slot}"),
            Operation::Combine => f.write_str("combine"),
        }
    }
}

/// Result summary handed to [`PipelineCallbacks::on_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completed {
    /// A page finished loading into `slot`.
    Loaded { slot: Slot, preview_size: (u32, u32) },
    /// Both composites were produced.
    Combined {
        top_size: (u32, u32),
        bottom_size: (u32, u32),
    },
}

impl fmt::Display for Completed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completed::Loaded { slot, preview_size } => {
                write!(f, "Loaded {slot} ({}x{} preview)", preview_size.0, preview_size.1)
            }
            Completed::Combined {
                top_size,
                bottom_size,
            } => write!(
                f,
                "Combined: top {}x{}, bottom {}x{}",
                top_size.0, top_size.1, bottom_size.0, bottom_size.1
            ),
        }
    }
}

/// Receives progress, failure and completion events for background work.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineCallbacks: Send + Sync {
    /// `fraction` is in `0.0..=1.0`; `message` is a short status line.
    fn on_progress(&self, fraction: f32, message: &str) {
        let _ = (fraction, message);
    }

    /// `operation` failed and left the pipeline usable again.
    fn on_error(&self, operation: Operation, error: &CombineError) {
        let _ = (operation, error);
    }

    fn on_complete(&self, completed: &Completed) {
        let _ = completed;
    }
}

/// Callbacks that ignore every event.
pub struct NoopCallbacks;

impl PipelineCallbacks for NoopCallbacks {}

/// Shared handle type stored by [`crate::Session`].
pub type SharedCallbacks = Arc<dyn PipelineCallbacks>;
