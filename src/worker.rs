//! Background execution of loads and combines.
//!
//! A [`Session`] owns the [`DocumentPipeline`] while idle. Starting a load or
//! a combine moves the pipeline into a `spawn_blocking` task, so exactly one
//! thread can touch the slots and the output at any time. The task reports
//! over an unbounded channel:
//!
//! ```text
//!  caller thread                     blocking worker
//!  ─────────────                     ───────────────
//!  start_combine() ── pipeline ────▶ combine_with_progress()
//!                                       │ Progress { 0.1 }
//!                                       │ Progress { 0.5 } ...
//!  poll() ◀──────── WorkerMessage ──────┤
//!    on_progress / on_complete          │ Finished { pipeline, outcome }
//!    pipeline restored ◀────────────────┘
//! ```
//!
//! Callbacks only ever run inside [`Session::poll`], on the polling thread.
//! There is no cancellation: a started operation runs until it finishes or
//! fails. A panic inside the operation is caught on the worker and reported
//! as an image processing failure; the pipeline comes back with its inputs.

use crate::combiner::DocumentPipeline;
use crate::config::CombinerConfig;
use crate::document::{Orientation, Slot};
use crate::error::CombineError;
use crate::output::{ExportFormat, ExportRequest, ExportedFiles};
use crate::pipeline::source::PageRenderer;
use crate::progress::{Completed, Operation, SharedCallbacks};
use image::DynamicImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Messages sent from a worker back to its session.
enum WorkerMessage {
    Progress {
        fraction: f32,
        message: String,
    },
    Finished {
        pipeline: Box<DocumentPipeline>,
        operation: Operation,
        outcome: Result<Completed, CombineError>,
    },
}

/// Drives a [`DocumentPipeline`] from a UI-style event loop.
pub struct Session {
    pipeline: Option<DocumentPipeline>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    in_flight: Option<(Operation, JoinHandle<()>)>,
    callbacks: SharedCallbacks,
    // Used to rebuild the pipeline if a worker dies with it.
    config: CombinerConfig,
    renderer: Arc<dyn PageRenderer>,
}

impl Session {
    /// Wrap `pipeline`; workers are spawned on `runtime`.
    pub fn new(pipeline: DocumentPipeline, callbacks: SharedCallbacks, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config: pipeline.config().clone(),
            renderer: pipeline.renderer(),
            pipeline: Some(pipeline),
            runtime,
            tx,
            rx,
            in_flight: None,
            callbacks,
        }
    }

    /// A worker currently owns the pipeline.
    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The pipeline, unless a worker holds it.
    pub fn pipeline(&self) -> Option<&DocumentPipeline> {
        self.pipeline.as_ref()
    }

    pub fn into_pipeline(self) -> Option<DocumentPipeline> {
        self.pipeline
    }

    // ── Background operations ─────────────────────────────────────────────

    /// Start loading `path` into `slot` on a worker.
    ///
    /// Returns `false` without doing anything while another operation runs.
    pub fn start_load(&mut self, slot: Slot, path: impl Into<PathBuf>) -> bool {
        let Some(mut pipeline) = self.take_idle() else {
            return false;
        };
        let path = path.into();
        let operation = Operation::Load(slot);
        let tx = self.tx.clone();

        info!("Starting {} from {}", operation, path.display());
        let handle = self.runtime.spawn_blocking(move || {
            send_progress(&tx, 0.1, "Loading page");
            let outcome = run_guarded(operation, || {
                pipeline.load_file(slot, &path).map(|()| Completed::Loaded {
                    slot,
                    preview_size: size_of(pipeline.preview(slot)),
                })
            });
            if outcome.is_ok() {
                send_progress(&tx, 1.0, "Page loaded");
            }
            let _ = tx.send(WorkerMessage::Finished {
                pipeline: Box::new(pipeline),
                operation,
                outcome,
            });
        });
        self.in_flight = Some((operation, handle));
        true
    }

    /// Start combining on a worker.
    ///
    /// Returns `false` while another operation runs. When the slots are not
    /// both loaded nothing is spawned: `on_error` receives the validation
    /// error and the call returns `false`.
    pub fn start_combine(&mut self) -> bool {
        if let Some(pipeline) = self.pipeline.as_ref().filter(|_| self.in_flight.is_none()) {
            let state = pipeline.state();
            if !state.can_combine() {
                let err = CombineError::Validation(format!(
                    "select two pages (PDF or blank) before combining (currently {state})"
                ));
                self.callbacks.on_error(Operation::Combine, &err);
                return false;
            }
        }
        let Some(mut pipeline) = self.take_idle() else {
            return false;
        };
        let tx = self.tx.clone();

        info!("Starting combine");
        let handle = self.runtime.spawn_blocking(move || {
            let outcome = run_guarded(Operation::Combine, || {
                pipeline
                    .combine_with_progress(&|fraction: f32, message: &str| {
                        send_progress(&tx, fraction, message)
                    })
                    .map(|out| Completed::Combined {
                        top_size: size_of(out.top_combined.as_ref()),
                        bottom_size: size_of(out.bottom_combined.as_ref()),
                    })
            });
            let _ = tx.send(WorkerMessage::Finished {
                pipeline: Box::new(pipeline),
                operation: Operation::Combine,
                outcome,
            });
        });
        self.in_flight = Some((Operation::Combine, handle));
        true
    }

    /// Deliver queued worker messages to the callbacks.
    ///
    /// Call this from the event loop's tick. Returns the number of messages
    /// handled. A worker task that was lost without reporting (its pipeline
    /// went with it) is treated as an image processing failure and the
    /// pipeline is replaced with an empty one.
    pub fn poll(&mut self) -> usize {
        // Sample before draining: a worker sends `Finished` before it ends.
        let worker_ended = self
            .in_flight
            .as_ref()
            .is_some_and(|(_, handle)| handle.is_finished());

        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            handled += 1;
            match message {
                WorkerMessage::Progress { fraction, message } => {
                    self.callbacks.on_progress(fraction, &message);
                }
                WorkerMessage::Finished {
                    pipeline,
                    operation,
                    outcome,
                } => {
                    self.pipeline = Some(*pipeline);
                    self.in_flight = None;
                    match outcome {
                        Ok(done) => {
                            info!("{}", done);
                            self.callbacks.on_complete(&done);
                        }
                        Err(err) => {
                            warn!("{} failed: {}", operation, err);
                            self.callbacks.on_error(operation, &err);
                        }
                    }
                }
            }
        }

        if worker_ended {
            if let Some((operation, _)) = self.in_flight.take() {
                warn!("{} worker stopped without reporting; starting over", operation);
                self.pipeline = Some(DocumentPipeline::new(
                    self.config.clone(),
                    Arc::clone(&self.renderer),
                ));
                let err = CombineError::processing(
                    "background worker",
                    format!("{operation} stopped unexpectedly"),
                );
                self.callbacks.on_error(operation, &err);
            }
        }
        handled
    }

    /// Poll every `tick` until no operation is in flight.
    pub async fn run_until_idle(&mut self, tick: Duration) {
        loop {
            self.poll();
            if !self.is_processing() {
                return;
            }
            tokio::time::sleep(tick).await;
        }
    }

    // ── Synchronous operations ────────────────────────────────────────────

    pub fn load_blank(&mut self, slot: Slot) -> Result<(), CombineError> {
        self.idle_mut()?.load_blank(slot);
        Ok(())
    }

    pub fn set_orientation(&mut self, slot: Slot, orientation: Orientation) -> Result<(), CombineError> {
        self.idle_mut()?.set_orientation(slot, orientation);
        Ok(())
    }

    pub fn select_export_format(&mut self, format: ExportFormat) -> Result<(), CombineError> {
        self.idle_mut()?.select_export_format(format)
    }

    /// See [`DocumentPipeline::export_request`].
    pub fn export_request(&self) -> Result<ExportRequest, CombineError> {
        match (&self.in_flight, self.pipeline.as_ref()) {
            (None, Some(pipeline)) => Ok(pipeline.export_request()),
            _ => Err(CombineError::Validation("no idle pipeline to export from".into())),
        }
    }

    /// Export on the calling thread.
    pub fn export(&mut self, request: &ExportRequest, dir: &Path) -> Result<ExportedFiles, CombineError> {
        self.idle_mut()?.export(request, dir)
    }

    pub fn reset(&mut self) -> Result<(), CombineError> {
        self.idle_mut()?.reset();
        Ok(())
    }

    fn idle_mut(&mut self) -> Result<&mut DocumentPipeline, CombineError> {
        match (&self.in_flight, self.pipeline.as_mut()) {
            (None, Some(pipeline)) => Ok(pipeline),
            (Some((operation, _)), _) => Err(CombineError::Validation(format!(
                "{operation} is still running"
            ))),
            (None, None) => Err(CombineError::Validation("no pipeline available".into())),
        }
    }

    fn take_idle(&mut self) -> Option<DocumentPipeline> {
        if let Some((operation, _)) = &self.in_flight {
            debug!("Ignoring request: {} in progress", operation);
            return None;
        }
        self.pipeline.take()
    }
}

fn send_progress(tx: &mpsc::UnboundedSender<WorkerMessage>, fraction: f32, message: &str) {
    let _ = tx.send(WorkerMessage::Progress {
        fraction,
        message: message.to_string(),
    });
}

/// Run `work`, turning a panic into an image processing error.
fn run_guarded<F>(operation: Operation, work: F) -> Result<Completed, CombineError>
where
    F: FnOnce() -> Result<Completed, CombineError>,
{
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let detail = panic_message(payload.as_ref());
        warn!("{} panicked: {}", operation, detail);
        Err(CombineError::processing(
            "background worker",
            format!("{operation} panicked: {detail}"),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn size_of(image: Option<&DynamicImage>) -> (u32, u32) {
    image.map_or((0, 0), |i| (i.width(), i.height()))
}
