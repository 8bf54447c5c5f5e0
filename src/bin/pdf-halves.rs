//! CLI binary for pdf-halves.
//!
//! A thin shim over the library crate: it maps flags onto `CombinerConfig`,
//! drives a `Session` the way an event loop would, and prints where the two
//! composites were written.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_halves::{
    CombineError, CombinerConfig, Completed, DocumentPipeline, ExportFormat, Operation,
    Orientation, PipelineCallbacks, Session, Slot,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

/// How often the session is polled while a worker runs.
const TICK: Duration = Duration::from_millis(20);

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Session callbacks ────────────────────────────────────────────────────────

/// Collects the last failure and, when enabled, drives an indicatif bar.
struct CliCallbacks {
    bar: Option<ProgressBar>,
    failure: Mutex<Option<String>>,
}

impl CliCallbacks {
    fn new(show_progress: bool) -> Arc<Self> {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>3}%  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Working");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self {
            bar,
            failure: Mutex::new(None),
        })
    }

    fn take_failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|mut f| f.take())
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl PipelineCallbacks for CliCallbacks {
    fn on_progress(&self, fraction: f32, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_position((fraction.clamp(0.0, 1.0) * 100.0).round() as u64);
            bar.set_message(message.to_string());
        }
    }

    fn on_error(&self, operation: Operation, error: &CombineError) {
        if let Some(bar) = &self.bar {
            bar.println(format!("  {} {}", red("✗"), red(&format!("{operation}: {error}"))));
            bar.set_position(0);
        }
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(format!("{operation} failed: {error}"));
        }
    }

    fn on_complete(&self, completed: &Completed) {
        if let Some(bar) = &self.bar {
            bar.println(format!("  {} {}", green("✓"), dim(&completed.to_string())));
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Combine two scans, PDF output in the current directory
  pdf-halves front.pdf back.pdf

  # Second page is a white sheet, PNG output
  pdf-halves form.pdf blank --format png -o out/

  # First page was scanned sideways
  pdf-halves --first-orientation landscape a.pdf b.pdf

  # Custom names, never overwrite, machine-readable result
  pdf-halves a.pdf b.pdf --top-name tops --bottom-name bottoms --no-clobber --json

OUTPUT NAMES:
  Without --top-name/--bottom-name the files are named
    {first}_top_{second}_top.{ext}
    {first}_bottom_{second}_bottom.{ext}
  where a blank page contributes the name "blank".

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium (otherwise the system library is used)
  RUST_LOG          Overrides the log filter (e.g. pdf_halves=debug)
"#;

/// Recombine the top and bottom halves of two single-page documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-halves",
    version,
    about = "Recombine the top and bottom halves of two single-page documents",
    long_about = "Render the first page of two PDFs (or use blank white pages), cut each in half \
and write two new pages: both top halves stacked, and both bottom halves stacked.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// First page: a PDF path or `blank`. Its halves go on top.
    first: String,

    /// Second page: a PDF path or `blank`. Its halves go underneath.
    second: String,

    /// Orientation of the first page.
    #[arg(long, value_enum, default_value = "portrait", env = "PDF_HALVES_FIRST_ORIENTATION")]
    first_orientation: OrientationArg,

    /// Orientation of the second page.
    #[arg(long, value_enum, default_value = "portrait", env = "PDF_HALVES_SECOND_ORIENTATION")]
    second_orientation: OrientationArg,

    /// Output format.
    #[arg(long, value_enum, default_value = "pdf", env = "PDF_HALVES_FORMAT")]
    format: FormatArg,

    /// Directory the two files are written to (created if missing).
    #[arg(short, long, default_value = ".", env = "PDF_HALVES_OUT_DIR")]
    out_dir: PathBuf,

    /// File name for the combined top halves.
    #[arg(long)]
    top_name: Option<String>,

    /// File name for the combined bottom halves.
    #[arg(long)]
    bottom_name: Option<String>,

    /// Resolution for the composites and their metadata (72–1200).
    #[arg(long, env = "PDF_HALVES_EXPORT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    export_dpi: u32,

    /// Resolution for page previews (36–600).
    #[arg(long, env = "PDF_HALVES_PREVIEW_DPI", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    preview_dpi: u32,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Add `_1`, `_2`, … instead of overwriting existing files.
    #[arg(long, env = "PDF_HALVES_NO_CLOBBER")]
    no_clobber: bool,

    /// Print the written paths as JSON.
    #[arg(long, env = "PDF_HALVES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_HALVES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_HALVES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_HALVES_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Png,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Png => ExportFormat::Png,
        }
    }
}

/// `None` for the `blank` keyword, otherwise the path.
fn page_path(arg: &str) -> Option<PathBuf> {
    if arg.trim().eq_ignore_ascii_case("blank") {
        None
    } else {
        Some(PathBuf::from(arg))
    }
}

fn build_config(cli: &Cli) -> Result<CombinerConfig> {
    let mut builder = CombinerConfig::builder()
        .export_dpi(cli.export_dpi)
        .preview_dpi(cli.preview_dpi)
        .default_format(cli.format.into());
    if let Some(lib) = &cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    builder.build().context("Invalid configuration")
}

/// Wait for the running worker and turn a reported failure into an error.
async fn settle(session: &mut Session, callbacks: &CliCallbacks) -> Result<()> {
    session.run_until_idle(TICK).await;
    match callbacks.take_failure() {
        Some(msg) => bail!(msg),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let format = ExportFormat::from(cli.format);

    let callbacks = CliCallbacks::new(show_progress);
    let pipeline = DocumentPipeline::with_pdfium(config);
    let mut session = Session::new(pipeline, callbacks.clone(), Handle::current());

    let result = run(&cli, format, &mut session, &callbacks).await;
    callbacks.finish();
    let files = result?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&files).context("Failed to serialize result")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} {} {}",
            green("✔"),
            bold("top halves   →"),
            files.top.display()
        );
        eprintln!(
            "{} {} {}",
            green("✔"),
            bold("bottom halves →"),
            files.bottom.display()
        );
    }
    Ok(())
}

async fn run(
    cli: &Cli,
    format: ExportFormat,
    session: &mut Session,
    callbacks: &CliCallbacks,
) -> Result<pdf_halves::ExportedFiles> {
    // ── Load both pages ──────────────────────────────────────────────────
    for (slot, arg) in [(Slot::First, &cli.first), (Slot::Second, &cli.second)] {
        match page_path(arg) {
            None => session.load_blank(slot)?,
            Some(path) => {
                session.start_load(slot, &path);
                settle(session, callbacks)
                    .await
                    .with_context(|| format!("Could not load {slot} from {}", path.display()))?;
            }
        }
    }
    session.set_orientation(Slot::First, cli.first_orientation.into())?;
    session.set_orientation(Slot::Second, cli.second_orientation.into())?;

    // ── Combine ──────────────────────────────────────────────────────────
    if session.start_combine() {
        settle(session, callbacks).await.context("Combination failed")?;
    } else if let Some(msg) = callbacks.take_failure() {
        bail!(msg);
    }

    // ── Export ───────────────────────────────────────────────────────────
    session.select_export_format(format)?;
    let mut request = session
        .export_request()
        .context("Session is still busy")?
        .no_clobber(cli.no_clobber);
    if let Some(name) = &cli.top_name {
        request = request.top_filename(name.as_str());
    }
    if let Some(name) = &cli.bottom_name {
        request = request.bottom_filename(name.as_str());
    }
    let files = session
        .export(&request, &cli.out_dir)
        .with_context(|| format!("Failed to write into {}", cli.out_dir.display()))?;
    Ok(files)
}
