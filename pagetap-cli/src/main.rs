mod clipboard;
mod script;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use pagetap_core::{
    Clipboard, PageEvent, PageRasterizer, PageView, RasterCoordinator, RasterOutcome, Size,
    TextLayoutProvider, TouchConfig, Transform,
};
use pagetap_render::{save_bitmap, PdfiumDocument};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::clipboard::{LogClipboard, SystemClipboard};

#[derive(Debug, Parser)]
#[command(
    name = "pagetap",
    version,
    about = "Replay touch gestures against a PDF page"
)]
struct Args {
    /// PDF file to open
    file: PathBuf,

    /// JSON array of pointer events to replay
    #[arg(short = 's', long = "script")]
    script: PathBuf,

    /// Page to show (0-based)
    #[arg(short = 'p', long = "page", default_value_t = 0)]
    page: usize,

    /// View size in pixels, WIDTHxHEIGHT
    #[arg(long = "container", default_value = "1080x1920", value_parser = script::parse_container)]
    container: Size,

    /// Touch configuration (TOML); defaults to touch.toml in the config directory
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Copy selections to the system clipboard instead of only logging them
    #[arg(long = "copy")]
    copy: bool,

    /// Write the newest raster to this image file after the replay
    #[arg(long = "raster-out")]
    raster_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary<'a> {
    page_index: usize,
    transform: Transform,
    selection: Option<&'a str>,
    raster_dpi: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "pagetap", "pagetap")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("touch.toml"));
    let config = TouchConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config {:?}", config_path))?;
    let events = script::load(&args.script)?;

    let document = PdfiumDocument::open(&args.file)
        .with_context(|| format!("failed to open {:?}", args.file))?;
    let provider: Arc<dyn TextLayoutProvider> = document.clone();
    let rasterizer: Arc<dyn PageRasterizer> = document;
    let clipboard: Box<dyn Clipboard> = if args.copy {
        Box::new(SystemClipboard)
    } else {
        Box::new(LogClipboard::default())
    };

    let coordinator = RasterCoordinator::new(rasterizer, Handle::current());
    let base_dpi = config.base_dpi;
    let mut view = PageView::new(config, provider, clipboard)?;
    view.load_page(args.page, args.container)
        .with_context(|| format!("failed to load page {}", args.page))?;
    let mut raster = coordinator.request(args.page, base_dpi);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, &view, &coordinator, &mut raster, args.page)?;
    info!(events = events.len(), "replaying gesture script");
    for event in events {
        if let Err(err) = view.handle(event) {
            warn!(%err, ?event, "pointer event failed");
        }
        emit(&mut out, &view, &coordinator, &mut raster, args.page)?;
    }

    match raster.await.context("raster task panicked")? {
        RasterOutcome::Completed => {}
        outcome => warn!(?outcome, "final raster did not complete"),
    }
    let latest = coordinator.latest();
    if let (Some(path), Some(bitmap)) = (&args.raster_out, latest.as_deref()) {
        save_bitmap(bitmap, path)?;
        info!(path = %path.display(), dpi = bitmap.dpi, "raster written");
    }

    let summary = Summary {
        page_index: args.page,
        transform: view.transform(),
        selection: view.selection().map(|s| s.text.as_str()),
        raster_dpi: latest.map(|bitmap| bitmap.dpi),
    };
    writeln!(out, "{}", serde_json::json!({ "final": summary }))?;
    Ok(())
}

/// Prints pending page events as JSON lines and starts any raster they ask for.
fn emit(
    out: &mut impl Write,
    view: &PageView,
    coordinator: &RasterCoordinator,
    raster: &mut JoinHandle<RasterOutcome>,
    page_index: usize,
) -> Result<()> {
    for event in view.drain_events() {
        if let PageEvent::HighResolutionNeeded { dpi, .. } = event {
            *raster = coordinator.request(page_index, dpi);
        }
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;
    init_logging_in(&log_dir)
}

fn init_logging_in(log_dir: &Path) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(log_dir, "pagetap.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    // stdout carries the event stream, so console logs go to stderr
    let console_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
