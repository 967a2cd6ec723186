use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct Bitmap {
    pub page_index: usize,
    pub dpi: f32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("page_index", &self.page_index)
            .field("dpi", &self.dpi)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, page_index: usize, dpi: f32, cancel: &CancellationToken) -> Result<Bitmap>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOutcome {
    Completed,
    Superseded,
    Failed,
}

struct Pending {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Runs rasterization off the input path, keeping only the newest request alive.
pub struct RasterCoordinator {
    rasterizer: Arc<dyn PageRasterizer>,
    runtime: Handle,
    pending: Arc<Mutex<Pending>>,
    latest: Arc<watch::Sender<Option<Arc<Bitmap>>>>,
}

impl RasterCoordinator {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, runtime: Handle) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            rasterizer,
            runtime,
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                token: None,
            })),
            latest: Arc::new(latest),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Bitmap>>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<Bitmap>> {
        self.latest.borrow().clone()
    }

    #[instrument(skip(self))]
    pub fn request(&self, page_index: usize, dpi: f32) -> JoinHandle<RasterOutcome> {
        let token = CancellationToken::new();
        let generation = {
            let mut pending = self.pending.lock();
            if let Some(previous) = pending.token.replace(token.clone()) {
                previous.cancel();
            }
            pending.generation += 1;
            pending.generation
        };

        let rasterizer = Arc::clone(&self.rasterizer);
        let pending = Arc::clone(&self.pending);
        let latest = Arc::clone(&self.latest);
        self.runtime.spawn_blocking(move || {
            if token.is_cancelled() {
                return RasterOutcome::Superseded;
            }
            let result = rasterizer.rasterize(page_index, dpi, &token);

            let mut pending = pending.lock();
            if pending.generation != generation || token.is_cancelled() {
                debug!(page = page_index, dpi, "raster result superseded");
                return RasterOutcome::Superseded;
            }
            pending.token = None;
            match result {
                Ok(bitmap) => {
                    debug!(page = page_index, dpi, width = bitmap.width, height = bitmap.height, "raster ready");
                    latest.send_replace(Some(Arc::new(bitmap)));
                    RasterOutcome::Completed
                }
                Err(err) => {
                    warn!(page = page_index, dpi, ?err, "rasterization failed");
                    RasterOutcome::Failed
                }
            }
        })
    }

    pub fn reset(&self) {
        let mut pending = self.pending.lock();
        if let Some(token) = pending.token.take() {
            token.cancel();
        }
        pending.generation += 1;
        self.latest.send_replace(None);
    }
}
