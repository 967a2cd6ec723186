use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use pagetap_core::{
    Bitmap, CancellationToken, CharBox, PageGeometry, PageRasterizer, TextLayout,
    TextLayoutProvider,
};
use tracing::{debug, instrument, warn};

use crate::text::TextSnapshot;

/// Environment variable naming a pdfium shared library to bind before the defaults.
pub const PDFIUM_LIBRARY_ENV: &str = "PAGETAP_PDFIUM_LIBRARY_PATH";

/// An open PDF serving page geometry, text layouts and rasters.
pub struct PdfiumDocument {
    path: PathBuf,
    page_count: usize,
    open_layouts: AtomicUsize,
    document: Mutex<Option<PdfDocument<'static>>>,
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    pub fn open(path: &Path) -> Result<Arc<Self>> {
        let pdfium = Arc::new(bind_pdfium()?);
        Self::open_with(pdfium, path)
    }

    pub fn open_with(pdfium: Arc<Pdfium>, path: &Path) -> Result<Arc<Self>> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let document = Self {
            path,
            page_count: 0,
            open_layouts: AtomicUsize::new(0),
            document: Mutex::new(None),
            pdfium,
        };
        let page_count = document.with_document(|doc| {
            Ok(usize::try_from(doc.pages().len()).unwrap_or_default())
        })?;
        debug!(path = %document.path.display(), page_count, "document opened");
        Ok(Arc::new(Self {
            page_count,
            ..document
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PdfDocument<'static>> {
        let document = self
            .pdfium
            .load_pdf_from_file(&self.path, None)
            .with_context(|| format!("failed to open {:?}", self.path))?;
        // SAFETY: the document borrows the bindings held by self.pdfium. It is stored in
        // self.document, which is declared before pdfium and therefore dropped first.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Ok(document)
    }

    fn with_document<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PdfDocument<'static>) -> Result<R>,
    {
        let mut guard = self.document.lock();
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        let Some(document) = guard.as_ref() else {
            bail!("document {:?} is not loaded", self.path);
        };
        f(document)
    }

    fn with_page<R, F>(&self, page_index: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        self.with_document(|document| {
            let index: PdfPageIndex = page_index
                .try_into()
                .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
            let page = document
                .pages()
                .get(index)
                .with_context(|| format!("page {} out of range", page_index))?;
            f(&page)
        })
    }
}

impl TextLayoutProvider for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_geometry(&self, page_index: usize) -> Result<PageGeometry> {
        self.with_page(page_index, |page| {
            let (width, height) = (page.width().value, page.height().value);
            if !(width > 0.0 && height > 0.0) {
                bail!("page {} has degenerate size {}x{}", page_index, width, height);
            }
            Ok(PageGeometry::new(width, height))
        })
    }

    #[instrument(skip(self))]
    fn open_text_layout(&self, page_index: usize) -> Result<Box<dyn TextLayout>> {
        let snapshot = self.with_page(page_index, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to load text for page {}", page_index))?;
            let mut snapshot = TextSnapshot::new(page_index);
            for (index, ch) in text.chars().iter().enumerate() {
                let Some(unicode) = ch.unicode_char() else {
                    snapshot.push(char::REPLACEMENT_CHARACTER, None);
                    continue;
                };
                let bounds = ch.tight_bounds().ok().and_then(|rect| {
                    let coords = [
                        rect.left().value,
                        rect.bottom().value,
                        rect.right().value,
                        rect.top().value,
                    ];
                    CharBox::from_coords(index, &coords).ok()
                });
                snapshot.push(unicode, bounds);
            }
            Ok(snapshot)
        })?;
        let open = self.open_layouts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(page = page_index, chars = snapshot.char_count(), open, "text layout ready");
        Ok(Box::new(snapshot))
    }

    fn close_text_layout(&self, layout: Box<dyn TextLayout>) {
        drop(layout);
        let open = self
            .open_layouts
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        debug!(open, "text layout released");
    }
}

impl PageRasterizer for PdfiumDocument {
    #[instrument(skip(self, cancel))]
    fn rasterize(&self, page_index: usize, dpi: f32, cancel: &CancellationToken) -> Result<Bitmap> {
        if cancel.is_cancelled() {
            bail!("raster of page {} cancelled before start", page_index);
        }
        self.with_page(page_index, |page| {
            let config = PdfRenderConfig::new().scale_page_by_factor((dpi / 72.0).max(0.1));
            let rendered = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", page_index))?;
            if cancel.is_cancelled() {
                bail!("raster of page {} cancelled", page_index);
            }
            let image = rendered.as_image().to_rgba8();
            let (width, height) = image.dimensions();
            Ok(Bitmap {
                page_index,
                dpi,
                width,
                height,
                pixels: image.into_raw(),
            })
        })
    }
}

/// Binds pdfium from [`PDFIUM_LIBRARY_ENV`], then the working directory, then the system.
pub fn bind_pdfium() -> Result<Pdfium> {
    let mut errors = Vec::new();

    if let Ok(path) = std::env::var(PDFIUM_LIBRARY_ENV) {
        if !path.is_empty() {
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => return Ok(Pdfium::new(bindings)),
                Err(err) => {
                    warn!("failed to load pdfium from {}={}: {}", PDFIUM_LIBRARY_ENV, path, err);
                    errors.push(format!("{path}: {err}"));
                }
            }
        }
    }

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                PDFIUM_LIBRARY_ENV,
                errors.join(", ")
            ))
        }
    }
}
