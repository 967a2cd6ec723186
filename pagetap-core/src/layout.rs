use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::geometry::{CharBox, PageGeometry, PagePoint};

pub trait TextLayout: Send {
    fn char_count(&self) -> usize;

    fn index_at(&self, point: PagePoint) -> Option<usize>;

    fn char_box(&self, index: usize) -> crate::Result<CharBox>;

    fn extract_text(&self, first: usize, count: usize) -> String;

    fn char_at(&self, index: usize) -> Option<char> {
        self.extract_text(index, 1).chars().next()
    }
}

pub trait TextLayoutProvider: Send + Sync {
    fn page_count(&self) -> usize;
    fn page_geometry(&self, page_index: usize) -> Result<PageGeometry>;
    fn open_text_layout(&self, page_index: usize) -> Result<Box<dyn TextLayout>>;
    fn close_text_layout(&self, layout: Box<dyn TextLayout>);
}

pub trait Clipboard: Send {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// A text layout checked out from its provider; closed exactly once when dropped.
pub struct TextLayoutLease {
    provider: Arc<dyn TextLayoutProvider>,
    page_index: usize,
    layout: Option<Box<dyn TextLayout>>,
}

impl TextLayoutLease {
    pub fn acquire(provider: Arc<dyn TextLayoutProvider>, page_index: usize) -> crate::Result<Self> {
        let layout = provider
            .open_text_layout(page_index)
            .map_err(|source| crate::Error::ResourceAcquisition {
                page: page_index,
                source,
            })?;
        debug!(page = page_index, chars = layout.char_count(), "text layout opened");
        Ok(Self {
            provider,
            page_index,
            layout: Some(layout),
        })
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }
}

impl Deref for TextLayoutLease {
    type Target = dyn TextLayout;

    fn deref(&self) -> &Self::Target {
        match self.layout.as_deref() {
            Some(layout) => layout,
            None => unreachable!("text layout is only taken in drop"),
        }
    }
}

impl Drop for TextLayoutLease {
    fn drop(&mut self) {
        if let Some(layout) = self.layout.take() {
            self.provider.close_text_layout(layout);
            debug!(page = self.page_index, "text layout closed");
        }
    }
}

impl fmt::Debug for TextLayoutLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLayoutLease")
            .field("page_index", &self.page_index)
            .finish_non_exhaustive()
    }
}
