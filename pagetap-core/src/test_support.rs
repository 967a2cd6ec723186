use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::geometry::{CharBox, PageGeometry, PagePoint};
use crate::layout::{Clipboard, TextLayout, TextLayoutProvider};

type HitFn = Arc<dyn Fn(PagePoint) -> Option<usize> + Send + Sync>;

/// In-memory page text: one line of 8pt-wide glyphs on a 10pt pitch at y 100..112.
#[derive(Clone)]
pub struct PageText {
    chars: Vec<char>,
    boxes: Vec<Option<CharBox>>,
    hit: Option<HitFn>,
    extract_calls: Arc<AtomicUsize>,
}

impl PageText {
    pub fn line(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let boxes = (0..chars.len())
            .map(|i| {
                let left = 10.0 * i as f32;
                Some(CharBox::new(left, 100.0, left + 8.0, 112.0))
            })
            .collect();
        Self {
            chars,
            boxes,
            hit: None,
            extract_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_hit(mut self, hit: impl Fn(PagePoint) -> Option<usize> + Send + Sync + 'static) -> Self {
        self.hit = Some(Arc::new(hit));
        self
    }

    pub fn with_malformed_box(mut self, index: usize) -> Self {
        self.boxes[index] = None;
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

impl TextLayout for PageText {
    fn char_count(&self) -> usize {
        self.chars.len()
    }

    fn index_at(&self, point: PagePoint) -> Option<usize> {
        if let Some(hit) = &self.hit {
            return hit(point);
        }
        self.boxes
            .iter()
            .position(|b| b.map(|b| b.contains(point)).unwrap_or(false))
    }

    fn char_box(&self, index: usize) -> crate::Result<CharBox> {
        match self.boxes.get(index) {
            Some(Some(b)) => Ok(*b),
            _ => CharBox::from_coords(index, &[]),
        }
    }

    fn extract_text(&self, first: usize, count: usize) -> String {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.chars.iter().skip(first).take(count).collect()
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }
}

pub struct FakeProvider {
    text: PageText,
    geometry: PageGeometry,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fail_next: AtomicBool,
}

impl FakeProvider {
    pub fn new(text: PageText) -> Self {
        Self::with_geometry(text, PageGeometry::new(300.0, 200.0))
    }

    pub fn with_geometry(text: PageText, geometry: PageGeometry) -> Self {
        Self {
            text,
            geometry,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn text(&self) -> &PageText {
        &self.text
    }
}

impl TextLayoutProvider for FakeProvider {
    fn page_count(&self) -> usize {
        2
    }

    fn page_geometry(&self, page_index: usize) -> Result<PageGeometry> {
        if page_index >= self.page_count() {
            return Err(anyhow!("page {} out of range", page_index));
        }
        Ok(self.geometry)
    }

    fn open_text_layout(&self, page_index: usize) -> Result<Box<dyn TextLayout>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("text page {} unavailable", page_index));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.text.clone()))
    }

    fn close_text_layout(&self, _layout: Box<dyn TextLayout>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct RecordingClipboard {
    copies: Arc<Mutex<Vec<String>>>,
}

impl RecordingClipboard {
    pub fn copies(&self) -> Vec<String> {
        self.copies.lock().clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.copies.lock().push(text.to_owned());
        Ok(())
    }
}
