use pagetap_core::{CharBox, PagePoint, TextLayout};

/// Distance in points around a glyph box that still resolves to that glyph.
pub const HIT_TOLERANCE_PT: f32 = 8.0;

/// Text of one page copied out of the document: characters with their boxes.
///
/// Copying makes the layout independent of the document handle, so it can live in a
/// selection session while the document keeps rendering on another thread.
#[derive(Debug, Clone, Default)]
pub struct TextSnapshot {
    page_index: usize,
    chars: Vec<char>,
    boxes: Vec<Option<CharBox>>,
}

impl TextSnapshot {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            ..Self::default()
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Appends one character; `bounds` is `None` for glyphs without geometry
    /// (generated spaces and line breaks).
    pub fn push(&mut self, ch: char, bounds: Option<CharBox>) {
        self.chars.push(ch);
        self.boxes.push(bounds);
    }

    fn nearest_within_tolerance(&self, point: PagePoint) -> Option<usize> {
        self.boxes
            .iter()
            .enumerate()
            .filter_map(|(index, b)| b.map(|b| (index, gap(&b, point))))
            .filter(|(_, (dx, dy))| *dx <= HIT_TOLERANCE_PT && *dy <= HIT_TOLERANCE_PT)
            .min_by(|(_, a), (_, b)| {
                let da = a.0 * a.0 + a.1 * a.1;
                let db = b.0 * b.0 + b.1 * b.1;
                da.total_cmp(&db)
            })
            .map(|(index, _)| index)
    }
}

/// Per-axis distance from `point` to the nearest edge of `b`, zero when inside.
fn gap(b: &CharBox, point: PagePoint) -> (f32, f32) {
    let dx = (b.left - point.x).max(point.x - b.right).max(0.0);
    let dy = (b.bottom - point.y).max(point.y - b.top).max(0.0);
    (dx, dy)
}

impl TextLayout for TextSnapshot {
    fn char_count(&self) -> usize {
        self.chars.len()
    }

    fn index_at(&self, point: PagePoint) -> Option<usize> {
        self.boxes
            .iter()
            .position(|b| b.map(|b| b.contains(point)).unwrap_or(false))
            .or_else(|| self.nearest_within_tolerance(point))
    }

    fn char_box(&self, index: usize) -> pagetap_core::Result<CharBox> {
        match self.boxes.get(index) {
            Some(Some(b)) => Ok(*b),
            Some(None) => Err(pagetap_core::Error::MalformedGeometry { index }),
            None => Err(pagetap_core::Error::InvalidIndex {
                index,
                total: self.chars.len(),
            }),
        }
    }

    fn extract_text(&self, first: usize, count: usize) -> String {
        self.chars.iter().skip(first).take(count).collect()
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }
}
