use serde::Serialize;
use tracing::debug;

use crate::geometry::{BitmapPoint, PageFrame};
use crate::layout::TextLayout;
use crate::transform::Transform;
use crate::word::CharacterRange;

/// Highlight rectangle for one glyph.
///
/// Quads live in bitmap space (top-left origin, reference-DPI pixels). The drawing code
/// applies the current [`Transform`] once, via [`HighlightQuad::to_view`], so a quad
/// stays glued to its glyph while the page is panned or zoomed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighlightQuad {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl HighlightQuad {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn to_view(&self, transform: &Transform) -> HighlightQuad {
        let top_left = transform.forward(BitmapPoint::new(self.left, self.top));
        let bottom_right = transform.forward(BitmapPoint::new(self.right, self.bottom));
        HighlightQuad {
            left: top_left.x,
            top: top_left.y,
            right: bottom_right.x,
            bottom: bottom_right.y,
        }
    }
}

pub fn build_quads(
    range: CharacterRange,
    frame: &PageFrame,
    layout: &dyn TextLayout,
) -> Vec<HighlightQuad> {
    let ppp = frame.pixels_per_point;
    let height = frame.geometry.height_pt;
    let mut quads = Vec::with_capacity(range.len());
    for index in range.indices() {
        match layout.char_box(index) {
            Ok(b) => quads.push(HighlightQuad {
                left: b.left * ppp,
                top: (height - b.top) * ppp,
                right: b.right * ppp,
                bottom: (height - b.bottom) * ppp,
            }),
            Err(err) => debug!(index, %err, "skipping glyph without usable box"),
        }
    }
    quads
}
