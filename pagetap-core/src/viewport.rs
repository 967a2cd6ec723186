use tracing::{debug, warn};

use crate::config::TouchConfig;
use crate::error::Result;
use crate::geometry::{Size, Vector, ViewPoint};
use crate::input::PointerId;
use crate::transform::Transform;

pub fn fit_scale(container: Size, content: Size, margin: f32) -> f32 {
    if container.is_empty() || content.is_empty() {
        return margin;
    }
    let fit = (container.width / content.width).min(container.height / content.height);
    fit.min(1.0) * margin
}

/// `pan` is measured from the position that centres the scaled content in the
/// container; the emitted [`Transform`] folds that centring back into its offset.
#[derive(Debug, Clone)]
pub struct ViewportController {
    min_scale: f32,
    max_scale: f32,
    fit_margin: f32,
    high_res_threshold: f32,
    base_dpi: f32,
    max_dpi: f32,
    container: Size,
    content: Size,
    scale: f32,
    pan: Vector,
}

impl ViewportController {
    pub fn new(config: &TouchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            fit_margin: config.fit_margin,
            high_res_threshold: config.high_res_threshold,
            base_dpi: config.base_dpi,
            max_dpi: config.max_dpi,
            container: Size::default(),
            content: Size::default(),
            scale: 1.0,
            pan: Vector::ZERO,
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Vector {
        self.pan
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn content(&self) -> Size {
        self.content
    }

    pub fn fit_to_container(&mut self, container: Size, content: Size) -> Transform {
        self.container = container;
        self.content = content;
        self.scale = fit_scale(container, content, self.fit_margin);
        self.pan = Vector::ZERO;
        debug!(scale = self.scale, ?container, ?content, "fit page to container");
        self.transform()
    }

    pub fn apply_gesture(&mut self, zoom_factor: f32, pan_delta: Vector) -> Transform {
        let zoom_factor = if zoom_factor.is_finite() && zoom_factor > 0.0 {
            zoom_factor
        } else {
            warn!(zoom_factor, "ignoring unusable zoom factor");
            1.0
        };
        let pan_delta = if pan_delta.x.is_finite() && pan_delta.y.is_finite() {
            pan_delta
        } else {
            warn!(?pan_delta, "ignoring unusable pan delta");
            Vector::ZERO
        };

        let scale = (self.scale * zoom_factor).clamp(self.min_scale, self.max_scale);
        let bound = self.pan_bound(scale);
        self.scale = scale;
        self.pan = Vector::new(
            (self.pan.x + pan_delta.x).clamp(-bound.x, bound.x),
            (self.pan.y + pan_delta.y).clamp(-bound.y, bound.y),
        );
        self.transform()
    }

    pub fn pan_bound(&self, scale: f32) -> Vector {
        Vector::new(
            ((self.content.width * scale - self.container.width) / 2.0).max(0.0),
            ((self.content.height * scale - self.container.height) / 2.0).max(0.0),
        )
    }

    pub fn transform(&self) -> Transform {
        let centering = Vector::new(
            (self.container.width - self.content.width * self.scale) / 2.0,
            (self.container.height - self.content.height * self.scale) / 2.0,
        );
        Transform::new(self.scale, centering + self.pan).unwrap_or_else(|err| {
            // scale is clamped into validated limits on every path
            warn!(%err, "viewport produced an invalid transform");
            Transform::IDENTITY
        })
    }

    pub fn needs_higher_resolution(&self, scale: f32) -> bool {
        scale > self.high_res_threshold
    }

    pub fn raster_dpi(&self, scale: f32) -> f32 {
        (self.base_dpi * scale).clamp(self.base_dpi, self.max_dpi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDelta {
    pub zoom: f32,
    pub pan: Vector,
}

/// The first two pointers drive a pinch; any further pointers are ignored.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pointers: Vec<(PointerId, ViewPoint)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn position(&self, id: PointerId) -> Option<ViewPoint> {
        self.pointers
            .iter()
            .find(|(pointer, _)| *pointer == id)
            .map(|(_, position)| *position)
    }

    pub fn down(&mut self, id: PointerId, position: ViewPoint) {
        match self.pointers.iter_mut().find(|(pointer, _)| *pointer == id) {
            Some(entry) => entry.1 = position,
            None => self.pointers.push((id, position)),
        }
    }

    pub fn up(&mut self, id: PointerId) {
        self.pointers.retain(|(pointer, _)| *pointer != id);
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
    }

    pub fn moved(&mut self, id: PointerId, position: ViewPoint) -> Option<GestureDelta> {
        let slot = self.pointers.iter().position(|(pointer, _)| *pointer == id)?;
        let before = self.span();
        self.pointers[slot].1 = position;
        if slot > 1 {
            return None;
        }
        let after = self.span();

        match (before, after) {
            (Span::Single(from), Span::Single(to)) => Some(GestureDelta {
                zoom: 1.0,
                pan: to - from,
            }),
            (
                Span::Pair {
                    centroid: from,
                    distance: d0,
                },
                Span::Pair {
                    centroid: to,
                    distance: d1,
                },
            ) => {
                let zoom = if d0 > f32::EPSILON { d1 / d0 } else { 1.0 };
                Some(GestureDelta {
                    zoom,
                    pan: to - from,
                })
            }
            _ => None,
        }
    }

    fn span(&self) -> Span {
        match self.pointers.as_slice() {
            [] => Span::None,
            [(_, only)] => Span::Single(*only),
            [(_, a), (_, b), ..] => Span::Pair {
                centroid: ViewPoint::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
                distance: a.distance_to(*b),
            },
        }
    }
}

enum Span {
    None,
    Single(ViewPoint),
    Pair { centroid: ViewPoint, distance: f32 },
}
