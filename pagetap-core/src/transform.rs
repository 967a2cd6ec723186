use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::{BitmapPoint, PageFrame, PagePoint, Vector, ViewPoint, BASE_DPI_SCALE};

/// Mapping from bitmap space to view space: scale about the origin, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    scale: f32,
    offset: Vector,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        offset: Vector::ZERO,
    };

    pub fn new(scale: f32, offset: Vector) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::invariant(format!(
                "transform scale must be positive and finite, got {scale}"
            )));
        }
        if !(offset.x.is_finite() && offset.y.is_finite()) {
            return Err(Error::invariant(format!(
                "transform offset must be finite, got ({}, {})",
                offset.x, offset.y
            )));
        }
        Ok(Self { scale, offset })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Vector {
        self.offset
    }

    pub fn pixels_per_point(&self) -> f32 {
        BASE_DPI_SCALE * self.scale
    }

    pub fn forward(&self, point: BitmapPoint) -> ViewPoint {
        ViewPoint::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    pub fn inverse(&self, point: ViewPoint) -> BitmapPoint {
        debug_assert!(self.scale > 0.0);
        BitmapPoint::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    pub fn view_to_page(&self, point: ViewPoint, frame: &PageFrame) -> PagePoint {
        frame.bitmap_to_page(self.inverse(point))
    }

    pub fn page_to_view(&self, point: PagePoint, frame: &PageFrame) -> ViewPoint {
        self.forward(frame.page_to_bitmap(point))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
