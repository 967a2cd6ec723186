use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const BASE_DPI_SCALE: f32 = 96.0 / 72.0;

/// Point on the drawing surface, origin top-left, y down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

/// Point in the page raster laid out at the reference DPI, before pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BitmapPoint {
    pub x: f32,
    pub y: f32,
}

/// Point in the page's native unit system, origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl ViewPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: ViewPoint) -> f32 {
        (self - other).length()
    }
}

impl BitmapPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl PagePoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }
}

impl Sub for ViewPoint {
    type Output = Vector;

    fn sub(self, rhs: ViewPoint) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Vector> for ViewPoint {
    type Output = ViewPoint;

    fn add(self, rhs: Vector) -> ViewPoint {
        ViewPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageGeometry {
    pub const fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }
}

/// A page placed in bitmap space: its geometry plus the bitmap pixels per point.
///
/// Bitmap space is always the reference-DPI layout of the page. A sharper raster is
/// drawn into the same rectangle, so re-rasterizing never moves this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub geometry: PageGeometry,
    pub pixels_per_point: f32,
}

impl PageFrame {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pixels_per_point: BASE_DPI_SCALE,
        }
    }

    pub fn bitmap_size(&self) -> Size {
        Size::new(
            self.geometry.width_pt * self.pixels_per_point,
            self.geometry.height_pt * self.pixels_per_point,
        )
    }

    pub fn bitmap_to_page(&self, point: BitmapPoint) -> PagePoint {
        PagePoint::new(
            point.x / self.pixels_per_point,
            self.geometry.height_pt - point.y / self.pixels_per_point,
        )
    }

    pub fn page_to_bitmap(&self, point: PagePoint) -> BitmapPoint {
        BitmapPoint::new(
            point.x * self.pixels_per_point,
            (self.geometry.height_pt - point.y) * self.pixels_per_point,
        )
    }
}

/// Glyph bounds in document points (y up): `top >= bottom` for well-formed boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl CharBox {
    pub const fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    pub fn from_coords(index: usize, coords: &[f32]) -> Result<Self> {
        match coords {
            [left, bottom, right, top] if coords.iter().all(|v| v.is_finite()) => {
                Ok(Self::new(*left, *bottom, *right, *top))
            }
            _ => Err(Error::MalformedGeometry { index }),
        }
    }

    pub fn contains(&self, point: PagePoint) -> bool {
        point.x >= self.left.min(self.right)
            && point.x <= self.left.max(self.right)
            && point.y >= self.bottom.min(self.top)
            && point.y <= self.bottom.max(self.top)
    }

    pub fn center(&self) -> PagePoint {
        PagePoint::new(
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_box_rejects_wrong_arity_and_nan() {
        assert!(CharBox::from_coords(0, &[1.0, 2.0, 3.0]).is_err());
        assert!(CharBox::from_coords(0, &[1.0, 2.0, 3.0, 4.0, 5.0]).is_err());
        assert!(matches!(
            CharBox::from_coords(7, &[1.0, f32::NAN, 3.0, 4.0]),
            Err(Error::MalformedGeometry { index: 7 })
        ));
        let ok = CharBox::from_coords(0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(ok, CharBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn frame_flips_vertical_axis() {
        let frame = PageFrame::new(PageGeometry::new(100.0, 200.0));
        let top_left = frame.bitmap_to_page(BitmapPoint::new(0.0, 0.0));
        assert_eq!(top_left, PagePoint::new(0.0, 200.0));

        let back = frame.page_to_bitmap(PagePoint::new(30.0, 50.0));
        let again = frame.bitmap_to_page(back);
        assert!((again.x - 30.0).abs() < 1e-4);
        assert!((again.y - 50.0).abs() < 1e-4);
    }
}
