//! Touch interaction for a rendered document page: pan/zoom, long-press word
//! selection and highlight geometry, independent of any particular PDF engine.

pub mod config;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod input;
pub mod layout;
pub mod page_view;
pub mod raster;
pub mod selection;
pub mod transform;
pub mod viewport;
pub mod word;

#[cfg(test)]
mod test_support;

pub use config::TouchConfig;
pub use error::{Error, Result};
pub use geometry::{
    BitmapPoint, CharBox, PageFrame, PageGeometry, PagePoint, Size, Vector, ViewPoint,
    BASE_DPI_SCALE,
};
pub use highlight::HighlightQuad;
pub use hit_test::HitTester;
pub use input::{PointerEvent, PointerId};
pub use layout::{Clipboard, TextLayout, TextLayoutLease, TextLayoutProvider};
pub use page_view::{PageEvent, PageView};
pub use raster::{Bitmap, CancellationToken, PageRasterizer, RasterCoordinator, RasterOutcome};
pub use selection::{Selection, SelectionChange, SelectionSession, SelectionState};
pub use transform::Transform;
pub use viewport::{PointerTracker, ViewportController};
pub use word::CharacterRange;
