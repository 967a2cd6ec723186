use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::geometry::ViewPoint;

pub type PointerId = u64;

/// Raw pointer input for one page view, timestamped relative to an arbitrary epoch.
///
/// `Tick` carries no pointer data; it lets a driver advance time so that a long-press
/// can fire while the finger stays perfectly still.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PointerEvent {
    Down {
        id: PointerId,
        position: ViewPoint,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        #[serde(rename = "at_ms")]
        at: Duration,
    },
    Move {
        id: PointerId,
        position: ViewPoint,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        #[serde(rename = "at_ms")]
        at: Duration,
    },
    Up {
        id: PointerId,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        #[serde(rename = "at_ms")]
        at: Duration,
    },
    Tick {
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        #[serde(rename = "at_ms")]
        at: Duration,
    },
}

impl PointerEvent {
    pub fn at(&self) -> Duration {
        match *self {
            PointerEvent::Down { at, .. }
            | PointerEvent::Move { at, .. }
            | PointerEvent::Up { at, .. }
            | PointerEvent::Tick { at } => at,
        }
    }

    pub fn pointer(&self) -> Option<PointerId> {
        match *self {
            PointerEvent::Down { id, .. }
            | PointerEvent::Move { id, .. }
            | PointerEvent::Up { id, .. } => Some(id),
            PointerEvent::Tick { .. } => None,
        }
    }
}
