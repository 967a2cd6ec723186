use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::TouchConfig;
use crate::error::{Error, Result};
use crate::geometry::{PageFrame, Size, Vector, ViewPoint};
use crate::highlight::HighlightQuad;
use crate::input::PointerEvent;
use crate::layout::{Clipboard, TextLayoutProvider};
use crate::selection::{Selection, SelectionChange, SelectionSession, SelectionState};
use crate::transform::Transform;
use crate::viewport::{GestureDelta, PointerTracker, ViewportController};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    PageLoaded { page_index: usize, transform: Transform },
    TransformChanged { transform: Transform },
    HighResolutionNeeded { scale: f32, dpi: f32 },
    SelectionChanged { text: String },
    SelectionCleared,
}

struct LoadedPage {
    index: usize,
    frame: PageFrame,
    session: SelectionSession,
}

/// Pan and pinch are suppressed while a selection is probing or highlighted, so the
/// transform never moves underneath a held selection.
pub struct PageView {
    config: TouchConfig,
    provider: Arc<dyn TextLayoutProvider>,
    clipboard: Box<dyn Clipboard>,
    viewport: ViewportController,
    pointers: PointerTracker,
    press_origin: Option<ViewPoint>,
    page: Option<LoadedPage>,
    requested_dpi: Option<f32>,
    events: Arc<Mutex<Vec<PageEvent>>>,
}

impl PageView {
    pub fn new(
        config: TouchConfig,
        provider: Arc<dyn TextLayoutProvider>,
        clipboard: Box<dyn Clipboard>,
    ) -> Result<Self> {
        let viewport = ViewportController::new(&config)?;
        Ok(Self {
            config,
            provider,
            clipboard,
            viewport,
            pointers: PointerTracker::new(),
            press_origin: None,
            page: None,
            requested_dpi: None,
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn events(&self) -> Arc<Mutex<Vec<PageEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn drain_events(&self) -> Vec<PageEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn page_index(&self) -> Option<usize> {
        self.page.as_ref().map(|page| page.index)
    }

    pub fn frame(&self) -> Option<PageFrame> {
        self.page.as_ref().map(|page| page.frame)
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn selection_state(&self) -> SelectionState {
        self.page
            .as_ref()
            .map(|page| page.session.state())
            .unwrap_or(SelectionState::Idle)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.page.as_ref().and_then(|page| page.session.selection())
    }

    pub fn highlight_in_view(&self) -> Vec<HighlightQuad> {
        let transform = self.transform();
        self.selection()
            .map(|s| s.quads.iter().map(|q| q.to_view(&transform)).collect())
            .unwrap_or_default()
    }

    #[instrument(skip(self))]
    pub fn load_page(&mut self, page_index: usize, container: Size) -> Result<()> {
        self.close_page();

        let geometry = self
            .provider
            .page_geometry(page_index)
            .map_err(|source| Error::ResourceAcquisition {
                page: page_index,
                source,
            })?;
        let frame = PageFrame::new(geometry);
        let transform = self.viewport.fit_to_container(container, frame.bitmap_size());
        let session = SelectionSession::new(Arc::clone(&self.provider), page_index, frame, &self.config);
        self.page = Some(LoadedPage {
            index: page_index,
            frame,
            session,
        });
        info!(page = page_index, ?geometry, scale = transform.scale(), "page loaded");
        self.push(PageEvent::PageLoaded {
            page_index,
            transform,
        });
        Ok(())
    }

    pub fn close_page(&mut self) {
        if let Some(mut page) = self.page.take() {
            if let Some(change) = page.session.cancel() {
                self.publish(change);
            }
            debug!(page = page.index, "page closed");
        }
        self.pointers.clear();
        self.press_origin = None;
        self.requested_dpi = None;
    }

    /// A failure to lease the text layout is returned after the event has otherwise
    /// been applied; the selection stays idle.
    pub fn handle(&mut self, event: PointerEvent) -> Result<()> {
        let Some(page) = self.page.as_mut() else {
            return Ok(());
        };
        let transform = self.viewport.transform();
        let state_before = page.session.state();
        let outcome = page
            .session
            .handle(event, &transform, self.clipboard.as_mut());
        let state = page.session.state();
        let gestures_allowed = matches!(state, SelectionState::Idle | SelectionState::Cancelled)
            && !page.session.has_highlight();
        let slop_exceeded =
            state_before == SelectionState::Probing && state == SelectionState::Cancelled;

        let delta = match event {
            PointerEvent::Down { id, position, .. } => {
                self.pointers.down(id, position);
                self.press_origin = (state == SelectionState::Probing).then_some(position);
                None
            }
            PointerEvent::Move { id, position, .. } => {
                let delta = self.pointers.moved(id, position);
                let origin = self
                    .press_origin
                    .filter(|_| slop_exceeded && self.pointers.count() == 1);
                if state != SelectionState::Probing {
                    self.press_origin = None;
                }
                // a press that just turned into a drag pans by its whole travel, slop included
                match origin {
                    Some(origin) => delta.map(|delta| GestureDelta {
                        pan: position - origin,
                        ..delta
                    }),
                    None => delta,
                }
            }
            PointerEvent::Up { id, .. } => {
                self.pointers.up(id);
                None
            }
            PointerEvent::Tick { .. } => None,
        };

        let changes = match outcome {
            Ok(changes) => changes,
            Err(err) => {
                warn!(%err, "selection could not start");
                if let Some(delta) = delta.filter(|_| gestures_allowed) {
                    self.apply_gesture(delta.zoom, delta.pan);
                }
                return Err(err);
            }
        };
        for change in changes {
            self.publish(change);
        }
        if let Some(delta) = delta.filter(|_| gestures_allowed) {
            self.apply_gesture(delta.zoom, delta.pan);
        }
        Ok(())
    }

    pub fn cancel_selection(&mut self) {
        let change = self.page.as_mut().and_then(|page| page.session.cancel());
        if let Some(change) = change {
            self.publish(change);
        }
    }

    fn apply_gesture(&mut self, zoom: f32, pan: Vector) {
        let before = self.viewport.transform();
        let after = self.viewport.apply_gesture(zoom, pan);
        if after == before {
            return;
        }
        self.push(PageEvent::TransformChanged { transform: after });

        let scale = after.scale();
        if self.viewport.needs_higher_resolution(scale) {
            let dpi = self.viewport.raster_dpi(scale);
            if self.requested_dpi != Some(dpi) {
                self.requested_dpi = Some(dpi);
                debug!(scale, dpi, "higher resolution raster needed");
                self.push(PageEvent::HighResolutionNeeded { scale, dpi });
            }
        }
    }

    fn publish(&self, change: SelectionChange) {
        let event = match change {
            SelectionChange::Changed { text, .. } => PageEvent::SelectionChanged { text },
            SelectionChange::Cleared => PageEvent::SelectionCleared,
        };
        self.push(event);
    }

    fn push(&self, event: PageEvent) {
        self.events.lock().push(event);
    }
}

impl Drop for PageView {
    fn drop(&mut self) {
        self.close_page();
    }
}
