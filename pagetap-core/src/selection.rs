//! Long-press word selection with drag extension.
//!
//! The session is a plain state machine fed with [`PointerEvent`]s, so the whole
//! gesture can be replayed synchronously:
//!
//! * `Idle -> Probing` on the first pointer down (the page's text layout is leased here)
//! * `Probing -> Cancelled` when the pointer wanders past the touch slop or a second
//!   pointer lands before the long-press deadline
//! * `Probing -> Active` once the deadline passes with the pointer still held
//! * `Active -> Active` while dragging, `Active -> Idle` on release or a second pointer
//!
//! The lease is dropped on every path back to `Idle`/`Cancelled`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TouchConfig;
use crate::error::Result;
use crate::geometry::{PageFrame, ViewPoint};
use crate::highlight::{build_quads, HighlightQuad};
use crate::hit_test::HitTester;
use crate::input::{PointerEvent, PointerId};
use crate::layout::{Clipboard, TextLayoutLease, TextLayoutProvider};
use crate::transform::Transform;
use crate::word::{expand, CharacterRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Probing,
    Active(CharacterRange),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectionChange {
    Changed {
        range: CharacterRange,
        text: String,
    },
    Cleared,
}

/// The current selection: its range, highlight quads in bitmap space and text.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub range: CharacterRange,
    pub quads: Vec<HighlightQuad>,
    pub text: String,
}

enum Phase {
    Idle,
    Probing {
        pointer: PointerId,
        origin: ViewPoint,
        deadline: Duration,
        lease: TextLayoutLease,
    },
    Active {
        pointer: PointerId,
        anchor: CharacterRange,
        selection: Selection,
        lease: TextLayoutLease,
    },
    Cancelled,
}

pub struct SelectionSession {
    provider: Arc<dyn TextLayoutProvider>,
    page_index: usize,
    frame: PageFrame,
    hit_tester: HitTester,
    long_press: Duration,
    touch_slop: f32,
    pointers: Vec<PointerId>,
    phase: Phase,
}

impl SelectionSession {
    pub fn new(
        provider: Arc<dyn TextLayoutProvider>,
        page_index: usize,
        frame: PageFrame,
        config: &TouchConfig,
    ) -> Self {
        Self {
            provider,
            page_index,
            frame,
            hit_tester: HitTester::from_config(config),
            long_press: config.long_press,
            touch_slop: config.touch_slop,
            pointers: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn state(&self) -> SelectionState {
        match &self.phase {
            Phase::Idle => SelectionState::Idle,
            Phase::Probing { .. } => SelectionState::Probing,
            Phase::Active { selection, .. } => SelectionState::Active(selection.range),
            Phase::Cancelled => SelectionState::Cancelled,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.phase {
            Phase::Active { selection, .. } => Some(selection),
            _ => None,
        }
    }

    pub fn quads(&self) -> &[HighlightQuad] {
        self.selection().map(|s| s.quads.as_slice()).unwrap_or(&[])
    }

    pub fn has_highlight(&self) -> bool {
        !self.quads().is_empty()
    }

    pub fn long_press_deadline(&self) -> Option<Duration> {
        match &self.phase {
            Phase::Probing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Feeds one pointer event through the state machine.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        transform: &Transform,
        clipboard: &mut dyn Clipboard,
    ) -> Result<Vec<SelectionChange>> {
        let mut changes = Vec::new();
        changes.extend(self.fire_long_press_if_due(event.at(), transform, clipboard));

        match event {
            PointerEvent::Down { id, position, at } => {
                changes.extend(self.touch_down(id, position, at)?);
            }
            PointerEvent::Move { id, position, .. } => {
                changes.extend(self.touch_move(id, position, transform, clipboard));
            }
            PointerEvent::Up { id, .. } => {
                changes.extend(self.touch_up(id));
            }
            PointerEvent::Tick { .. } => {}
        }
        Ok(changes)
    }

    /// Drops any selection and releases the text layout. Pointers still down stay
    /// tracked, so a further finger joining them cannot start a new press.
    pub fn cancel(&mut self) -> Option<SelectionChange> {
        let change = self.to_idle();
        debug!(page = self.page_index, "selection cancelled externally");
        change
    }

    fn touch_down(
        &mut self,
        id: PointerId,
        position: ViewPoint,
        at: Duration,
    ) -> Result<Option<SelectionChange>> {
        let first = self.pointers.iter().all(|down| *down == id);
        if !self.pointers.contains(&id) {
            self.pointers.push(id);
        }

        if !first {
            return Ok(self.interrupt());
        }
        if !matches!(self.phase, Phase::Idle) {
            return Ok(None);
        }

        let lease = TextLayoutLease::acquire(Arc::clone(&self.provider), self.page_index)?;
        self.phase = Phase::Probing {
            pointer: id,
            origin: position,
            deadline: at + self.long_press,
            lease,
        };
        debug!(pointer = id, ?position, "selection probing");
        Ok(None)
    }

    fn touch_move(
        &mut self,
        id: PointerId,
        position: ViewPoint,
        transform: &Transform,
        clipboard: &mut dyn Clipboard,
    ) -> Option<SelectionChange> {
        let single = self.pointers.len() == 1;
        match &mut self.phase {
            Phase::Probing {
                pointer, origin, ..
            } if *pointer == id => {
                if position.distance_to(*origin) > self.touch_slop {
                    debug!(pointer = id, "touch moved before long-press, not a selection");
                    self.phase = Phase::Cancelled;
                }
                None
            }
            Phase::Active {
                pointer,
                anchor,
                selection,
                lease,
            } if *pointer == id && single => {
                let index = self
                    .hit_tester
                    .locate(position, transform, &self.frame, &**lease)?;
                if index >= lease.char_count() {
                    warn!(index, "text layout resolved an index past the page end");
                    return None;
                }
                let range = anchor.extended_to(index);
                if range == selection.range {
                    return None;
                }
                *selection = select(range, &self.frame, lease, clipboard);
                Some(SelectionChange::Changed {
                    range,
                    text: selection.text.clone(),
                })
            }
            _ => None,
        }
    }

    fn touch_up(&mut self, id: PointerId) -> Option<SelectionChange> {
        self.pointers.retain(|p| *p != id);
        match &self.phase {
            Phase::Probing { pointer, .. } | Phase::Active { pointer, .. } if *pointer == id => {
                self.to_idle()
            }
            Phase::Cancelled if self.pointers.is_empty() => {
                self.phase = Phase::Idle;
                None
            }
            _ => None,
        }
    }

    /// A second pointer landed: whatever was in flight gives way to pan/zoom.
    fn interrupt(&mut self) -> Option<SelectionChange> {
        match self.phase {
            Phase::Probing { .. } => {
                debug!("second pointer during long-press, cancelling");
                self.phase = Phase::Cancelled;
                None
            }
            Phase::Active { .. } => {
                debug!("second pointer during selection, clearing");
                self.to_idle()
            }
            Phase::Idle | Phase::Cancelled => None,
        }
    }

    fn fire_long_press_if_due(
        &mut self,
        now: Duration,
        transform: &Transform,
        clipboard: &mut dyn Clipboard,
    ) -> Option<SelectionChange> {
        let due = matches!(&self.phase, Phase::Probing { deadline, .. } if now >= *deadline);
        if !due {
            return None;
        }
        let Phase::Probing {
            pointer,
            origin,
            lease,
            ..
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return None;
        };

        let Some(index) = self
            .hit_tester
            .locate(origin, transform, &self.frame, &*lease)
        else {
            debug!(?origin, "long-press found no text");
            return None;
        };
        let anchor = match expand(index, &*lease) {
            Ok(range) => range,
            Err(err) => {
                warn!(%err, "long-press hit could not be expanded");
                return None;
            }
        };

        let selection = select(anchor, &self.frame, &lease, clipboard);
        debug!(first = anchor.first(), last = anchor.last(), text = %selection.text, "selection started");
        let change = SelectionChange::Changed {
            range: anchor,
            text: selection.text.clone(),
        };
        self.phase = Phase::Active {
            pointer,
            anchor,
            selection,
            lease,
        };
        Some(change)
    }

    fn to_idle(&mut self) -> Option<SelectionChange> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active { .. } => Some(SelectionChange::Cleared),
            _ => None,
        }
    }
}

fn select(
    range: CharacterRange,
    frame: &PageFrame,
    lease: &TextLayoutLease,
    clipboard: &mut dyn Clipboard,
) -> Selection {
    let quads = build_quads(range, frame, &**lease);
    let text = lease.extract_text(range.first(), range.len());
    if let Err(err) = clipboard.set_text(&text) {
        warn!(%err, "failed to copy selection to clipboard");
    }
    Selection { range, quads, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageGeometry, PagePoint, Vector};
    use crate::test_support::{FakeProvider, PageText, RecordingClipboard};

    const HOLD: Duration = Duration::from_millis(500);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn down(id: PointerId, x: f32, y: f32, at: u64) -> PointerEvent {
        PointerEvent::Down {
            id,
            position: ViewPoint::new(x, y),
            at: ms(at),
        }
    }

    fn moved(id: PointerId, x: f32, y: f32, at: u64) -> PointerEvent {
        PointerEvent::Move {
            id,
            position: ViewPoint::new(x, y),
            at: ms(at),
        }
    }

    fn up(id: PointerId, at: u64) -> PointerEvent {
        PointerEvent::Up { id, at: ms(at) }
    }

    fn tick(at: u64) -> PointerEvent {
        PointerEvent::Tick { at: ms(at) }
    }

    /// Maps page x (10pt pitch) to the glyph index, independent of y.
    fn column_hits(text: PageText) -> PageText {
        text.with_hit(|p: PagePoint| (p.x >= 0.0).then(|| (p.x / 10.0) as usize))
    }

    struct Harness {
        provider: Arc<FakeProvider>,
        session: SelectionSession,
        clipboard: RecordingClipboard,
        transform: Transform,
        frame: PageFrame,
    }

    impl Harness {
        fn new(text: PageText) -> Self {
            let provider = Arc::new(FakeProvider::new(text));
            let frame = PageFrame::new(PageGeometry::new(300.0, 200.0));
            let session = SelectionSession::new(
                provider.clone(),
                0,
                frame,
                &TouchConfig::default(),
            );
            Self {
                provider,
                session,
                clipboard: RecordingClipboard::default(),
                transform: Transform::IDENTITY,
                frame,
            }
        }

        fn feed(&mut self, event: PointerEvent) -> Vec<SelectionChange> {
            self.session
                .handle(event, &self.transform, &mut self.clipboard)
                .unwrap()
        }

        /// View x for the middle of glyph `index`.
        fn x_of(&self, index: usize) -> f32 {
            self.transform
                .page_to_view(PagePoint::new(10.0 * index as f32 + 4.0, 106.0), &self.frame)
                .x
        }

        fn pairs(&self) -> (usize, usize) {
            (self.provider.opened(), self.provider.closed())
        }
    }

    #[test]
    fn long_press_selects_word_and_copies_it() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        let x = h.x_of(8);
        assert!(h.feed(down(1, x, 50.0, 0)).is_empty());
        assert_eq!(h.session.state(), SelectionState::Probing);
        assert_eq!(h.session.long_press_deadline(), Some(HOLD));

        assert!(h.feed(tick(499)).is_empty());
        let changes = h.feed(tick(500));
        assert_eq!(
            changes,
            vec![SelectionChange::Changed {
                range: CharacterRange::spanning(7, 11),
                text: "world".into(),
            }]
        );
        assert_eq!(h.session.quads().len(), 5);
        assert_eq!(h.clipboard.copies(), vec!["world".to_string()]);

        assert_eq!(h.feed(up(1, 700)), vec![SelectionChange::Cleared]);
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert!(!h.session.has_highlight());
        assert_eq!(h.pairs(), (1, 1));
    }

    #[test]
    fn long_press_at_scale_two_selects_signal() {
        let line = format!("{} signal end", "a".repeat(39));
        let text = PageText::line(&line).with_hit(|p: PagePoint| {
            ((p.x - 37.5).abs() < 0.01 && (p.y - 162.5).abs() < 0.01).then_some(42)
        });
        let mut h = Harness::new(text);
        h.transform = Transform::new(2.0, Vector::ZERO).unwrap();

        h.feed(down(1, 100.0, 100.0, 0));
        let changes = h.feed(tick(500));
        assert_eq!(
            changes,
            vec![SelectionChange::Changed {
                range: CharacterRange::spanning(40, 45),
                text: "signal".into(),
            }]
        );
        let quads = h.session.quads();
        assert_eq!(quads.len(), 6);
        assert!(quads.windows(2).all(|w| w[0].left < w[1].left));
        assert_eq!(h.clipboard.copies(), vec!["signal".to_string()]);
    }

    #[test]
    fn drag_extends_around_anchor() {
        // "f" is a one-glyph word, so the anchor is a single character
        let mut h = Harness::new(column_hits(PageText::line("abcde f ghijklmnop")));
        let (x_f, x_h, x_d) = (h.x_of(6), h.x_of(9), h.x_of(3));

        h.feed(down(1, x_f, 50.0, 0));
        h.feed(tick(600));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::single(6)));

        h.feed(moved(1, x_h, 50.0, 650));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::spanning(6, 9)));
        assert_eq!(h.session.selection().unwrap().text, "f gh");
        h.feed(moved(1, x_d, 50.0, 700));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::spanning(3, 6)));
        assert_eq!(h.session.selection().unwrap().text, "de f");
    }

    #[test]
    fn anchor_policy_five_to_nine_to_three() {
        let text = column_hits(PageText::line("0123 5 789abc"));
        let mut h = Harness::new(text);
        let (x5, x9, x3) = (h.x_of(5), h.x_of(9), h.x_of(3));

        h.feed(down(1, x5, 50.0, 0));
        h.feed(tick(500));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::single(5)));
        h.feed(moved(1, x9, 50.0, 600));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::spanning(5, 9)));
        h.feed(moved(1, x3, 50.0, 700));
        assert_eq!(h.session.state(), SelectionState::Active(CharacterRange::spanning(3, 5)));
    }

    #[test]
    fn unchanged_range_does_not_re_extract() {
        let text = column_hits(PageText::line("Hello, world!"));
        let mut h = Harness::new(text);
        let x = h.x_of(8);
        h.feed(down(1, x, 50.0, 0));
        h.feed(tick(500));
        let calls = h.provider.text().extract_calls();

        // dragging within the anchored word keeps the range
        let within = h.x_of(10);
        assert!(h.feed(moved(1, within, 50.0, 600)).is_empty());
        assert_eq!(h.provider.text().extract_calls(), calls);
        assert_eq!(h.clipboard.copies().len(), 1);

        let past = h.x_of(12);
        assert_eq!(h.feed(moved(1, past, 50.0, 650)).len(), 1);
        assert_eq!(h.provider.text().extract_calls(), calls + 1);
    }

    #[test]
    fn movement_before_deadline_cancels_without_side_effects() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        h.feed(down(1, 40.0, 50.0, 0));
        h.feed(moved(1, 60.0, 50.0, 100));
        assert_eq!(h.session.state(), SelectionState::Cancelled);
        assert!(h.feed(tick(900)).is_empty());
        assert_eq!(h.session.state(), SelectionState::Cancelled);
        h.feed(up(1, 950));
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert!(h.clipboard.copies().is_empty());
        assert_eq!(h.pairs(), (1, 1));
    }

    #[test]
    fn jitter_within_slop_still_long_presses() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        let x = h.x_of(8);
        h.feed(down(1, x, 50.0, 0));
        h.feed(moved(1, x + 3.0, 52.0, 200));
        assert_eq!(h.session.state(), SelectionState::Probing);
        assert_eq!(h.feed(tick(500)).len(), 1);
    }

    #[test]
    fn second_pointer_cancels_probe_and_clears_selection() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        h.feed(down(1, h.x_of(1), 50.0, 0));
        h.feed(down(2, 200.0, 50.0, 100));
        assert_eq!(h.session.state(), SelectionState::Cancelled);
        h.feed(up(1, 200));
        assert_eq!(h.session.state(), SelectionState::Cancelled);
        h.feed(up(2, 210));
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (1, 1));

        h.feed(down(1, h.x_of(1), 50.0, 1000));
        h.feed(tick(1500));
        assert!(matches!(h.session.state(), SelectionState::Active(_)));
        assert_eq!(h.feed(down(2, 200.0, 50.0, 1600)), vec![SelectionChange::Cleared]);
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (2, 2));

        // no new probe while the other pointer is still down
        h.feed(up(1, 1700));
        h.feed(down(3, h.x_of(1), 50.0, 1800));
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (2, 2));
    }

    #[test]
    fn long_press_on_empty_space_returns_to_idle() {
        let mut h = Harness::new(PageText::line("abc").with_hit(|_| None));
        h.feed(down(1, 10.0, 10.0, 0));
        assert!(h.feed(tick(500)).is_empty());
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (1, 1));
        h.feed(up(1, 600));
        assert_eq!(h.pairs(), (1, 1));
    }

    #[test]
    fn late_release_selects_then_clears() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        h.feed(down(1, h.x_of(0), 50.0, 0));
        let changes = h.feed(up(1, 800));
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], SelectionChange::Changed { .. }));
        assert_eq!(changes[1], SelectionChange::Cleared);
        assert_eq!(h.pairs(), (1, 1));
    }

    #[test]
    fn failed_layout_acquisition_keeps_session_idle() {
        let mut h = Harness::new(column_hits(PageText::line("abc")));
        h.provider.fail_next_open();
        let err = h
            .session
            .handle(down(1, 5.0, 5.0, 0), &h.transform, &mut h.clipboard)
            .unwrap_err();
        assert!(matches!(err, crate::Error::ResourceAcquisition { .. }));
        assert_eq!(h.session.state(), SelectionState::Idle);
        h.feed(up(1, 10));

        h.feed(down(1, 5.0, 5.0, 20));
        assert_eq!(h.session.state(), SelectionState::Probing);
        assert_eq!(h.pairs(), (1, 0));
    }

    #[test]
    fn external_cancel_releases_layout_from_any_state() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        assert_eq!(h.session.cancel(), None);

        h.feed(down(1, h.x_of(1), 50.0, 0));
        assert_eq!(h.session.cancel(), None);
        assert_eq!(h.pairs(), (1, 1));
        h.feed(up(1, 50));

        h.feed(down(1, h.x_of(1), 50.0, 100));
        h.feed(tick(700));
        assert_eq!(h.session.cancel(), Some(SelectionChange::Cleared));
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (2, 2));
    }

    #[test]
    fn second_finger_after_cancel_does_not_start_a_press() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        h.feed(down(1, h.x_of(1), 50.0, 0));
        h.session.cancel();

        let x = h.x_of(8);
        assert!(h.feed(down(2, x, 50.0, 100)).is_empty());
        assert!(h.feed(tick(700)).is_empty());
        assert_eq!(h.session.state(), SelectionState::Idle);
        assert_eq!(h.pairs(), (1, 1));

        h.feed(up(1, 750));
        h.feed(up(2, 800));
        h.feed(down(2, x, 50.0, 900));
        assert_eq!(h.session.state(), SelectionState::Probing);
    }

    #[test]
    fn drag_hit_test_uses_current_transform() {
        let mut h = Harness::new(column_hits(PageText::line("Hello, world!")));
        h.transform = Transform::new(2.0, Vector::new(-40.0, 0.0)).unwrap();
        let x = h.x_of(8);
        h.feed(down(1, x, 50.0, 0));
        h.feed(tick(500));
        assert_eq!(
            h.session.state(),
            SelectionState::Active(CharacterRange::spanning(7, 11))
        );
    }
}
