//! Panel placement and drag offset
//!
//! The panel sits in the bottom-right corner of the viewport, shifted by the
//! user's drag offset. Rendering is left to the host; this module only
//! produces the numbers.

use std::cell::Cell;
use std::rc::Rc;

use dom::utils::px;
use serde::{Deserialize, Serialize};
use stream::{from_event, Disposers, EventTarget, Stream};
use tracing::trace;

use crate::content::Content;
use crate::host::{HostEvent, PointerEvent, POINTER_DOWN, POINTER_MOVE, POINTER_UP};
use crate::scroll::FrameSlot;

/// Distance from the viewport's right and bottom edges
pub const PANEL_GAP: f64 = 30.0;
pub const PANEL_MIN_WIDTH: f64 = 250.0;
/// Space kept free below the visible top
const PANEL_MARGIN: f64 = 50.0;
/// More top-level headings than this and the panel switches to a compact list
pub const LENGTHY_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStyle {
    pub right: f64,
    pub bottom: f64,
    pub max_height: f64,
    pub lengthy: bool,
}

impl PanelStyle {
    pub fn compute(
        content: &Content,
        offset: Offset,
        topbar_height: f64,
        viewport_height: f64,
    ) -> Self {
        let scroller_top = if content.scroller.is_document {
            0.0
        } else {
            content.scroller.rect.top()
        };
        let top_level = content.headings.iter().filter(|h| h.level <= 2).count();

        Self {
            right: PANEL_GAP - offset.x,
            bottom: PANEL_GAP - offset.y,
            max_height: (viewport_height - scroller_top.max(topbar_height) - PANEL_MARGIN).max(0.0),
            lengthy: top_level > LENGTHY_THRESHOLD,
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "right: {}; bottom: {}; max-height: {};",
            px(self.right),
            px(self.bottom),
            px(self.max_height)
        )
    }
}

/// Where a drag started, in pointer and offset space
#[derive(Clone, Copy)]
struct DragStart {
    pointer: PointerEvent,
    offset: Offset,
}

/// Feed handle drags into `offset`
///
/// Pointer moves are coalesced into one animation frame each; only the
/// latest position in a frame is written. Nothing is dragged while
/// `enabled` is false.
pub fn wire_drag(
    events: &EventTarget<HostEvent>,
    offset: &Stream<Offset>,
    enabled: &Stream<bool>,
    slot: FrameSlot,
) -> Disposers {
    let disposers = Disposers::new();
    let drag: Rc<Cell<Option<DragStart>>> = Rc::new(Cell::new(None));

    let (down, dispose) = from_event(events, POINTER_DOWN);
    disposers.add(dispose);
    let (moves, dispose) = from_event(events, POINTER_MOVE);
    disposers.add(dispose);
    let (up, dispose) = from_event(events, POINTER_UP);
    disposers.add(dispose);

    let state = Rc::clone(&drag);
    let current = offset.clone();
    let shown = enabled.downgrade();
    down.listen(move |event| {
        if shown.get() != Some(true) {
            return;
        }
        if let Some(pointer) = event.pointer().filter(|p| p.button == 0 && p.on_handle) {
            let offset = current.get().unwrap_or_default();
            state.set(Some(DragStart { pointer, offset }));
        }
    });

    let state = Rc::clone(&drag);
    let target = offset.clone();
    let frames = slot.clone();
    let shown = enabled.downgrade();
    moves.listen(move |event| {
        let (Some(start), Some(pointer)) = (state.get(), event.pointer()) else {
            return;
        };
        if shown.get() != Some(true) {
            state.set(None);
            return;
        }
        let next = Offset::new(
            start.offset.x + pointer.x - start.pointer.x,
            start.offset.y + pointer.y - start.pointer.y,
        );
        let target = target.clone();
        frames.request(move |_| {
            trace!(x = next.x, y = next.y, "drag");
            target.set(next);
        });
    });

    let state = Rc::clone(&drag);
    up.listen(move |_| state.set(None));

    disposers.add(Box::new(move || {
        drag.set(None);
        slot.cancel();
    }));
    disposers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::build_content;
    use crate::testing::{article_page, PageIds};
    use std::time::Duration;
    use stream::ManualScheduler;

    #[test]
    fn test_panel_style_default_corner() {
        let (mut arena, PageIds { body, article, .. }) = article_page(&[100.0, 500.0]);
        let content = build_content(&mut arena, article, body);

        let style = PanelStyle::compute(&content, Offset::default(), 0.0, 800.0);
        assert_eq!(style.right, 30.0);
        assert_eq!(style.bottom, 30.0);
        assert_eq!(style.max_height, 750.0);
        assert!(!style.lengthy);
        assert_eq!(style.to_css(), "right: 30px; bottom: 30px; max-height: 750px;");
    }

    #[test]
    fn test_panel_style_offset_and_topbar() {
        let (mut arena, PageIds { body, article, .. }) = article_page(&[100.0, 500.0]);
        let content = build_content(&mut arena, article, body);

        let style = PanelStyle::compute(&content, Offset::new(-100.0, -20.0), 56.0, 800.0);
        assert_eq!(style.right, 130.0);
        assert_eq!(style.bottom, 50.0);
        assert_eq!(style.max_height, 694.0);

        let tiny = PanelStyle::compute(&content, Offset::default(), 56.0, 80.0);
        assert_eq!(tiny.max_height, 0.0);
    }

    #[test]
    fn test_lengthy_panel() {
        let offsets: Vec<f64> = (0..51).map(|i| 100.0 + i as f64 * 60.0).collect();
        let (mut arena, PageIds { body, article, .. }) = article_page(&offsets);
        let content = build_content(&mut arena, article, body);
        assert!(PanelStyle::compute(&content, Offset::default(), 0.0, 800.0).lengthy);
    }

    #[test]
    fn test_drag_updates_offset_once_per_frame() {
        let scheduler = ManualScheduler::new();
        let events = EventTarget::new();
        let offset = Stream::with_value(Offset::new(10.0, 0.0));
        let writes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&writes);
        offset.listen(move |_| counter.set(counter.get() + 1));

        let shown = Stream::with_value(true);
        let disposers = wire_drag(&events, &offset, &shown, FrameSlot::new(scheduler.handle()));
        let dispatch = |event: HostEvent| events.dispatch(event.kind(), &event);

        dispatch(HostEvent::PointerDown(PointerEvent::at(500.0, 500.0).on_handle()));
        dispatch(HostEvent::PointerMove(PointerEvent::at(480.0, 490.0)));
        dispatch(HostEvent::PointerMove(PointerEvent::at(450.0, 470.0)));
        scheduler.advance(Duration::from_millis(16));
        assert_eq!(offset.get(), Some(Offset::new(-40.0, -30.0)));
        assert_eq!(writes.get(), 1);

        dispatch(HostEvent::PointerUp(PointerEvent::at(450.0, 470.0)));
        dispatch(HostEvent::PointerMove(PointerEvent::at(0.0, 0.0)));
        scheduler.advance(Duration::from_millis(32));
        assert_eq!(offset.get(), Some(Offset::new(-40.0, -30.0)));

        disposers.dispose_all();
        assert_eq!(events.listener_count(POINTER_MOVE), 0);
    }

    #[test]
    fn test_drag_requires_primary_button_on_handle() {
        let scheduler = ManualScheduler::new();
        let events = EventTarget::new();
        let offset = Stream::with_value(Offset::default());
        let shown = Stream::with_value(true);
        let _disposers = wire_drag(&events, &offset, &shown, FrameSlot::new(scheduler.handle()));
        let dispatch = |event: HostEvent| events.dispatch(event.kind(), &event);

        dispatch(HostEvent::PointerDown(PointerEvent::at(500.0, 500.0)));
        dispatch(HostEvent::PointerMove(PointerEvent::at(400.0, 400.0)));

        let mut secondary = PointerEvent::at(500.0, 500.0).on_handle();
        secondary.button = 2;
        dispatch(HostEvent::PointerDown(secondary));
        dispatch(HostEvent::PointerMove(PointerEvent::at(400.0, 400.0)));

        scheduler.advance(Duration::from_millis(50));
        assert_eq!(offset.get(), Some(Offset::default()));
    }

    #[test]
    fn test_no_drag_while_disabled() {
        let scheduler = ManualScheduler::new();
        let events = EventTarget::new();
        let offset = Stream::with_value(Offset::default());
        let shown = Stream::with_value(false);
        let _disposers = wire_drag(&events, &offset, &shown, FrameSlot::new(scheduler.handle()));
        let dispatch = |event: HostEvent| events.dispatch(event.kind(), &event);

        dispatch(HostEvent::PointerDown(PointerEvent::at(500.0, 500.0).on_handle()));
        dispatch(HostEvent::PointerMove(PointerEvent::at(400.0, 400.0)));
        scheduler.advance(Duration::from_millis(16));
        assert_eq!(offset.get(), Some(Offset::default()));
        assert_eq!(scheduler.pending(), 0);

        // hiding mid-drag ends the drag
        shown.set(true);
        dispatch(HostEvent::PointerDown(PointerEvent::at(500.0, 500.0).on_handle()));
        shown.set(false);
        dispatch(HostEvent::PointerMove(PointerEvent::at(400.0, 400.0)));
        shown.set(true);
        dispatch(HostEvent::PointerMove(PointerEvent::at(450.0, 450.0)));
        scheduler.advance(Duration::from_millis(16));
        assert_eq!(offset.get(), Some(Offset::default()));
    }
}
