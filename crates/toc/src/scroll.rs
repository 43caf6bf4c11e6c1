//! Scroll containers and eased programmatic scrolling

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use dom::{DocumentMut, DocumentTree, NodeId};
use stream::{Scheduler, TaskId};
use tracing::trace;

use crate::host::Host;

pub const MAX_SCROLL_DURATION: Duration = Duration::from_millis(300);
pub const MIN_SCROLL_DURATION: Duration = Duration::from_millis(10);
/// Distances at or beyond this scroll for the full duration
const FULL_DURATION_DISTANCE: f64 = 10_000.0;

/// Independently scrollable: overflow allows it and there is overflow
pub fn can_scroll<D: DocumentTree>(doc: &D, node: NodeId) -> bool {
    let metrics = doc.scroll_metrics(node);
    doc.computed_style(node).is_scrollable_overflow()
        && metrics.client_height + 1.0 < metrics.scroll_height
}

/// Nearest scrollable ancestor-or-self, else `<body>`
pub fn scroll_element<D: DocumentTree>(doc: &D, node: NodeId) -> NodeId {
    let body = doc.body();
    let mut current = node;
    loop {
        if Some(current) == body || can_scroll(doc, current) {
            return current;
        }
        match doc.parent_element(current) {
            Some(parent) => current = parent,
            None => return body.unwrap_or(current),
        }
    }
}

/// At most one pending animation frame; a new request replaces the old
#[derive(Clone)]
pub struct FrameSlot {
    scheduler: Rc<dyn Scheduler>,
    pending: Rc<Cell<Option<TaskId>>>,
}

impl FrameSlot {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn request(&self, task: impl FnOnce(Duration) + 'static) {
        self.cancel();
        let pending = Rc::clone(&self.pending);
        let id = self.scheduler.request_frame(Box::new(move |ts| {
            pending.set(None);
            task(ts);
        }));
        self.pending.set(Some(id));
    }

    pub fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

fn ease_out_quad(progress: f64, start: f64, distance: f64) -> f64 {
    distance * progress * (2.0 - progress) + start
}

/// Duration scaled by distance, shaped like the easing curve
pub fn scroll_duration(distance: f64, max: Duration) -> Duration {
    let ratio = (distance.abs() / FULL_DURATION_DISTANCE).min(1.0);
    let nanos = (max.as_nanos() as f64 * ratio * (2.0 - ratio)).round() as u64;
    Duration::from_nanos(nanos).max(MIN_SCROLL_DURATION)
}

pub struct SmoothScroll {
    pub target: NodeId,
    pub scroller: NodeId,
    pub top_margin: f64,
    pub max_duration: Duration,
}

struct Animation<D> {
    host: Host<D>,
    slot: FrameSlot,
    scroller: NodeId,
    start: f64,
    end: f64,
    duration: Duration,
    started_at: Cell<Option<Duration>>,
    on_done: Cell<Option<Box<dyn FnOnce()>>>,
}

impl<D: DocumentMut + 'static> Animation<D> {
    fn step(self: Rc<Self>, timestamp: Duration) {
        let started_at = match self.started_at.get() {
            Some(started_at) => started_at,
            None => {
                self.started_at.set(Some(timestamp));
                timestamp
            }
        };
        let elapsed = timestamp.saturating_sub(started_at);
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();

        if progress < 1.0 {
            let position = ease_out_quad(progress, self.start, self.end - self.start);
            trace!(position, progress, "smooth scroll step");
            self.host.scroll_to(self.scroller, position);
            let next = Rc::clone(&self);
            self.slot.request(move |ts| next.step(ts));
        } else {
            self.host.scroll_to(self.scroller, self.end);
            if let Some(done) = self.on_done.take() {
                done();
            }
        }
    }
}

/// Scroll `scroller` so `target` ends `top_margin` below its top edge
///
/// Any animation already running in `slot` is cancelled first.
pub fn smooth_scroll<D: DocumentMut + 'static>(
    host: &Host<D>,
    slot: &FrameSlot,
    options: SmoothScroll,
    on_done: impl FnOnce() + 'static,
) {
    let (start, end) = {
        let doc = host.document.borrow();
        let target_top = doc.bounding_client_rect(options.target).top();
        let container_top = if doc.is_document_scroller(options.scroller) {
            0.0
        } else {
            doc.bounding_client_rect(options.scroller).top()
        };
        let start = doc.scroll_metrics(options.scroller).scroll_top;
        (start, target_top - (container_top - start) - options.top_margin)
    };

    slot.cancel();
    if options.max_duration.is_zero() {
        host.scroll_to(options.scroller, end);
        on_done();
        return;
    }

    let animation = Rc::new(Animation {
        host: host.clone(),
        slot: slot.clone(),
        scroller: options.scroller,
        start,
        end,
        duration: scroll_duration(end - start, options.max_duration),
        started_at: Cell::new(None),
        on_done: Cell::new(Some(Box::new(on_done))),
    });
    slot.request(move |ts| animation.step(ts));
}
