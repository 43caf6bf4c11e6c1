//! The environment a session runs in: a document, its native events and a
//! scheduler. Hosts forward their input through [`Host::dispatch`]; the
//! helpers below mutate the document and then raise the event a browser
//! would raise for the same change.

use std::cell::RefCell;
use std::rc::Rc;

use dom::{DocumentMut, NodeId, Viewport};
use stream::{EventTarget, Scheduler};

pub const SCROLL: &str = "scroll";
pub const RESIZE: &str = "resize";
pub const MUTATION: &str = "mutation";
pub const POINTER_DOWN: &str = "pointerdown";
pub const POINTER_MOVE: &str = "pointermove";
pub const POINTER_UP: &str = "pointerup";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    /// 0 = primary
    pub button: u8,
    /// Pressed on the panel's drag handle
    pub on_handle: bool,
}

impl PointerEvent {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            button: 0,
            on_handle: false,
        }
    }

    pub fn on_handle(mut self) -> Self {
        self.on_handle = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// `None` when the viewport itself scrolled
    Scroll { target: Option<NodeId> },
    Resize,
    Mutation,
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::Scroll { .. } => SCROLL,
            HostEvent::Resize => RESIZE,
            HostEvent::Mutation => MUTATION,
            HostEvent::PointerDown(_) => POINTER_DOWN,
            HostEvent::PointerMove(_) => POINTER_MOVE,
            HostEvent::PointerUp(_) => POINTER_UP,
        }
    }

    pub fn pointer(&self) -> Option<PointerEvent> {
        match self {
            HostEvent::PointerDown(p) | HostEvent::PointerMove(p) | HostEvent::PointerUp(p) => {
                Some(*p)
            }
            _ => None,
        }
    }
}

pub struct Host<D> {
    pub document: Rc<RefCell<D>>,
    pub events: EventTarget<HostEvent>,
    pub scheduler: Rc<dyn Scheduler>,
}

impl<D> Clone for Host<D> {
    fn clone(&self) -> Self {
        Self {
            document: Rc::clone(&self.document),
            events: self.events.clone(),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}

impl<D: DocumentMut + 'static> Host<D> {
    pub fn new(document: D, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::shared(Rc::new(RefCell::new(document)), scheduler)
    }

    /// Host over a document someone else also holds, like an iframe's
    pub fn shared(document: Rc<RefCell<D>>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            document,
            events: EventTarget::new(),
            scheduler,
        }
    }

    pub fn dispatch(&self, event: HostEvent) {
        self.events.dispatch(event.kind(), &event);
    }

    /// Set a scroll offset and raise the matching scroll event
    pub fn scroll_to(&self, scroller: NodeId, top: f64) {
        let target = {
            let mut doc = self.document.borrow_mut();
            doc.set_scroll_top(scroller, top);
            (!doc.is_document_scroller(scroller)).then_some(scroller)
        };
        self.dispatch(HostEvent::Scroll { target });
    }

    pub fn scroll_top(&self, scroller: NodeId) -> f64 {
        self.document.borrow().scroll_metrics(scroller).scroll_top
    }

    pub fn resize(&self, width: f64, height: f64) {
        {
            let mut doc = self.document.borrow_mut();
            let viewport = doc.viewport();
            doc.set_viewport(Viewport {
                width,
                height,
                ..viewport
            });
        }
        self.dispatch(HostEvent::Resize);
    }

    /// Change the document and report it as one mutation batch
    pub fn mutate<R>(&self, change: impl FnOnce(&mut D) -> R) -> R {
        let result = change(&mut self.document.borrow_mut());
        self.dispatch(HostEvent::Mutation);
        result
    }
}
