//! Bridges from the outside world into streams

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::Scheduler;
use crate::stream::Stream;

/// Teardown callback returned by every bridge
pub type Disposer = Box<dyn FnOnce()>;

/// Ordered list of teardown callbacks, each run exactly once
#[derive(Default)]
pub struct Disposers {
    pending: RefCell<Vec<Disposer>>,
}

impl Disposers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, disposer: Disposer) {
        self.pending.borrow_mut().push(disposer);
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub fn dispose_all(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for dispose in pending {
            dispose();
        }
    }
}

impl fmt::Debug for Disposers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposers")
            .field("pending", &self.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, String, Handler<E>)>>,
}

/// Listener registry keyed by event type
///
/// Hosts dispatch their native events here; streams subscribe through
/// [`from_event`].
pub struct EventTarget<E> {
    registry: Rc<Registry<E>>,
}

impl<E> Clone for EventTarget<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E: 'static> EventTarget<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn add_listener(&self, kind: &str, handler: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.registry.next_id.get());
        self.registry.next_id.set(id.0 + 1);
        self.registry
            .listeners
            .borrow_mut()
            .push((id, kind.to_string(), Rc::new(handler)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.registry
            .listeners
            .borrow_mut()
            .retain(|(listener, _, _)| *listener != id);
    }

    /// Deliver `event` to every listener of `kind`, in registration order
    pub fn dispatch(&self, kind: &str, event: &E) {
        let handlers: Vec<Handler<E>> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .filter(|(_, listener_kind, _)| listener_kind == kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.registry
            .listeners
            .borrow()
            .iter()
            .filter(|(_, listener_kind, _)| listener_kind == kind)
            .count()
    }
}

impl<E: 'static> Default for EventTarget<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream every `kind` event dispatched on `target`
pub fn from_event<E: Clone + 'static>(
    target: &EventTarget<E>,
    kind: &str,
) -> (Stream<E>, Disposer) {
    let events = Stream::named(format!("event({kind})"), None);
    let sink = events.clone();
    let id = target.add_listener(kind, move |event: &E| sink.set(event.clone()));
    let target = target.clone();
    (events, Box::new(move || target.remove_listener(id)))
}

/// Emit `()` every `period`
pub fn from_interval(scheduler: &Rc<dyn Scheduler>, period: Duration) -> (Stream<()>, Disposer) {
    let ticks = Stream::named(format!("interval({}ms)", period.as_millis()), None);
    let sink = ticks.clone();
    let id = scheduler.set_interval(period, Box::new(move || sink.set(())));
    let scheduler = Rc::clone(scheduler);
    (ticks, Box::new(move || scheduler.cancel(id)))
}
