//! The stream node
//!
//! `Stream<T>` is a cheap handle (`Rc`) to one node of the graph. The node
//! owns its downstream edges; nothing downstream owns its upstream. Closures
//! that need to read an upstream value from inside the graph hold a
//! [`WeakStream`] instead.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::{Result, StreamError};

static NEXT_NODE: AtomicU64 = AtomicU64::new(0);

/// Handle returned by [`Stream::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

/// Downstream edge. `on_update` runs in phase 1, `on_flush` in phase 2.
pub(crate) trait Dependent<T> {
    fn on_update(&self, value: &T);
    fn on_flush(&self);
}

pub(crate) struct FnDependent<U, F> {
    update: U,
    flush: F,
}

impl<T, U, F> Dependent<T> for FnDependent<U, F>
where
    U: Fn(&T),
    F: Fn(),
{
    fn on_update(&self, value: &T) {
        (self.update)(value)
    }

    fn on_flush(&self) {
        (self.flush)()
    }
}

struct Node<T> {
    name: RefCell<String>,
    value: RefCell<Option<T>>,
    changed: Cell<bool>,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<(Subscription, Listener<T>)>>,
    dependents: RefCell<SmallVec<[Rc<dyn Dependent<T>>; 2]>>,
}

/// A reactive value
pub struct Stream<T> {
    node: Rc<Node<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &*self.node.name.borrow())
            .field("has_value", &self.node.value.borrow().is_some())
            .finish()
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Create a node without a value
    pub fn new() -> Self {
        Self::from_option(None, None)
    }

    /// Create a node holding `value`
    pub fn with_value(value: T) -> Self {
        Self::from_option(Some(value), None)
    }

    /// Create a named node
    pub fn named(name: impl Into<String>, value: Option<T>) -> Self {
        Self::from_option(value, Some(name.into()))
    }

    pub(crate) fn from_option(value: Option<T>, name: Option<String>) -> Self {
        let name =
            name.unwrap_or_else(|| format!("s_{}", NEXT_NODE.fetch_add(1, Ordering::Relaxed)));
        Self {
            node: Rc::new(Node {
                name: RefCell::new(name),
                value: RefCell::new(value),
                changed: Cell::new(false),
                next_listener: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                dependents: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// Current value, if any
    pub fn get(&self) -> Option<T> {
        self.node.value.borrow().clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.node.value.borrow().as_ref())
    }

    pub fn has_value(&self) -> bool {
        self.node.value.borrow().is_some()
    }

    /// Write a value: update the whole downstream graph, then flush it.
    pub fn set(&self, value: T) {
        self.update(value);
        self.flush();
    }

    /// Write an optional value. `None` is a programming error.
    pub fn send(&self, value: Option<T>) -> Result<()> {
        match value {
            Some(value) => {
                self.set(value);
                Ok(())
            }
            None => Err(StreamError::Unset(self.name())),
        }
    }

    /// Register a listener. It is called right away when a value exists.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let current = self.get();
        if let Some(value) = current {
            listener(&value);
        }
        self.listen(listener)
    }

    /// Register a listener without replaying the current value
    pub fn listen(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = Subscription(self.node.next_listener.get());
        self.node.next_listener.set(id.0 + 1);
        self.node
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.node
            .listeners
            .borrow_mut()
            .retain(|(id, _)| *id != subscription);
    }

    /// Drop every listener and downstream edge of this node
    pub fn clear(&self) {
        self.node.listeners.borrow_mut().clear();
        self.node.dependents.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.node.listeners.borrow().len()
    }

    pub fn name(&self) -> String {
        self.node.name.borrow().clone()
    }

    pub fn set_name(self, name: impl Into<String>) -> Self {
        *self.node.name.borrow_mut() = name.into();
        self
    }

    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            node: Rc::downgrade(&self.node),
        }
    }

    pub fn ptr_eq(&self, other: &Stream<T>) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Phase 1: store the value and push it to dependents
    pub(crate) fn update(&self, value: T) {
        let dependents = self.node.dependents.borrow().clone();
        *self.node.value.borrow_mut() = Some(value.clone());
        self.node.changed.set(true);
        for dependent in dependents {
            dependent.on_update(&value);
        }
    }

    /// Phase 2: notify listeners once, then flush dependents
    pub(crate) fn flush(&self) {
        if !self.node.changed.replace(false) {
            return;
        }
        let value = self.node.value.borrow().clone();
        if let Some(value) = value {
            let listeners: Vec<Listener<T>> = self
                .node
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&value);
            }
        }
        let dependents = self.node.dependents.borrow().clone();
        for dependent in dependents {
            dependent.on_flush();
        }
    }

    pub(crate) fn add_dependent(&self, update: impl Fn(&T) + 'static, flush: impl Fn() + 'static) {
        self.node
            .dependents
            .borrow_mut()
            .push(Rc::new(FnDependent { update, flush }));
    }
}

impl<T: Clone + fmt::Debug + 'static> Stream<T> {
    /// Name the node and trace every flushed value
    pub fn log(self, name: impl Into<String>) -> Self {
        let stream = self.set_name(name);
        let name = stream.name();
        stream.listen(move |value| {
            tracing::trace!(stream = %name, value = ?value, "flush");
        });
        stream
    }
}

impl<T: Clone + 'static> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning reference to a stream
pub struct WeakStream<T> {
    node: Weak<Node<T>>,
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        Self {
            node: Weak::clone(&self.node),
        }
    }
}

impl<T: Clone + 'static> WeakStream<T> {
    pub fn upgrade(&self) -> Option<Stream<T>> {
        self.node.upgrade().map(|node| Stream { node })
    }

    /// Current value of the stream, `None` when unset or dropped
    pub fn get(&self) -> Option<T> {
        self.upgrade().and_then(|stream| stream.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(stream: &Stream<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        stream.subscribe(move |value: &T| sink.borrow_mut().push(value.clone()));
        seen
    }

    #[test]
    fn test_read_and_write() {
        let count = Stream::with_value(1);
        assert_eq!(count.get(), Some(1));

        count.set(2);
        assert_eq!(count.get(), Some(2));
    }

    #[test]
    fn test_subscribe_replays_current_value() {
        let empty: Stream<i32> = Stream::new();
        let seen = recorder(&empty);
        assert!(seen.borrow().is_empty());

        let full = Stream::with_value("a");
        let seen = recorder(&full);
        full.set("b");
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_send_unset_fails() {
        let s: Stream<i32> = Stream::named("count", None);
        let err = s.send(None).unwrap_err();
        assert_eq!(err, StreamError::Unset("count".to_string()));
        assert_eq!(s.get(), None);

        s.send(Some(3)).unwrap();
        assert_eq!(s.get(), Some(3));
    }

    #[test]
    fn test_unsubscribe() {
        let s = Stream::with_value(0);
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let sub = s.listen(move |_| sink.set(sink.get() + 1));

        s.set(1);
        s.unsubscribe(sub);
        s.set(2);

        assert_eq!(seen.get(), 1);
        assert_eq!(s.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_write_other_stream() {
        let a = Stream::new();
        let b = Stream::new();
        let b_writer = b.clone();
        a.listen(move |v: &i32| b_writer.set(v * 10));

        let seen = recorder(&b);
        a.set(4);
        assert_eq!(*seen.borrow(), vec![40]);
    }

    #[test]
    fn test_weak_stream() {
        let s = Stream::with_value(5);
        let weak = s.downgrade();
        assert_eq!(weak.get(), Some(5));
        drop(s);
        assert_eq!(weak.get(), None);
    }
}
