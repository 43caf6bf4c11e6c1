//! Derived streams
//!
//! Synchronous operators hook into the two-phase protocol through
//! dependents, so they never fire listeners mid-update. Time operators
//! re-emit from scheduler callbacks, each emission being a fresh pass.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::{Scheduler, TaskId};
use crate::stream::Stream;

impl<T: Clone + 'static> Stream<T> {
    pub fn map<U: Clone + 'static>(&self, mapper: impl Fn(&T) -> U + 'static) -> Stream<U> {
        let initial = self.with(|value| value.map(&mapper));
        let mapped = Stream::from_option(initial, Some(format!("map({})", self.name())));
        let target = mapped.clone();
        let flushed = mapped.clone();
        self.add_dependent(
            move |value| target.update(mapper(value)),
            move || flushed.flush(),
        );
        mapped
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let initial = self.with(|value| value.filter(|v| predicate(v)).cloned());
        let filtered = Stream::from_option(initial, Some(format!("filter({})", self.name())));
        let target = filtered.clone();
        let flushed = filtered.clone();
        self.add_dependent(
            move |value| {
                if predicate(value) {
                    target.update(value.clone());
                }
            },
            move || flushed.flush(),
        );
        filtered
    }

    /// Stateful fold. Starts at `reducer(seed, current)` when the source
    /// already has a value, else at `seed`.
    pub fn scan<U: Clone + 'static>(
        &self,
        reducer: impl Fn(&U, &T) -> U + 'static,
        seed: U,
    ) -> Stream<U> {
        let initial = match self.get() {
            Some(current) => reducer(&seed, &current),
            None => seed.clone(),
        };
        let scanned = Stream::from_option(Some(initial), Some(format!("scan({})", self.name())));
        let target = scanned.clone();
        let flushed = scanned.clone();
        self.add_dependent(
            move |value| {
                let next = target.with(|last| reducer(last.unwrap_or(&seed), value));
                target.update(next);
            },
            move || flushed.flush(),
        );
        scanned
    }

    /// Emit `value` first, then everything this stream emits
    pub fn starts_with(&self, value: T) -> Stream<T> {
        merge(&[Stream::with_value(value), self.clone()])
    }

    pub fn throttle(&self, interval: Duration, scheduler: Rc<dyn Scheduler>) -> Stream<T> {
        let throttled = Stream::from_option(None, Some(format!("throttle({})", self.name())));
        let last_emit: Rc<Cell<Option<Duration>>> = Rc::new(Cell::new(None));
        let timer: Rc<Cell<Option<TaskId>>> = Rc::new(Cell::new(None));

        let target = throttled.clone();
        self.subscribe(move |value| {
            if let Some(pending) = timer.take() {
                scheduler.cancel(pending);
            }
            let now = scheduler.now();
            let elapsed = last_emit.get().map(|last| now.saturating_sub(last));
            match elapsed {
                Some(elapsed) if elapsed < interval => {
                    let target = target.clone();
                    let value = value.clone();
                    let last_emit = Rc::clone(&last_emit);
                    let clock = Rc::clone(&scheduler);
                    let id = scheduler.set_timeout(
                        interval - elapsed,
                        Box::new(move || {
                            last_emit.set(Some(clock.now()));
                            target.set(value);
                        }),
                    );
                    timer.set(Some(id));
                }
                _ => {
                    last_emit.set(Some(now));
                    target.set(value.clone());
                }
            }
        });
        throttled
    }

    /// Emit only after `quiet` has passed without a new value
    pub fn debounce(&self, quiet: Duration, scheduler: Rc<dyn Scheduler>) -> Stream<T> {
        let debounced = Stream::from_option(None, Some(format!("debounce({})", self.name())));
        let timer: Rc<Cell<Option<TaskId>>> = Rc::new(Cell::new(None));

        let target = debounced.clone();
        self.subscribe(move |value| {
            if let Some(pending) = timer.take() {
                scheduler.cancel(pending);
            }
            let target = target.clone();
            let value = value.clone();
            let id = scheduler.set_timeout(quiet, Box::new(move || target.set(value)));
            timer.set(Some(id));
        });
        debounced
    }

    pub fn delay(&self, delay: Duration, scheduler: Rc<dyn Scheduler>) -> Stream<T> {
        let delayed = Stream::from_option(None, Some(format!("delay({})", self.name())));
        let target = delayed.clone();
        self.subscribe(move |value| {
            let target = target.clone();
            let value = value.clone();
            scheduler.set_timeout(delay, Box::new(move || target.set(value)));
        });
        delayed
    }
}

impl<T: Clone + PartialEq + 'static> Stream<T> {
    /// Suppress values equal to the current one
    pub fn unique(&self) -> Stream<T> {
        let unique = Stream::from_option(self.get(), Some(format!("unique({})", self.name())));
        let target = unique.clone();
        let flushed = unique.clone();
        self.add_dependent(
            move |value| {
                let repeated = target.with(|last| last == Some(value));
                if !repeated {
                    target.update(value.clone());
                }
            },
            move || flushed.flush(),
        );
        unique
    }
}

/// Emit whenever any input emits
///
/// Starts with the value of the last input that has one.
pub fn merge<T: Clone + 'static>(streams: &[Stream<T>]) -> Stream<T> {
    let names: Vec<String> = streams.iter().map(Stream::name).collect();
    let initial = streams.iter().rev().find_map(Stream::get);
    let merged = Stream::from_option(initial, Some(format!("merge({})", names.join(","))));
    for stream in streams {
        let target = merged.clone();
        let flushed = merged.clone();
        stream.add_dependent(
            move |value| target.update(value.clone()),
            move || flushed.flush(),
        );
    }
    merged
}

/// Wire one input of a combination: cache its latest value, then
/// re-derive the output once every slot is filled.
fn attach_slot<S, C, O>(
    source: &Stream<S>,
    cache: &Rc<RefCell<C>>,
    output: &Stream<O>,
    store: impl Fn(&mut C, &S) + 'static,
    read: fn(&C) -> Option<O>,
) where
    S: Clone + 'static,
    C: 'static,
    O: Clone + 'static,
{
    let cache = Rc::clone(cache);
    let target = output.clone();
    let flushed = output.clone();
    source.add_dependent(
        move |value| {
            let combined = {
                let mut slots = cache.borrow_mut();
                store(&mut slots, value);
                read(&slots)
            };
            if let Some(combined) = combined {
                target.update(combined);
            }
        },
        move || flushed.flush(),
    );
}

pub fn combine2<A, B>(a: &Stream<A>, b: &Stream<B>) -> Stream<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let read: fn(&(Option<A>, Option<B>)) -> Option<(A, B)> =
        |slots| Some((slots.0.clone()?, slots.1.clone()?));
    let cache = Rc::new(RefCell::new((a.get(), b.get())));
    let initial = read(&cache.borrow());
    let name = format!("combine({},{})", a.name(), b.name());
    let combined = Stream::from_option(initial, Some(name));

    attach_slot(a, &cache, &combined, |slots, v: &A| slots.0 = Some(v.clone()), read);
    attach_slot(b, &cache, &combined, |slots, v: &B| slots.1 = Some(v.clone()), read);
    combined
}

pub fn combine3<A, B, C>(a: &Stream<A>, b: &Stream<B>, c: &Stream<C>) -> Stream<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    type Slots<A, B, C> = (Option<A>, Option<B>, Option<C>);
    let read: fn(&Slots<A, B, C>) -> Option<(A, B, C)> =
        |slots| Some((slots.0.clone()?, slots.1.clone()?, slots.2.clone()?));
    let cache = Rc::new(RefCell::new((a.get(), b.get(), c.get())));
    let initial = read(&cache.borrow());
    let name = format!("combine({},{},{})", a.name(), b.name(), c.name());
    let combined = Stream::from_option(initial, Some(name));

    attach_slot(a, &cache, &combined, |slots, v: &A| slots.0 = Some(v.clone()), read);
    attach_slot(b, &cache, &combined, |slots, v: &B| slots.1 = Some(v.clone()), read);
    attach_slot(c, &cache, &combined, |slots, v: &C| slots.2 = Some(v.clone()), read);
    combined
}

pub fn combine4<A, B, C, D>(
    a: &Stream<A>,
    b: &Stream<B>,
    c: &Stream<C>,
    d: &Stream<D>,
) -> Stream<(A, B, C, D)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
{
    type Slots<A, B, C, D> = (Option<A>, Option<B>, Option<C>, Option<D>);
    let read: fn(&Slots<A, B, C, D>) -> Option<(A, B, C, D)> = |slots| {
        Some((
            slots.0.clone()?,
            slots.1.clone()?,
            slots.2.clone()?,
            slots.3.clone()?,
        ))
    };
    let cache = Rc::new(RefCell::new((a.get(), b.get(), c.get(), d.get())));
    let initial = read(&cache.borrow());
    let name = format!(
        "combine({},{},{},{})",
        a.name(),
        b.name(),
        c.name(),
        d.name()
    );
    let combined = Stream::from_option(initial, Some(name));

    attach_slot(a, &cache, &combined, |slots, v: &A| slots.0 = Some(v.clone()), read);
    attach_slot(b, &cache, &combined, |slots, v: &B| slots.1 = Some(v.clone()), read);
    attach_slot(c, &cache, &combined, |slots, v: &C| slots.2 = Some(v.clone()), read);
    attach_slot(d, &cache, &combined, |slots, v: &D| slots.3 = Some(v.clone()), read);
    combined
}

/// Combine any number of same-typed streams into a `Vec`
pub fn combine_all<T: Clone + 'static>(streams: &[Stream<T>]) -> Stream<Vec<T>> {
    let read: fn(&Vec<Option<T>>) -> Option<Vec<T>> = |slots| slots.iter().cloned().collect();
    let cache = Rc::new(RefCell::new(
        streams.iter().map(Stream::get).collect::<Vec<_>>(),
    ));
    let initial = if streams.is_empty() {
        None
    } else {
        read(&cache.borrow())
    };
    let names: Vec<String> = streams.iter().map(Stream::name).collect();
    let combined = Stream::from_option(initial, Some(format!("combine({})", names.join(","))));

    for (index, stream) in streams.iter().enumerate() {
        attach_slot(
            stream,
            &cache,
            &combined,
            move |slots, v: &T| slots[index] = Some(v.clone()),
            read,
        );
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn recorder<T: Clone + 'static>(stream: &Stream<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        stream.subscribe(move |value: &T| sink.borrow_mut().push(value.clone()));
        seen
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_map_and_filter() {
        let source = Stream::with_value(2);
        let doubled = source.map(|v| v * 2);
        let even = source.filter(|v| v % 2 == 0);
        let seen_doubled = recorder(&doubled);
        let seen_even = recorder(&even);

        source.set(3);
        source.set(4);

        assert_eq!(*seen_doubled.borrow(), vec![4, 6, 8]);
        assert_eq!(*seen_even.borrow(), vec![2, 4]);
    }

    #[test]
    fn test_combine_waits_for_every_input() {
        let a: Stream<i32> = Stream::new();
        let b: Stream<&str> = Stream::new();
        let c: Stream<bool> = Stream::new();
        let combined = combine3(&a, &b, &c);
        let seen = recorder(&combined);

        a.set(1);
        b.set("x");
        assert!(seen.borrow().is_empty());

        c.set(true);
        a.set(2);
        b.set("y");

        assert_eq!(
            *seen.borrow(),
            vec![(1, "x", true), (2, "x", true), (2, "y", true)]
        );
    }

    #[test]
    fn test_combine_starts_with_existing_values() {
        let a = Stream::with_value(1);
        let b = Stream::with_value(2);
        let combined = combine2(&a, &b);
        assert_eq!(combined.get(), Some((1, 2)));
    }

    #[test]
    fn test_combine_all() {
        let streams: Vec<Stream<u8>> = (0..3).map(|_| Stream::new()).collect();
        let combined = combine_all(&streams);
        let seen = recorder(&combined);

        streams[2].set(3);
        streams[0].set(1);
        assert!(seen.borrow().is_empty());
        streams[1].set(2);

        assert_eq!(*seen.borrow(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_diamond_flushes_once() {
        let source = Stream::with_value(1);
        let left = source.map(|v| v + 1);
        let right = source.map(|v| v * 10);
        let joined = combine2(&left, &right);

        let seen = recorder(&joined);
        source.set(2);
        source.set(3);

        assert_eq!(*seen.borrow(), vec![(2, 10), (3, 20), (4, 30)]);
    }

    #[test]
    fn test_deep_diamond_flushes_once() {
        let source: Stream<i32> = Stream::new();
        let a = source.map(|v| v + 1).map(|v| v * 2);
        let b = source.filter(|_| true).unique();
        let c = merge(&[source.map(|v| -v), source.clone()]);
        let joined = combine3(&a, &b, &c);

        let seen = recorder(&joined);
        source.set(5);

        assert_eq!(*seen.borrow(), vec![(12, 5, 5)]);
    }

    #[test]
    fn test_unique_suppresses_repeats() {
        let source = Stream::new();
        let unique = source.unique();
        let seen = recorder(&unique);

        for v in [1, 1, 1, 2, 2, 1, 1, 3] {
            source.set(v);
        }

        assert_eq!(*seen.borrow(), vec![1, 2, 1, 3]);
    }

    #[test]
    fn test_scan_keeps_running_max() {
        let measured = Stream::new();
        let height = measured.scan(|acc: &f64, v: &f64| acc.max(*v), 0.0);
        let seen = recorder(&height);

        for v in [0.0, 40.0, 0.0, 40.0] {
            measured.set(v);
        }

        assert_eq!(*seen.borrow(), vec![0.0, 0.0, 40.0, 40.0, 40.0]);
    }

    #[test]
    fn test_merge_passes_every_value_through() {
        let a = Stream::new();
        let b = Stream::new();
        let merged = merge(&[a.clone(), b.clone()]);
        let seen = recorder(&merged);

        a.set(1);
        b.set(2);
        b.set(2);
        a.set(3);

        assert_eq!(*seen.borrow(), vec![1, 2, 2, 3]);
    }

    #[test]
    fn test_starts_with() {
        let source: Stream<u32> = Stream::new();
        let started = source.starts_with(0);
        let seen = recorder(&started);

        source.set(7);
        assert_eq!(*seen.borrow(), vec![0, 7]);
    }

    #[test]
    fn test_throttle_burst_emits_last_value_once() {
        let scheduler = ManualScheduler::new();
        let source = Stream::new();
        let throttled = source.throttle(ms(100), scheduler.handle());
        let seen = recorder(&throttled);

        source.set(0);
        for v in 1..5 {
            scheduler.advance(ms(1));
            source.set(v);
        }
        assert_eq!(*seen.borrow(), vec![0]);

        scheduler.advance(ms(200));
        assert_eq!(*seen.borrow(), vec![0, 4]);
    }

    #[test]
    fn test_throttle_spacing() {
        let scheduler = ManualScheduler::new();
        let source = Stream::new();
        let throttled = source.throttle(ms(50), scheduler.handle());

        let times = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&times);
        let clock = scheduler.clone();
        throttled.listen(move |_: &u32| sink.borrow_mut().push(clock.now()));

        for v in 0..20 {
            source.set(v);
            scheduler.advance(ms(10));
        }
        scheduler.advance(ms(100));

        let times = times.borrow();
        assert!(times.len() > 1);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= ms(50));
        }
    }

    #[test]
    fn test_debounce_waits_for_silence() {
        let scheduler = ManualScheduler::new();
        let source = Stream::new();
        let debounced = source.debounce(ms(300), scheduler.handle());
        let seen = recorder(&debounced);

        source.set("a");
        scheduler.advance(ms(200));
        source.set("b");
        scheduler.advance(ms(200));
        assert!(seen.borrow().is_empty());

        scheduler.advance(ms(100));
        assert_eq!(*seen.borrow(), vec!["b"]);
    }

    #[test]
    fn test_delay() {
        let scheduler = ManualScheduler::new();
        let source = Stream::new();
        let delayed = source.delay(ms(30), scheduler.handle());
        let seen = recorder(&delayed);

        source.set(1);
        source.set(2);
        scheduler.advance(ms(29));
        assert!(seen.borrow().is_empty());
        scheduler.advance(ms(1));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
