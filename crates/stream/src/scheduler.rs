//! Timers and animation frames
//!
//! The engine never sleeps. Anything that waits (throttle, debounce,
//! intervals, frame-stepped animations) goes through a [`Scheduler`], so a
//! host can plug in its own event loop and tests can drive a virtual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Identifier of a pending timer or frame request
pub type TaskId = u64;

/// Spacing of animation frames on the virtual clock (~60 fps)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub trait Scheduler {
    /// Monotonic time since the scheduler started
    fn now(&self) -> Duration;

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId;

    fn set_interval(&self, period: Duration, task: Box<dyn FnMut()>) -> TaskId;

    /// Run `task` on the next animation frame with the frame timestamp
    fn request_frame(&self, task: Box<dyn FnOnce(Duration)>) -> TaskId;

    /// Cancel a timer, interval or frame. Unknown ids are ignored.
    fn cancel(&self, id: TaskId);
}

enum TaskKind {
    Once(Box<dyn FnOnce()>),
    Interval(Duration, Box<dyn FnMut()>),
    Frame(Box<dyn FnOnce(Duration)>),
}

struct Timer {
    id: TaskId,
    due: Duration,
    kind: TaskKind,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: TaskId,
    timers: Vec<Timer>,
    running: Option<TaskId>,
    running_cancelled: bool,
}

impl Clock {
    fn schedule(&mut self, due: Duration, kind: TaskKind) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.push(Timer { id, due, kind });
        id
    }

    /// Remove the earliest timer due at or before `limit`
    fn pop_due(&mut self, limit: Duration) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= limit)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        Some(self.timers.swap_remove(index))
    }
}

/// Deterministic virtual clock
///
/// Time only moves inside [`ManualScheduler::advance`]; due tasks run in
/// `(due, id)` order with the clock set to their due time.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared trait-object handle for operators and sessions
    pub fn handle(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.clone())
    }

    /// Move the clock forward by `by`, running every task that falls due
    pub fn advance(&self, by: Duration) {
        let end = self.clock.borrow().now + by;
        loop {
            let next = self.clock.borrow_mut().pop_due(end);
            let Some(timer) = next else { break };
            {
                let mut clock = self.clock.borrow_mut();
                clock.now = timer.due;
                clock.running = Some(timer.id);
                clock.running_cancelled = false;
            }
            match timer.kind {
                TaskKind::Once(task) => task(),
                TaskKind::Frame(task) => task(timer.due),
                TaskKind::Interval(period, mut task) => {
                    task();
                    let mut clock = self.clock.borrow_mut();
                    if !clock.running_cancelled {
                        clock.timers.push(Timer {
                            id: timer.id,
                            due: timer.due + period.max(Duration::from_millis(1)),
                            kind: TaskKind::Interval(period, task),
                        });
                    }
                }
            }
            self.clock.borrow_mut().running = None;
        }
        self.clock.borrow_mut().now = end;
    }

    /// Number of timers and frames still waiting
    pub fn pending(&self) -> usize {
        self.clock.borrow().timers.len()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId {
        let mut clock = self.clock.borrow_mut();
        let due = clock.now + delay;
        clock.schedule(due, TaskKind::Once(task))
    }

    fn set_interval(&self, period: Duration, task: Box<dyn FnMut()>) -> TaskId {
        let mut clock = self.clock.borrow_mut();
        let due = clock.now + period;
        clock.schedule(due, TaskKind::Interval(period, task))
    }

    fn request_frame(&self, task: Box<dyn FnOnce(Duration)>) -> TaskId {
        let mut clock = self.clock.borrow_mut();
        let due = clock.now + FRAME_INTERVAL;
        clock.schedule(due, TaskKind::Frame(task))
    }

    fn cancel(&self, id: TaskId) {
        let mut clock = self.clock.borrow_mut();
        clock.timers.retain(|timer| timer.id != id);
        if clock.running == Some(id) {
            clock.running_cancelled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_timeouts_run_in_due_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, tag) in [(30, 'c'), (10, 'a'), (20, 'b')] {
            let order = Rc::clone(&order);
            scheduler.set_timeout(ms(delay), Box::new(move || order.borrow_mut().push(tag)));
        }
        scheduler.advance(ms(25));
        assert_eq!(*order.borrow(), vec!['a', 'b']);

        scheduler.advance(ms(5));
        assert_eq!(*order.borrow(), vec!['a', 'b', 'c']);
        assert_eq!(scheduler.now(), ms(30));
    }

    #[test]
    fn test_cancel() {
        let scheduler = ManualScheduler::new();
        let hit = Rc::new(Cell::new(false));
        let flag = Rc::clone(&hit);
        let id = scheduler.set_timeout(ms(10), Box::new(move || flag.set(true)));

        scheduler.cancel(id);
        scheduler.advance(ms(100));
        assert!(!hit.get());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_interval_repeats_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ticks);
        let id = scheduler.set_interval(ms(60), Box::new(move || counter.set(counter.get() + 1)));

        scheduler.advance(ms(200));
        assert_eq!(ticks.get(), 3);

        scheduler.cancel(id);
        scheduler.advance(ms(200));
        assert_eq!(ticks.get(), 3);
    }

    #[test]
    fn test_interval_cancelled_from_inside() {
        let scheduler = ManualScheduler::new();
        let ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ticks);
        let own_id = Rc::new(Cell::new(None));
        let id_slot = Rc::clone(&own_id);
        let handle = scheduler.clone();
        let id = scheduler.set_interval(
            ms(10),
            Box::new(move || {
                counter.set(counter.get() + 1);
                if let Some(id) = id_slot.get() {
                    handle.cancel(id);
                }
            }),
        );
        own_id.set(Some(id));

        scheduler.advance(ms(100));
        assert_eq!(ticks.get(), 1);
    }

    #[test]
    fn test_frames_chain() {
        let scheduler = ManualScheduler::new();
        let stamps = Rc::new(RefCell::new(Vec::new()));

        fn step(scheduler: ManualScheduler, stamps: Rc<RefCell<Vec<Duration>>>, left: u32) {
            if left == 0 {
                return;
            }
            let next = scheduler.clone();
            scheduler.request_frame(Box::new(move |ts| {
                stamps.borrow_mut().push(ts);
                step(next, stamps, left - 1);
            }));
        }
        step(scheduler.clone(), Rc::clone(&stamps), 3);

        scheduler.advance(ms(100));
        assert_eq!(*stamps.borrow(), vec![ms(16), ms(32), ms(48)]);
    }
}
