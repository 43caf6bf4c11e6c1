//! Scheduler backed by tokio timers
//!
//! Tasks are `!Send` (they touch `Rc` graphs), so everything runs through
//! `spawn_local`: create and use the scheduler inside a
//! [`tokio::task::LocalSet`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use stream::{Scheduler, TaskId, FRAME_INTERVAL};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

#[derive(Default)]
struct Tasks {
    next_id: Cell<TaskId>,
    handles: RefCell<HashMap<TaskId, JoinHandle<()>>>,
}

impl Tasks {
    fn next(&self) -> TaskId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn finish(&self, id: TaskId) {
        self.handles.borrow_mut().remove(&id);
    }
}

#[derive(Clone)]
pub struct TokioScheduler {
    start: Instant,
    tasks: Rc<Tasks>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            tasks: Rc::new(Tasks::default()),
        }
    }

    pub fn handle(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.clone())
    }

    /// Timers and frames not yet run or cancelled
    pub fn pending(&self) -> usize {
        self.tasks.handles.borrow().len()
    }

    fn spawn(&self, id: TaskId, future: impl std::future::Future<Output = ()> + 'static) -> TaskId {
        let handle = tokio::task::spawn_local(future);
        self.tasks.handles.borrow_mut().insert(id, handle);
        id
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId {
        let id = self.tasks.next();
        let tasks = Rc::clone(&self.tasks);
        self.spawn(id, async move {
            sleep(delay).await;
            tasks.finish(id);
            task();
        })
    }

    fn set_interval(&self, period: Duration, mut task: Box<dyn FnMut()>) -> TaskId {
        let id = self.tasks.next();
        let period = period.max(Duration::from_millis(1));
        self.spawn(id, async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                task();
            }
        })
    }

    fn request_frame(&self, task: Box<dyn FnOnce(Duration)>) -> TaskId {
        let id = self.tasks.next();
        let tasks = Rc::clone(&self.tasks);
        let start = self.start;
        self.spawn(id, async move {
            sleep(FRAME_INTERVAL).await;
            tasks.finish(id);
            task(start.elapsed());
        })
    }

    fn cancel(&self, id: TaskId) {
        if let Some(handle) = self.tasks.handles.borrow_mut().remove(&id) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_cancel() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(RefCell::new(Vec::new()));

                let log = Rc::clone(&fired);
                let push_a = Box::new(move || log.borrow_mut().push("a"));
                scheduler.set_timeout(Duration::from_millis(100), push_a);
                let log = Rc::clone(&fired);
                let push_b = Box::new(move || log.borrow_mut().push("b"));
                let cancelled = scheduler.set_timeout(Duration::from_millis(50), push_b);
                scheduler.cancel(cancelled);
                assert_eq!(scheduler.pending(), 1);

                sleep(Duration::from_millis(150)).await;
                assert_eq!(*fired.borrow(), vec!["a"]);
                assert_eq!(scheduler.pending(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_until_cancelled() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let ticks = Rc::new(Cell::new(0));
                let counter = Rc::clone(&ticks);
                let tick = Box::new(move || counter.set(counter.get() + 1));
                let id = scheduler.set_interval(Duration::from_secs(60), tick);

                sleep(Duration::from_secs(150)).await;
                assert_eq!(ticks.get(), 2);

                scheduler.cancel(id);
                sleep(Duration::from_secs(150)).await;
                assert_eq!(ticks.get(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_timestamp() {
        LocalSet::new()
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let stamp = Rc::new(Cell::new(None));
                let slot = Rc::clone(&stamp);
                scheduler.request_frame(Box::new(move |ts| slot.set(Some(ts))));

                sleep(Duration::from_millis(40)).await;
                let ts = stamp.get().expect("frame ran");
                assert!(ts >= FRAME_INTERVAL);
            })
            .await;
    }
}
