//! Push-based reactive streams
//!
//! A small synchronous dataflow engine. Every write runs two phases:
//!
//! ```text
//! set(v) → update()  marks `changed`, walks dependents, no listener calls
//!        → flush()   walks dependents again, listeners fire once per node
//! ```
//!
//! A node reachable from one source through two paths (a diamond) is
//! updated twice and flushed once, so listeners only ever see the final
//! value of a pass.
//!
//! The engine is single-threaded (`Rc`, `RefCell`). A listener may write to
//! other streams; writing back into a node whose flush is still running is
//! not supported.

pub mod error;
pub mod event;
pub mod operators;
pub mod scheduler;
pub mod stream;

pub use error::{Result, StreamError};
pub use event::{from_event, from_interval, Disposer, Disposers, EventTarget, ListenerId};
pub use operators::{combine2, combine3, combine4, combine_all, merge};
pub use scheduler::{ManualScheduler, Scheduler, TaskId, FRAME_INTERVAL};
pub use stream::{Stream, Subscription, WeakStream};
