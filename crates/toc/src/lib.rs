//! Floating table of contents that follows the reader
//!
//! Builds on the `stream` dataflow engine and the `dom` extractor to keep an
//! outline of the current article in sync with scrolling, resizing and live
//! document changes.
//!
//! # Layout
//!
//! 1. **Session** ([`Toc`]): one stream graph per extracted article, with
//!    an explicit `show`/`hide`/`dispose` lifecycle. No globals.
//! 2. **Controller**: turns host commands into session calls, restarts on
//!    content drift, owns preferences.
//! 3. **Host** ([`Host`]): the document, its events and a scheduler. Use
//!    `ManualScheduler` for deterministic hosts or [`TokioScheduler`] on a
//!    `LocalSet`.

pub mod active;
pub mod command;
pub mod content;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod host;
pub mod placement;
pub mod preference;
pub mod readable;
pub mod runtime;
pub mod scroll;
pub mod toc;
pub mod topbar;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use content::{Article, Content, Scroller};
pub use controller::Controller;
pub use error::{Result, TocError};
pub use events::{EventBus, TocEvent};
pub use host::{Host, HostEvent, PointerEvent};
pub use placement::{Offset, PanelStyle};
pub use preference::{AutoLoad, Preference};
pub use runtime::TokioScheduler;
pub use toc::{SessionConfig, Toc, TocState};
