//! Outline session
//!
//! One [`Toc`] per extracted article. Every input (visibility, scroll,
//! resize, mutations, periodic checks, drags) is a stream source and all
//! derived state hangs off the same graph, so a single host event is seen
//! by every consumer exactly once with consistent values.
//!
//! ```text
//! isShown ─┬─ resize ─ periodic ─ mutation ─ refresh
//!          └──────────────┬──────────────────────┘
//!                      content ──┬── activeHeading (+ scroll, topbar)
//!                                ├── panel (+ offset, topbar)
//!                                └── readable → document style / spacer
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use dom::{DocumentMut, DocumentTree, NodeId};
use serde::{Deserialize, Serialize};
use stream::{
    combine4, from_event, from_interval, merge, Disposers, Scheduler, Stream, TaskId, WeakStream,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::active::active_heading_index;
use crate::content::{build_content, is_valid, Content, ARTICLE_CHANGED};
use crate::error::{Result, TocError};
use crate::events::{EventBus, TocEvent};
use crate::host::{Host, HostEvent, MUTATION, RESIZE, SCROLL};
use crate::placement::{wire_drag, Offset, PanelStyle};
use crate::readable::{update_spacer, ReadableMode};
use crate::scroll::{scroll_element, smooth_scroll, FrameSlot, SmoothScroll, MAX_SCROLL_DURATION};
use crate::topbar::topbar_stream;

pub const RESIZE_THROTTLE: Duration = Duration::from_millis(100);
pub const SCROLL_THROTTLE: Duration = Duration::from_millis(16);
pub const MUTATION_DEBOUNCE: Duration = Duration::from_millis(300);
pub const PERIODIC_CHECK: Duration = Duration::from_secs(60);
/// Wait for the host to lay out readable-mode changes before re-measuring
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub id: String,
    pub offset: Offset,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            offset: Offset::default(),
        }
    }
}

/// Read model for a rendering layer
#[derive(Debug, Clone, PartialEq)]
pub struct TocState {
    pub is_shown: bool,
    pub content: Option<Rc<Content>>,
    pub active_heading: usize,
    pub topbar_height: f64,
    pub offset: Offset,
    pub panel: Option<PanelStyle>,
}

/// Readable mode driven by the graph, plus its settle timer
struct ReadableEffect<D> {
    document: Rc<RefCell<D>>,
    scheduler: Rc<dyn Scheduler>,
    mode: RefCell<ReadableMode>,
    settle: Cell<Option<TaskId>>,
    content: WeakStream<Rc<Content>>,
    topbar_height: WeakStream<f64>,
    trigger_content_change: WeakStream<()>,
}

impl<D: DocumentMut + 'static> ReadableEffect<D> {
    fn apply(self: &Rc<Self>, enabled: bool) {
        let Some(content) = self.content.get() else {
            return;
        };
        let topbar_height = self.topbar_height.get().unwrap_or(0.0);
        {
            let mut doc = self.document.borrow_mut();
            let mut mode = self.mode.borrow_mut();
            if enabled {
                mode.enter(&mut *doc, &content, topbar_height);
            } else {
                mode.leave(&mut *doc);
            }
        }
        self.schedule_settle();
    }

    fn schedule_settle(self: &Rc<Self>) {
        self.cancel();
        let effect = Rc::downgrade(self);
        let id = self.scheduler.set_timeout(
            SETTLE_DELAY,
            Box::new(move || {
                if let Some(effect) = effect.upgrade() {
                    effect.settle();
                }
            }),
        );
        self.settle.set(Some(id));
    }

    /// Re-measure after layout, then resize the spacer to the new geometry
    fn settle(&self) {
        self.settle.set(None);
        if let Some(trigger) = self.trigger_content_change.upgrade() {
            trigger.set(());
        }
        if !self.mode.borrow().is_active() {
            return;
        }
        if let Some(content) = self.content.get() {
            let topbar_height = self.topbar_height.get().unwrap_or(0.0);
            update_spacer(&mut *self.document.borrow_mut(), &content, topbar_height);
        }
    }

    fn cancel(&self) {
        if let Some(id) = self.settle.take() {
            self.scheduler.cancel(id);
        }
    }

    fn reset(&self) {
        self.cancel();
        let mut doc = self.document.borrow_mut();
        self.mode.borrow_mut().leave(&mut *doc);
    }
}

pub struct Toc<D: DocumentMut + 'static> {
    config: SessionConfig,
    host: Host<D>,
    bus: EventBus,
    article: NodeId,
    scroller: NodeId,

    trigger_is_shown: Stream<bool>,
    trigger_content_change: Stream<()>,
    trigger_topbar_measure: Stream<NodeId>,

    is_shown: Stream<bool>,
    content: Stream<Rc<Content>>,
    topbar_height: Stream<f64>,
    active_heading: Stream<usize>,
    offset: Stream<Offset>,
    panel: Stream<PanelStyle>,
    redraw: Stream<()>,

    readable: Rc<ReadableEffect<D>>,
    scroll_slot: FrameSlot,
    disposers: Disposers,
    disposed: Cell<bool>,
}

impl<D: DocumentMut + 'static> Toc<D> {
    pub fn new(
        host: Host<D>,
        bus: EventBus,
        article: NodeId,
        config: SessionConfig,
    ) -> Result<Self> {
        let scroller = {
            let doc = host.document.borrow();
            if !doc.is_connected(article) {
                return Err(TocError::ArticleDetached);
            }
            scroll_element(&*doc, article)
        };
        let scheduler = Rc::clone(&host.scheduler);
        let disposers = Disposers::new();
        let invalidated = Rc::new(Cell::new(false));

        //-------------- Triggers --------------
        let trigger_topbar_measure: Stream<NodeId> = Stream::new().log("triggerTopbarMeasure");
        let trigger_content_change = Stream::with_value(()).log("triggerContentChange");
        let trigger_is_shown: Stream<bool> = Stream::new().log("triggerIsShown");
        let (periodic, dispose) = from_interval(&scheduler, PERIODIC_CHECK);
        disposers.add(dispose);

        //-------------- Sources --------------
        let is_shown = trigger_is_shown.unique().log("isShown");
        let topbar_height = topbar_stream(
            &trigger_topbar_measure,
            Rc::clone(&host.document),
            Rc::clone(&scheduler),
        );

        let (resize_events, dispose) = from_event(&host.events, RESIZE);
        disposers.add(dispose);
        let resize = resize_events
            .map(|_| ())
            .throttle(RESIZE_THROTTLE, Rc::clone(&scheduler))
            .log("resize");

        let (mutation_events, dispose) = from_event(&host.events, MUTATION);
        disposers.add(dispose);
        let mutation = mutation_events
            .map(|_| ())
            .debounce(MUTATION_DEBOUNCE, Rc::clone(&scheduler))
            .log("mutation");

        let is_document_scroller = host.document.borrow().is_document_scroller(scroller);
        let scroll_target = (!is_document_scroller).then_some(scroller);
        let (scroll_events, dispose) = from_event(&host.events, SCROLL);
        disposers.add(dispose);
        let scroll = scroll_events
            .filter(move |event| {
                matches!(event, HostEvent::Scroll { target } if *target == scroll_target)
            })
            .map(|_| ())
            .throttle(SCROLL_THROTTLE, Rc::clone(&scheduler))
            .starts_with(())
            .log("scroll");

        //-------------- Content --------------
        let shown = is_shown.downgrade();
        let gate = Rc::clone(&invalidated);
        let document = Rc::clone(&host.document);
        let measured = merge(&[
            trigger_content_change.clone(),
            is_shown.map(|_| ()),
            resize,
            periodic,
            mutation,
        ])
        .filter(move |_| shown.get() == Some(true) && !gate.get())
        .map(move |_| Rc::new(build_content(&mut *document.borrow_mut(), article, scroller)));

        let document = Rc::clone(&host.document);
        let gate = Rc::clone(&invalidated);
        let errors = bus.clone();
        let session_id = config.id.clone();
        let content = measured
            .filter(move |content| {
                if is_valid(&*document.borrow(), content) {
                    return true;
                }
                if !gate.replace(true) {
                    warn!(session = %session_id, "{ARTICLE_CHANGED}");
                    errors.publish(TocEvent::Error {
                        session_id: session_id.clone(),
                        reason: ARTICLE_CHANGED.to_string(),
                    });
                }
                false
            })
            .log("content");

        //-------------- Derived --------------
        let document = Rc::clone(&host.document);
        let active_heading = combine4(&content, &topbar_height, &scroll, &is_shown)
            .filter(|(_, _, _, shown)| *shown)
            .map(move |(content, topbar_height, _, _)| {
                let scroll_top = document.borrow().scroll_metrics(content.scroller.node).scroll_top;
                active_heading_index(content, scroll_top, *topbar_height)
            })
            .log("activeHeading");

        let offset = Stream::with_value(config.offset).log("offset");

        let document = Rc::clone(&host.document);
        let panel = combine4(&content, &offset, &topbar_height, &is_shown)
            .filter(|(_, _, _, shown)| *shown)
            .map(move |(content, offset, topbar_height, _)| {
                let viewport_height = document.borrow().viewport().height;
                PanelStyle::compute(content, *offset, *topbar_height, viewport_height)
            })
            .log("panel");

        let readable = combine4(
            &is_shown.unique(),
            &content.map(|c| c.article.height).unique(),
            &content.map(|c| c.scroller.rect.height).unique(),
            &content.map(|c| c.headings.len()).unique(),
        )
        .map(|(shown, _, _, _)| *shown)
        .log("readable");

        let visible = is_shown.downgrade();
        let changed = merge(&[
            offset.map(|_| ()),
            content.map(|_| ()),
            active_heading.map(|_| ()),
            topbar_height.map(|_| ()),
        ])
        .filter(move |_| visible.get() == Some(true));
        let redraw = merge(&[is_shown.map(|_| ()), changed]).log("redraw");

        //-------------- Effects --------------
        let effect = Rc::new(ReadableEffect {
            document: Rc::clone(&host.document),
            scheduler: Rc::clone(&scheduler),
            mode: RefCell::new(ReadableMode::new()),
            settle: Cell::new(None),
            content: content.downgrade(),
            topbar_height: topbar_height.downgrade(),
            trigger_content_change: trigger_content_change.downgrade(),
        });
        let handle = Rc::clone(&effect);
        readable.listen(move |&enabled| handle.apply(enabled));

        let lifecycle = bus.clone();
        let session_id = config.id.clone();
        is_shown.listen(move |&shown| {
            let session_id = session_id.clone();
            lifecycle.publish(if shown {
                TocEvent::Shown { session_id }
            } else {
                TocEvent::Hidden { session_id }
            });
        });

        let drag = wire_drag(
            &host.events,
            &offset,
            &is_shown,
            FrameSlot::new(Rc::clone(&scheduler)),
        );
        disposers.add(Box::new(move || drag.dispose_all()));

        info!(session = %config.id, article, scroller, "outline session created");
        bus.publish(TocEvent::Started {
            session_id: config.id.clone(),
        });

        Ok(Self {
            scroll_slot: FrameSlot::new(scheduler),
            config,
            host,
            bus,
            article,
            scroller,
            trigger_is_shown,
            trigger_content_change,
            trigger_topbar_measure,
            is_shown,
            content,
            topbar_height,
            active_heading,
            offset,
            panel,
            redraw,
            readable: effect,
            disposers,
            disposed: Cell::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn article(&self) -> NodeId {
        self.article
    }

    pub fn scroller(&self) -> NodeId {
        self.scroller
    }

    pub fn is_shown(&self) -> bool {
        self.is_shown.get().unwrap_or(false)
    }

    pub fn show(&self) {
        self.trigger_is_shown.set(true);
    }

    pub fn hide(&self) {
        self.trigger_is_shown.set(false);
    }

    pub fn toggle(&self) {
        if self.is_shown() {
            self.hide();
        } else {
            self.show();
        }
    }

    /// Re-run heading extraction and re-measure everything
    pub fn refresh(&self) {
        self.trigger_content_change.set(());
    }

    pub fn next(&self) {
        let Some(content) = self.content.get() else {
            return;
        };
        let active = self.active_heading.get().unwrap_or(0);
        let last = content.headings.len().saturating_sub(1);
        self.scroll_to_heading((active + 1).min(last));
    }

    pub fn prev(&self) {
        let active = self.active_heading.get().unwrap_or(0);
        self.scroll_to_heading(active.saturating_sub(1));
    }

    /// Smoothly bring heading `index` just below the top bar
    ///
    /// Arriving there measures the top bar if none has been seen yet.
    pub fn scroll_to_heading(&self, index: usize) {
        let Some(content) = self.content.get() else {
            return;
        };
        let Some(heading) = content.headings.get(index) else {
            debug!(index, "no heading to scroll to");
            return;
        };

        let target = heading.node;
        let options = SmoothScroll {
            target,
            scroller: content.scroller.node,
            top_margin: self.topbar_height.get().unwrap_or(0.0),
            max_duration: MAX_SCROLL_DURATION,
        };
        let topbar_height = self.topbar_height.downgrade();
        let trigger = self.trigger_topbar_measure.downgrade();
        smooth_scroll(&self.host, &self.scroll_slot, options, move || {
            if topbar_height.get().unwrap_or(0.0) == 0.0 {
                if let Some(trigger) = trigger.upgrade() {
                    trigger.set(target);
                }
            }
        });
    }

    pub fn state(&self) -> TocState {
        TocState {
            is_shown: self.is_shown(),
            content: self.content.get(),
            active_heading: self.active_heading.get().unwrap_or(0),
            topbar_height: self.topbar_height.get().unwrap_or(0.0),
            offset: self.current_offset(),
            panel: self.panel.get(),
        }
    }

    /// Drag offset as it stands now, for writing back to preferences
    pub fn current_offset(&self) -> Offset {
        self.offset.get().unwrap_or(self.config.offset)
    }

    pub fn content(&self) -> &Stream<Rc<Content>> {
        &self.content
    }

    pub fn active_heading(&self) -> &Stream<usize> {
        &self.active_heading
    }

    pub fn topbar_height(&self) -> &Stream<f64> {
        &self.topbar_height
    }

    pub fn offset(&self) -> &Stream<Offset> {
        &self.offset
    }

    pub fn panel(&self) -> &Stream<PanelStyle> {
        &self.panel
    }

    /// Fires once per host event that changed anything a renderer shows
    pub fn redraw(&self) -> &Stream<()> {
        &self.redraw
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Hide, restore the document and detach from the host
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.hide();
        self.scroll_slot.cancel();
        self.readable.reset();
        self.disposers.dispose_all();
        self.trigger_is_shown.clear();
        self.trigger_content_change.clear();
        self.trigger_topbar_measure.clear();

        info!(session = %self.config.id, "outline session disposed");
        self.bus.publish(TocEvent::Disposed {
            session_id: self.config.id.clone(),
        });
    }
}
