//! Controller: owns at most one outline session per page
//!
//! Hosts feed it commands and call [`Controller::pump`] after their event
//! loop turns. A session that reports drifted content is disposed and the
//! page is extracted again, once per reported error.
//!
//! Each start outlines the document picked by [`content_document`], so a
//! page that is mostly one iframe is outlined inside that frame.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use dom::{extract_article_with, extract_headings, DocumentMut, NodeId};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use url::Url;

use crate::command::Command;
use crate::error::{Result, TocError};
use crate::events::{EventBus, TocEvent};
use crate::frame::content_document;
use crate::host::Host;
use crate::preference::{AutoLoad, Preference};
use crate::toc::{SessionConfig, Toc};

pub const NOTHING_TO_OUTLINE: &str = "No article with headings was found on this page";
pub const USAGE_TIP: &str =
    "Toggle shows or hides the outline; next and prev jump between headings";

pub struct Controller<D: DocumentMut + 'static> {
    host: Host<D>,
    /// Host of the outlined document, `host` unless a frame took over
    content: Host<D>,
    preference: Preference,
    url: Option<Url>,
    bus: EventBus,
    rx: broadcast::Receiver<TocEvent>,
    toc: Option<Toc<D>>,
    tip_shown: bool,
}

impl<D: DocumentMut + 'static> Controller<D> {
    /// Create a controller for the page at `page_url`
    ///
    /// Starts right away when the preference asks for it.
    pub fn new(host: Host<D>, preference: Preference, page_url: Option<&str>) -> Result<Self> {
        let url = page_url.map(Url::parse).transpose()?;
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let mut controller = Self {
            content: host.clone(),
            host,
            preference,
            url,
            bus,
            rx,
            toc: None,
            tip_shown: false,
        };
        if controller.preference.auto_load == AutoLoad::OnLoad {
            controller.start()?;
        }
        Ok(controller)
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn toc(&self) -> Option<&Toc<D>> {
        self.toc.as_ref()
    }

    /// Current preferences, with the live drag offset when it is remembered
    pub fn preference(&self) -> Preference {
        let mut preference = self.preference.clone();
        if let (true, Some(toc)) = (preference.remember_position, &self.toc) {
            preference.offset = toc.current_offset();
        }
        preference
    }

    /// Host the outline lives in; a frame document gets its own
    pub fn content_host(&self) -> &Host<D> {
        &self.content
    }

    fn select_content(&self) -> Host<D> {
        let document = content_document(&self.host.document);
        if Rc::ptr_eq(&document, &self.content.document) {
            return self.content.clone();
        }
        if Rc::ptr_eq(&document, &self.host.document) {
            return self.host.clone();
        }
        debug!("outlining the largest frame");
        Host::shared(document, Rc::clone(&self.host.scheduler))
    }

    fn find_article(&self, host: &Host<D>) -> Option<NodeId> {
        let selector = self.url.as_ref().and_then(|url| self.preference.selector_for(url));
        let doc = host.document.borrow();
        let article = extract_article_with(&*doc, selector.as_ref())?;
        let headings = extract_headings(&*doc, article);
        debug!(article, headings = headings.len(), "extracted");
        (!headings.is_empty()).then_some(article)
    }

    /// Extract and show a fresh session
    ///
    /// The current session is only replaced once the new extraction has
    /// found something to outline.
    pub fn start(&mut self) -> Result<()> {
        let content = self.select_content();
        let Some(article) = self.find_article(&content) else {
            info!("nothing to outline");
            self.bus.publish(TocEvent::Notice {
                message: NOTHING_TO_OUTLINE.to_string(),
            });
            return Ok(());
        };

        self.dispose_session();
        let config = SessionConfig {
            offset: self.preference.initial_offset(),
            ..SessionConfig::default()
        };
        let toc = Toc::new(content.clone(), self.bus.clone(), article, config)?;
        self.content = content;
        toc.show();
        self.toc = Some(toc);

        if self.preference.show_tip && !self.tip_shown {
            self.tip_shown = true;
            self.bus.publish(TocEvent::Tip {
                message: USAGE_TIP.to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        let Some(toc) = self.toc.as_ref() else {
            return self.start();
        };
        match command {
            Command::Toggle => toc.toggle(),
            Command::Show => toc.show(),
            Command::Hide => toc.hide(),
            Command::Next => toc.next(),
            Command::Prev => toc.prev(),
            Command::Refresh => toc.refresh(),
        }
        Ok(())
    }

    /// Run a command; any error or panic becomes `false`
    pub fn dispatch(&mut self, command: Command) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.apply(command)))
            .unwrap_or_else(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(TocError::Panicked(message))
            });

        match outcome {
            Ok(()) => true,
            Err(error) => {
                warn!(%command, %error, "command failed");
                false
            }
        }
    }

    /// Parse and run a command by name
    pub fn dispatch_str(&mut self, name: &str) -> bool {
        match name.parse::<Command>() {
            Ok(command) => self.dispatch(command),
            Err(error) => {
                warn!(%error, "command rejected");
                false
            }
        }
    }

    /// Handle session errors published since the last call
    ///
    /// Returns how many times the outline was restarted. Errors raised by
    /// a restarted session wait for the next call.
    pub fn pump(&mut self) -> usize {
        let mut pending = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => pending.push(event),
                Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "event receiver lagged"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        let mut restarts = 0;
        for event in pending {
            let TocEvent::Error { session_id, reason } = event else {
                continue;
            };
            let current = self.toc.as_ref().map(|toc| toc.id() == session_id);
            if current != Some(true) {
                continue;
            }
            info!(session = %session_id, %reason, "restarting outline");
            self.dispose_session();
            match self.start() {
                Ok(()) => restarts += 1,
                Err(error) => warn!(%error, "restart failed"),
            }
        }
        restarts
    }

    fn dispose_session(&mut self) {
        if let Some(toc) = self.toc.take() {
            if self.preference.remember_position {
                self.preference.offset = toc.current_offset();
            }
            toc.dispose();
        }
    }

    pub fn dispose(&mut self) {
        self.dispose_session();
    }
}
