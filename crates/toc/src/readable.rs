//! Readable mode: a comfortable line length for the article and a trailing
//! spacer so the last heading can be scrolled up to the visible top

use dom::utils::{between, px};
use dom::{BoxSizing, DocumentMut, DocumentTree, NodeId};
use tracing::{debug, warn};

use crate::content::Content;

pub const SPACER_ID: &str = "toc-reading-spacer";
/// Characters per line, in units of the font size
const READING_MEASURE: f64 = 66.0;

/// Reversible article styling owned by one session
#[derive(Debug, Default)]
pub struct ReadableMode {
    /// Article and the inline style it had before we touched it
    original: Option<(NodeId, String)>,
}

impl ReadableMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.original.is_some()
    }

    pub fn enter<D: DocumentMut>(&mut self, doc: &mut D, content: &Content, topbar_height: f64) {
        self.apply_readable_style(doc, content.article.node);
        update_spacer(doc, content, topbar_height);
    }

    pub fn leave<D: DocumentMut>(&mut self, doc: &mut D) {
        if let Some((article, style)) = self.original.take() {
            doc.set_inline_style(article, &style);
            debug!(article, "readable style removed");
        }
        if let Some(spacer) = doc.get_element_by_id(SPACER_ID) {
            if let Err(error) = doc.remove(spacer) {
                warn!(%error, "reading spacer could not be removed");
            }
        }
    }

    fn apply_readable_style<D: DocumentMut>(&mut self, doc: &mut D, article: NodeId) {
        if self.original.is_some() {
            return;
        }
        let original = doc.attr(article, "style").unwrap_or_default().to_string();
        self.original = Some((article, original));

        let computed = doc.computed_style(article);
        let mut width = between(12.0, computed.font_size, 16.0) * READING_MEASURE;
        if computed.box_sizing == BoxSizing::BorderBox {
            width += computed.padding_left + computed.padding_right;
        }

        let max_width = px(width);
        let mut declarations = vec![("max-width", max_width.as_str())];
        if computed.margin_left == 0.0 && computed.margin_right == 0.0 {
            declarations.push(("margin-left", "auto"));
            declarations.push(("margin-right", "auto"));
        }
        doc.apply_style(article, &declarations);
        debug!(article, width, "readable style applied");
    }
}

/// Size (creating it if needed) the spacer at the end of the scroller.
/// Returns the new spacer height.
pub fn update_spacer<D: DocumentMut>(doc: &mut D, content: &Content, topbar_height: f64) -> f64 {
    let scroller = &content.scroller;
    let Some(lowest) = content
        .headings
        .iter()
        .filter_map(|heading| heading.offset_from_article_top)
        .reduce(f64::max)
    else {
        return 0.0;
    };

    let existing = doc
        .get_element_by_id(SPACER_ID)
        .filter(|&spacer| doc.contains(scroller.node, spacer));
    let old_height = existing.map(|spacer| doc.offset_height(spacer)).unwrap_or(0.0);

    // top of the lowest heading when scrolled all the way down, without spacer
    let scroll_height = doc.scroll_metrics(scroller.node).scroll_height;
    let lowest_top = scroller.rect.bottom() - (scroll_height - old_height)
        + content.article.offset_from_scroller_top
        + lowest;
    let visible_top = topbar_height.max(scroller.rect.top());
    let needed = (lowest_top - visible_top).max(0.0);

    let spacer = match existing {
        Some(spacer) => Some(spacer),
        None => doc.append_block(scroller.node, "div", SPACER_ID),
    };
    if let Some(spacer) = spacer {
        doc.set_block_height(spacer, needed);
    }
    debug!(height = needed, "reading spacer sized");
    needed
}
