//! Content snapshots: article, scroller and measured headings
//!
//! A snapshot is rebuilt wholesale on every trigger and never patched.

use dom::{ensure_anchor, extract_headings, DocumentMut, DocumentTree, DomRect, Heading, NodeId};
use serde::Serialize;
use tracing::warn;

pub const ARTICLE_CHANGED: &str = "Article Changed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub node: NodeId,
    /// Distance from the scroller's content top, independent of scrolling
    pub offset_from_scroller_top: f64,
    pub left: f64,
    pub right: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scroller {
    pub node: NodeId,
    /// Viewport rect for the document scroller
    pub rect: DomRect,
    pub is_document: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub article: Article,
    pub scroller: Scroller,
    pub headings: Vec<Heading>,
}

impl Content {
    /// On-screen top of a heading at scroll offset `scroll_top`
    pub fn heading_top(&self, heading: &Heading, scroll_top: f64) -> f64 {
        self.scroller.rect.top() - scroll_top
            + self.article.offset_from_scroller_top
            + heading.offset_from_article_top.unwrap_or(0.0)
    }
}

/// Measure article, scroller and a fresh heading pass
///
/// Headings without an anchor get one written onto their element.
pub fn build_content<D: DocumentMut>(doc: &mut D, article: NodeId, scroller: NodeId) -> Content {
    let article_rect = doc.bounding_client_rect(article);
    let is_document = doc.is_document_scroller(scroller);
    let scroller_rect = if is_document {
        doc.viewport().rect()
    } else {
        doc.bounding_client_rect(scroller)
    };
    let scroll_top = doc.scroll_metrics(scroller).scroll_top;

    let mut headings = extract_headings(&*doc, article);
    for heading in headings.iter_mut() {
        ensure_anchor(doc, heading);
        let top = doc.bounding_client_rect(heading.node).top();
        heading.offset_from_article_top = Some(top - article_rect.top());
    }

    Content {
        article: Article {
            node: article,
            offset_from_scroller_top: if article == scroller {
                0.0
            } else {
                article_rect.top() - scroller_rect.top() + scroll_top
            },
            left: article_rect.left(),
            right: article_rect.right(),
            height: article_rect.height,
        },
        scroller: Scroller {
            node: scroller,
            rect: scroller_rect,
            is_document,
        },
        headings,
    }
}

/// Scroller still attached, article inside it, headings inside the article
pub fn is_valid<D: DocumentTree>(doc: &D, content: &Content) -> bool {
    let scroller = content.scroller.node;
    let article = content.article.node;

    let scroller_valid = doc
        .document_element()
        .is_some_and(|html| doc.contains(html, scroller));
    let article_valid = doc.contains(scroller, article);
    let headings_valid = match (content.headings.first(), content.headings.last()) {
        (Some(first), Some(last)) => {
            doc.contains(article, first.node) && doc.contains(article, last.node)
        }
        _ => false,
    };

    let valid = scroller_valid && article_valid && headings_valid;
    if !valid {
        warn!(
            scroller_valid,
            article_valid,
            headings_valid,
            "content no longer matches the document"
        );
    }
    valid
}
