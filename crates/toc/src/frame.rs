//! Which document to outline when a page is mostly one big iframe
//!
//! Iframes are collected through every reachable frame document. The
//! largest one wins when it covers more than [`FRAME_AREA_RATIO`] of the
//! top document element; frames without a reachable document are counted
//! but can only ever leave the top document in place.

use std::cell::RefCell;
use std::rc::Rc;

use dom::DocumentTree;

pub const FRAME_AREA_RATIO: f64 = 0.5;

struct Frame<D> {
    area: f64,
    document: Option<Rc<RefCell<D>>>,
}

fn area<D: DocumentTree>(doc: &D, node: dom::NodeId) -> f64 {
    doc.bounding_client_rect(node).width * doc.offset_height(node)
}

fn collect<D: DocumentTree>(document: &Rc<RefCell<D>>, out: &mut Vec<Frame<D>>) {
    let found: Vec<Frame<D>> = {
        let doc = document.borrow();
        let Some(root) = doc.root() else {
            return;
        };
        doc.descendants(root)
            .into_iter()
            .filter(|&id| doc.tag_name(id) == Some("iframe"))
            .map(|id| Frame {
                area: area(&*doc, id),
                document: doc.frame_document(id),
            })
            .collect()
    };

    for frame in found {
        let nested = frame.document.clone();
        out.push(frame);
        if let Some(nested) = nested {
            collect(&nested, out);
        }
    }
}

/// The document to outline: `top`, or the frame document covering most of it
pub fn content_document<D: DocumentTree>(top: &Rc<RefCell<D>>) -> Rc<RefCell<D>> {
    let mut frames = Vec::new();
    collect(top, &mut frames);

    // first of the largest, like a stable sort by descending area
    let Some(largest) = frames
        .into_iter()
        .reduce(|best, frame| if frame.area > best.area { frame } else { best })
    else {
        return Rc::clone(top);
    };

    let root_area = {
        let doc = top.borrow();
        doc.document_element().map(|html| area(&*doc, html)).unwrap_or(0.0)
    };
    match largest.document {
        Some(document) if largest.area > root_area * FRAME_AREA_RATIO => document,
        _ => Rc::clone(top),
    }
}
