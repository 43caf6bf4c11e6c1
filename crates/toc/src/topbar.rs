//! Fixed header ("top bar") detection
//!
//! Probe both top corners of an element that was just scrolled to the top
//! of the viewport. If the topmost element at each corner belongs to the
//! same fixed, z-indexed ancestor, that ancestor's height is the top bar.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dom::{DocumentTree, NodeId, Position};
use stream::{Scheduler, Stream};
use tracing::debug;

pub const MEASURE_THROTTLE: Duration = Duration::from_millis(50);

fn fixed_ancestor<D: DocumentTree>(doc: &D, node: NodeId) -> Option<NodeId> {
    let body = doc.body();
    let mut current = Some(node);
    while let Some(id) = current {
        if Some(id) == body {
            return None;
        }
        let style = doc.computed_style(id);
        if style.position == Position::Fixed && style.z_index.is_some() {
            return Some(id);
        }
        current = doc.parent_element(id);
    }
    None
}

/// Height of the fixed header covering `target`'s top edge, or 0
pub fn measure_topbar<D: DocumentTree>(doc: &D, target: NodeId) -> f64 {
    let rect = doc.bounding_client_rect(target);
    let header_at = |x: f64| {
        doc.element_from_point(x, rect.top() + 1.0)
            .and_then(|hit| fixed_ancestor(doc, hit))
    };

    match (header_at(rect.left() + 1.0), header_at(rect.right() - 1.0)) {
        (Some(left), Some(right)) if left == right => doc.offset_height(left),
        _ => 0.0,
    }
}

/// Running maximum of distinct measurements, starting at 0
pub fn accumulate_topbar(measured: &Stream<f64>) -> Stream<f64> {
    measured
        .unique()
        .scan(|height: &f64, measured: &f64| height.max(*measured), 0.0)
}

/// Throttled measurements of `trigger`'s targets folded into a height that
/// only grows for the lifetime of the graph
pub fn topbar_stream<D: DocumentTree + 'static>(
    trigger: &Stream<NodeId>,
    document: Rc<RefCell<D>>,
    scheduler: Rc<dyn Scheduler>,
) -> Stream<f64> {
    let measured = trigger
        .throttle(MEASURE_THROTTLE, scheduler)
        .map(move |&target| {
            let height = measure_topbar(&*document.borrow(), target);
            debug!(node = target, height, "topbar measured");
            height
        })
        .log("topbarHeightMeasured");
    accumulate_topbar(&measured).log("topbarHeight")
}
