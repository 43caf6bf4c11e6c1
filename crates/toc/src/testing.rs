//! Page fixtures shared by the unit tests

use dom::{DocumentTree, DomArena, DomService, NodeId};
use serde_json::{json, Value};

pub struct PageIds {
    pub html: NodeId,
    pub body: NodeId,
    pub article: NodeId,
    pub headings: Vec<NodeId>,
    pub header: Option<NodeId>,
}

fn node(tag: &str, attrs: Value, rect: [f64; 4], children: Vec<Value>) -> Value {
    json!({
        "nodeName": tag,
        "attributes": attrs,
        "bounds": { "x": rect[0], "y": rect[1], "width": rect[2], "height": rect[3] },
        "children": children,
    })
}

/// 1200x800 viewport, an `<article>` at y=100 with one `<h2>` per offset
/// (relative to the article top)
pub fn article_page(offsets: &[f64]) -> (DomArena, PageIds) {
    build(offsets, None)
}

/// Same page with a fixed, z-indexed header of the given height
pub fn article_page_with_topbar(offsets: &[f64], topbar: f64) -> (DomArena, PageIds) {
    build(offsets, Some(topbar))
}

/// Page with `offsets` headings whose body also holds an iframe at `frame`
/// showing a page with `frame_offsets` headings
pub fn framed_page(offsets: &[f64], frame: [f64; 4], frame_offsets: &[f64]) -> DomArena {
    let mut iframe = node("iframe", json!({}), frame, vec![]);
    iframe["contentDocument"] = snapshot(frame_offsets, None);

    let mut top = snapshot(offsets, None);
    if let Some(body) = top["root"]["children"][0]["children"].as_array_mut() {
        body.push(iframe);
    }
    parse(&top)
}

fn parse(snapshot: &Value) -> DomArena {
    let mut service = DomService::new();
    service.parse_snapshot(snapshot).expect("valid fixture");
    service.into_arena()
}

fn snapshot(offsets: &[f64], topbar: Option<f64>) -> Value {
    let last = offsets.iter().copied().fold(0.0, f64::max);
    let article_height = last + 400.0;
    let page_height = 100.0 + article_height + 100.0;

    let headings: Vec<Value> = offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| {
            node(
                "h2",
                json!({}),
                [200.0, 100.0 + offset, 800.0, 30.0],
                vec![json!(format!("Section {}", i + 1))],
            )
        })
        .collect();

    let mut body = Vec::new();
    if let Some(height) = topbar {
        body.push(node(
            "header",
            json!({ "style": "position: fixed; z-index: 10" }),
            [0.0, 0.0, 1200.0, height],
            vec![node("a", json!({ "href": "/" }), [10.0, 10.0, 100.0, 20.0], vec![json!("Home")])],
        ));
    }
    body.push(node("article", json!({}), [200.0, 100.0, 800.0, article_height], headings));

    json!({
        "viewport": { "width": 1200, "height": 800 },
        "root": node("html", json!({}), [0.0, 0.0, 1200.0, page_height], vec![
            node("body", json!({}), [0.0, 0.0, 1200.0, page_height], body)
        ]),
    })
}

fn build(offsets: &[f64], topbar: Option<f64>) -> (DomArena, PageIds) {
    let arena = parse(&snapshot(offsets, topbar));

    let ids = PageIds {
        html: arena.document_element().expect("html"),
        body: arena.body().expect("body"),
        article: arena.find_by_tag("article")[0],
        headings: arena.find_by_tag("h2"),
        header: arena.find_by_tag("header").first().copied(),
    };
    (arena, ids)
}
