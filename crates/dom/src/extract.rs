//! Heuristic article and heading extraction
//!
//! Both passes are pure reads over a [`DocumentTree`]; the same tree and
//! visibility state always give the same result.

use ahash::AHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::document::{DocumentMut, DocumentTree};
use crate::selector::Selector;
use crate::types::NodeId;

const HEADING_WEIGHTS: [f64; 7] = [0.0, 100.0, 60.0, 40.0, 30.0, 25.0, 22.0];
const CONTAINER_BONUS: [f64; 1] = [500.0];
const CONTENT_BONUS: [f64; 1] = [101.0];
const PENALTY: [f64; 3] = [-500.0, -100.0, -50.0];

/// Candidates narrower than this are sidebars
const NARROW_WIDTH: f64 = 400.0;
const CANDIDATES: usize = 5;
const NARROW_PARENT_FACTOR: f64 = 0.7;

/// Heading kinds in order, with their per-element weight
const HEADING_KINDS: [(&str, f64); 7] = [
    ("h1", 4.0),
    ("h2", 9.0),
    ("h3", 9.0),
    ("h4", 10.0),
    ("h5", 10.0),
    ("h6", 10.0),
    ("strong", 5.0),
];
const HEADING_KIND_FLOOR: f64 = 10.0;
const MAX_HEADING_LEVELS: usize = 3;
const MIN_ALIGNED_STRONG: usize = 3;

/// Prefix for synthesized heading anchors
pub const ANCHOR_PREFIX: &str = "toc-anchor-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub node: NodeId,
    /// 1..=3
    pub level: u8,
    pub text: String,
    /// Position in document order within one extraction
    pub id: usize,
    pub anchor: Option<String>,
    /// Filled in when content geometry is measured
    pub offset_from_article_top: Option<f64>,
}

/// Selector → weight by ancestor distance (0 = the element itself)
fn article_tag_weights() -> Vec<(&'static str, Vec<f64>)> {
    let scaled = |factor: f64| HEADING_WEIGHTS.iter().map(|w| w * factor).collect::<Vec<_>>();
    let mut table = vec![
        ("h1", scaled(0.4)),
        ("h2", scaled(1.0)),
        ("h3", scaled(0.5)),
        ("h4", scaled(0.25)),
        ("h5", scaled(0.125)),
        ("strong", scaled(0.125)),
        ("h6", scaled(0.0625)),
        ("article", CONTAINER_BONUS.to_vec()),
        (".article", CONTAINER_BONUS.to_vec()),
        ("#article", CONTAINER_BONUS.to_vec()),
        (".content", CONTENT_BONUS.to_vec()),
    ];
    for selector in [
        "sidebar",
        ".sidebar",
        "#sidebar",
        "aside",
        ".aside",
        "#aside",
        "nav",
        ".nav",
        ".navigation",
        ".toc",
        ".table-of-contents",
        ".comment",
    ] {
        table.push((selector, PENALTY.to_vec()));
    }
    table
}

/// Elements of a bold-inline group that share one left edge, or nothing
/// when the group is not column-aligned
fn aligned_strong<D: DocumentTree>(doc: &D, elems: Vec<NodeId>) -> Vec<NodeId> {
    if elems.is_empty() {
        return elems;
    }
    let lefts: Vec<f64> = elems
        .iter()
        .map(|&id| doc.bounding_client_rect(id).left())
        .collect();

    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &left in &lefts {
        match counts.iter_mut().find(|(l, _)| *l == left) {
            Some((_, count)) => *count += 1,
            None => counts.push((left, 1)),
        }
    }

    let limit = (0.3 * elems.len() as f64).ceil() as usize;
    if counts.len() > limit {
        return Vec::new();
    }
    let Some(&(common_left, shared)) = counts
        .iter()
        .fold(None, |best: Option<&(f64, usize)>, c| match best {
            Some(b) if b.1 >= c.1 => Some(b),
            _ => Some(c),
        })
    else {
        return Vec::new();
    };
    if common_left > doc.viewport().width / 2.0 || shared < MIN_ALIGNED_STRONG {
        return Vec::new();
    }

    elems
        .into_iter()
        .zip(lefts)
        .filter(|(_, left)| *left == common_left)
        .map(|(id, _)| id)
        .collect()
}

/// Pick the element most likely to be the main article
pub fn extract_article<D: DocumentTree>(doc: &D) -> Option<NodeId> {
    let root = doc.root()?;

    // pass 1: score ancestors of every weighted element
    let mut scores: AHashMap<NodeId, f64> = AHashMap::new();
    let mut seen: Vec<NodeId> = Vec::new();
    for (selector, weights) in article_tag_weights() {
        let Ok(parsed) = Selector::parse(selector) else {
            continue;
        };
        let mut elems = doc.query_selector_all(root, &parsed);
        if selector == "strong" {
            elems = aligned_strong(doc, elems);
        }
        for elem in elems {
            let mut current = Some(elem);
            for weight in &weights {
                let Some(id) = current else { break };
                let score = scores.entry(id).or_insert_with(|| {
                    seen.push(id);
                    0.0
                });
                *score += weight;
                current = doc.parent_element(id);
            }
        }
    }

    let mut ranked: Vec<(NodeId, f64)> = seen.iter().map(|id| (*id, scores[id])).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(CANDIDATES);

    // pass 2: demote narrow candidates and the candidates containing them
    let narrow: Vec<NodeId> = ranked
        .iter()
        .filter(|(id, _)| doc.scroll_metrics(*id).scroll_width < NARROW_WIDTH)
        .map(|(id, _)| *id)
        .collect();
    for narrow_id in narrow {
        for (id, score) in ranked.iter_mut() {
            if *id == narrow_id {
                *score = 0.0;
            } else if doc.contains(*id, narrow_id) {
                *score *= NARROW_PARENT_FACTOR;
            }
        }
    }

    let mut reweighted: Vec<(NodeId, f64)> = ranked
        .into_iter()
        .map(|(id, score)| {
            let height = doc.scroll_metrics(id).scroll_height;
            let links = doc
                .descendants(id)
                .into_iter()
                .filter(|&d| doc.tag_name(d) == Some("a"))
                .count()
                .max(1);
            let score = score * (height * height / links as f64).ln();
            trace!(node = id, score, "article candidate");
            (id, if score.is_finite() { score } else { f64::NEG_INFINITY })
        })
        .collect();
    reweighted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let article = reweighted.first().map(|(id, _)| *id);
    debug!(?article, "article extracted");
    article
}

/// First element matching a site-specific selector, else the heuristic
pub fn extract_article_with<D: DocumentTree>(
    doc: &D,
    selector: Option<&Selector>,
) -> Option<NodeId> {
    if let (Some(selector), Some(root)) = (selector, doc.root()) {
        if let Some(found) = doc.query_selector(root, selector) {
            debug!(%selector, node = found, "article from site selector");
            return Some(found);
        }
    }
    extract_article(doc)
}

struct HeadingGroup {
    tag: &'static str,
    elems: Vec<NodeId>,
    score: f64,
}

/// Headings of `article` in document order, at most three levels deep
pub fn extract_headings<D: DocumentTree>(doc: &D, article: NodeId) -> Vec<Heading> {
    let descendants = doc.descendants(article);

    let mut groups: Vec<HeadingGroup> = HEADING_KINDS
        .iter()
        .map(|&(tag, weight)| {
            let mut elems: Vec<NodeId> = descendants
                .iter()
                .copied()
                .filter(|&id| doc.tag_name(id) == Some(tag))
                .collect();
            if tag == "strong" {
                elems = aligned_strong(doc, elems);
            }
            let score = elems.len() as f64 * weight;
            HeadingGroup { tag, elems, score }
        })
        .filter(|group| group.score >= HEADING_KIND_FLOOR && !group.elems.is_empty())
        .filter(|group| {
            let visible = group.elems.iter().filter(|&&id| doc.is_rendered(id)).count();
            visible as f64 >= group.elems.len() as f64 * 0.5
        })
        .collect();

    if groups.len() > MAX_HEADING_LEVELS {
        let mut by_score: Vec<usize> = (0..groups.len()).collect();
        by_score.sort_by(|&a, &b| groups[b].score.total_cmp(&groups[a].score));
        by_score.truncate(MAX_HEADING_LEVELS);
        by_score.sort_unstable();
        let mut index = 0;
        groups.retain(|_| {
            let keep = by_score.contains(&index);
            index += 1;
            keep
        });
    }

    let mut headings = Vec::new();
    for id in descendants {
        let Some(tag) = doc.tag_name(id) else { continue };
        let Some(level) = groups.iter().position(|g| g.tag == tag) else {
            continue;
        };
        if !groups[level].elems.contains(&id) || !doc.is_rendered(id) {
            continue;
        }
        headings.push(Heading {
            node: id,
            level: level as u8 + 1,
            text: doc.text_content(id),
            id: headings.len(),
            anchor: anchor_of(doc, id),
            offset_from_article_top: None,
        });
    }
    debug!(
        count = headings.len(),
        kinds = ?groups.iter().map(|g| g.tag).collect::<Vec<_>>(),
        "headings extracted"
    );
    headings
}

/// Own id, else the fragment (or id) of the first link inside
fn anchor_of<D: DocumentTree>(doc: &D, node: NodeId) -> Option<String> {
    if let Some(id) = doc.attr(node, "id").filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    doc.descendants(node)
        .into_iter()
        .filter(|&d| doc.tag_name(d) == Some("a"))
        .find_map(|link| {
            let href = doc.attr(link, "href").unwrap_or("");
            let anchor = match href.strip_prefix('#') {
                Some(fragment) => fragment,
                None => doc.attr(link, "id").unwrap_or(""),
            };
            (!anchor.is_empty()).then(|| anchor.to_string())
        })
}

/// Give a heading without an anchor a synthesized id, written back onto
/// its element so the next extraction finds the same anchor
pub fn ensure_anchor<D: DocumentMut>(doc: &mut D, heading: &mut Heading) -> String {
    if let Some(anchor) = &heading.anchor {
        return anchor.clone();
    }
    let mut n = heading.id;
    let anchor = loop {
        let candidate = format!("{ANCHOR_PREFIX}{n}");
        if doc.get_element_by_id(&candidate).is_none() {
            break candidate;
        }
        n += 1;
    };
    doc.set_attr(heading.node, "id", &anchor);
    heading.anchor = Some(anchor.clone());
    anchor
}
