//! Read/write capabilities the outline core needs from a document
//!
//! [`DocumentTree`] is the read side: structure, text, styles and layout
//! geometry in viewport (client) coordinates. [`DocumentMut`] adds the few
//! mutations the core performs itself. [`DomArena`] implements both.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::DomArena;
use crate::error::Result;
use crate::selector::Selector;
use crate::types::{
    ComputedStyle, DomNode, DomRect, NodeId, NodeType, Position, ScrollMetrics, Viewport,
};
use crate::utils::{parse_declarations, to_css_text};

pub trait DocumentTree {
    /// Top of the tree (a `#document` node or the root element)
    fn root(&self) -> Option<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn node_type(&self, node: NodeId) -> Option<NodeType>;
    /// Lowercase tag name, `None` for non-elements
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn attr(&self, node: NodeId, name: &str) -> Option<&str>;
    fn text_content(&self, node: NodeId) -> String;
    fn computed_style(&self, node: NodeId) -> ComputedStyle;
    fn matches(&self, node: NodeId, selector: &Selector) -> bool;

    /// Border box relative to the viewport; zero for detached or
    /// unrendered nodes
    fn bounding_client_rect(&self, node: NodeId) -> DomRect;
    /// Layout height, zero when the node or an ancestor is not rendered
    fn offset_height(&self, node: NodeId) -> f64;
    fn scroll_metrics(&self, node: NodeId) -> ScrollMetrics;
    fn viewport(&self) -> Viewport;
    /// Topmost visible element under a viewport point
    fn element_from_point(&self, x: f64, y: f64) -> Option<NodeId>;
    /// Reachable from the root
    fn is_connected(&self, node: NodeId) -> bool;

    fn is_element(&self, node: NodeId) -> bool {
        self.node_type(node) == Some(NodeType::Element)
    }

    /// `<html>`, or the root itself when it is an element
    fn document_element(&self) -> Option<NodeId> {
        let root = self.root()?;
        if self.is_element(root) {
            return Some(root);
        }
        self.children(root).into_iter().find(|&id| self.is_element(id))
    }

    fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|&id| self.tag_name(id) == Some("body"))
    }

    /// The root element and `<body>` both scroll the viewport
    fn is_document_scroller(&self, node: NodeId) -> bool {
        Some(node) == self.document_element() || Some(node) == self.body()
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&id| self.is_element(id))
    }

    /// Inclusive containment, like `Node.contains`
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Descendants in document order, `scope` excluded
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| self.matches(id, selector))
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let root = self.root()?;
        self.descendants(root)
            .into_iter()
            .find(|&node| self.attr(node, "id") == Some(id))
    }

    /// Non-zero rendered height
    fn is_rendered(&self, node: NodeId) -> bool {
        self.offset_height(node) != 0.0
    }

    /// Document shown by an `<iframe>` element, when it is reachable
    fn frame_document(&self, _iframe: NodeId) -> Option<Rc<RefCell<Self>>>
    where
        Self: Sized,
    {
        None
    }
}

pub trait DocumentMut: DocumentTree {
    /// Clamped into `[0, scroll_height - client_height]`
    fn set_scroll_top(&mut self, node: NodeId, value: f64);
    /// Resize the viewport; the scroll position is re-clamped
    fn set_viewport(&mut self, viewport: Viewport);
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attr(&mut self, node: NodeId, name: &str);
    /// Append an empty block element with the given id at the end of
    /// `parent`'s content
    fn append_block(&mut self, parent: NodeId, tag: &str, id: &str) -> Option<NodeId>;
    fn set_block_height(&mut self, node: NodeId, height: f64);
    /// Detach from the tree. Scroll offsets past the shrunk content are
    /// pulled back in range.
    fn remove(&mut self, node: NodeId) -> Result<()>;

    /// Replace the inline style text
    fn set_inline_style(&mut self, node: NodeId, css: &str) {
        if css.trim().is_empty() {
            self.remove_attr(node, "style");
        } else {
            self.set_attr(node, "style", css);
        }
    }

    /// Merge declarations into the inline style, later ones win
    fn apply_style(&mut self, node: NodeId, declarations: &[(&str, &str)]) {
        let mut merged = parse_declarations(self.attr(node, "style").unwrap_or(""));
        for (property, value) in declarations {
            merged.retain(|(p, _)| p != property);
            merged.push((property.to_string(), value.to_string()));
        }
        self.set_inline_style(node, &to_css_text(&merged));
    }
}

impl DomArena {
    fn node(&self, node: NodeId) -> Option<&DomNode> {
        self.get(node).ok()
    }

    fn under_fixed(&self, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .any(|id| self.computed_style(id).position == Position::Fixed)
    }

    /// Re-apply every scroll offset so none exceeds its scroller's range
    fn clamp_scroll_offsets(&mut self) {
        if let Some(html) = self.document_element() {
            let scroll_y = DomArena::viewport(self).scroll_y;
            self.set_scroll_top(html, scroll_y);
        }
        for id in self.find(|node| node.scroll_top > 0.0) {
            let scroll_top = self.node(id).map(|n| n.scroll_top).unwrap_or(0.0);
            self.set_scroll_top(id, scroll_top);
        }
    }

    /// Paint layer for hit testing: in-flow content first, then fixed
    /// layers by z-index
    fn paint_layer(&self, node: NodeId) -> (bool, i32) {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find_map(|id| {
                let style = self.computed_style(id);
                (style.position == Position::Fixed).then(|| (true, style.z_index.unwrap_or(0)))
            })
            .unwrap_or((false, 0))
    }
}

impl DocumentTree for DomArena {
    fn root(&self) -> Option<NodeId> {
        self.root_id()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent_id
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children_ids.to_vec())
            .unwrap_or_default()
    }

    fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.node(node).map(|n| n.node_type)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.tag_name()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attr(name)
    }

    fn text_content(&self, node: NodeId) -> String {
        crate::utils::get_text_content(self, node).unwrap_or_default()
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.node(node)
            .map(DomNode::computed_style)
            .unwrap_or_default()
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.node(node).is_some_and(|n| selector.matches(n))
    }

    fn bounding_client_rect(&self, node: NodeId) -> DomRect {
        if !self.is_attached(node) {
            return DomRect::zero();
        }
        let Some(bounds) = self.node(node).and_then(|n| n.bounds) else {
            return DomRect::zero();
        };

        let mut dy = 0.0;
        for ancestor in self.ancestors(node) {
            if !self.is_document_scroller(ancestor) {
                dy += self.node(ancestor).map(|n| n.scroll_top).unwrap_or(0.0);
            }
        }
        let mut dx = 0.0;
        if !self.under_fixed(node) {
            dx += self.viewport().scroll_x;
            dy += self.viewport().scroll_y;
        }
        bounds.offset(-dx, -dy)
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        if !self.is_attached(node) {
            return 0.0;
        }
        let hidden = std::iter::once(node)
            .chain(self.ancestors(node))
            .any(|id| self.computed_style(id).display_none);
        if hidden {
            return 0.0;
        }
        self.page_rect(node).height
    }

    fn scroll_metrics(&self, node: NodeId) -> ScrollMetrics {
        let viewport = self.viewport();
        if self.is_document_scroller(node) {
            let scope = self.document_element().unwrap_or(node);
            let (bottom, right) = self.content_extent(scope).unwrap_or((0.0, 0.0));
            let page = self.page_rect(scope);
            return ScrollMetrics {
                scroll_top: viewport.scroll_y,
                scroll_height: viewport.height.max(bottom).max(page.bottom()),
                client_height: viewport.height,
                scroll_width: viewport.width.max(right).max(page.right()),
            };
        }

        let rect = self.page_rect(node);
        let (bottom, right) = self
            .content_extent(node)
            .unwrap_or((rect.bottom(), rect.right()));
        ScrollMetrics {
            scroll_top: self.node(node).map(|n| n.scroll_top).unwrap_or(0.0),
            scroll_height: rect.height.max(bottom - rect.top()),
            client_height: rect.height,
            scroll_width: rect.width.max(right - rect.left()),
        }
    }

    fn viewport(&self) -> Viewport {
        DomArena::viewport(self)
    }

    fn element_from_point(&self, x: f64, y: f64) -> Option<NodeId> {
        let root = self.root_id()?;
        let mut best: Option<((bool, i32, usize), NodeId)> = None;
        let mut stack = vec![root];
        let mut order = 0usize;

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            let style = node.computed_style();
            if style.display_none {
                continue;
            }
            stack.extend(node.children_ids.iter().rev().copied());
            order += 1;
            if !node.is_element() || style.visibility_hidden {
                continue;
            }
            let rect = self.bounding_client_rect(id);
            if rect.width <= 0.0 || rect.height <= 0.0 || !rect.contains_point(x, y) {
                continue;
            }
            let (fixed, z) = self.paint_layer(id);
            let key = (fixed, z, order);
            if best.as_ref().map_or(true, |(current, _)| key > *current) {
                best = Some((key, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.is_attached(node)
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        self.descendant_ids(scope)
    }

    fn frame_document(&self, iframe: NodeId) -> Option<Rc<RefCell<Self>>> {
        self.frames.get(&iframe).map(Rc::clone)
    }
}

impl DocumentMut for DomArena {
    fn set_scroll_top(&mut self, node: NodeId, value: f64) {
        let max = self.scroll_metrics(node).max_scroll_top();
        let value = value.clamp(0.0, max);
        if self.is_document_scroller(node) {
            let mut viewport = DomArena::viewport(self);
            viewport.scroll_y = value;
            DomArena::set_viewport(self, viewport);
        } else if let Ok(n) = self.get_mut(node) {
            n.scroll_top = value;
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        DomArena::set_viewport(self, viewport);
        if let Some(html) = self.document_element() {
            let scroll_y = DomArena::viewport(self).scroll_y;
            self.set_scroll_top(html, scroll_y);
        }
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Ok(n) = self.get_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Ok(n) = self.get_mut(node) {
            n.attributes.remove(name);
        }
    }

    fn append_block(&mut self, parent: NodeId, tag: &str, id: &str) -> Option<NodeId> {
        let parent_rect = self.node(parent)?.bounds.unwrap_or_else(DomRect::zero);
        let scope = if self.is_document_scroller(parent) {
            self.document_element().unwrap_or(parent)
        } else {
            parent
        };
        let bottom = self
            .content_extent(scope)
            .map(|(bottom, _)| bottom)
            .unwrap_or(parent_rect.top())
            .max(parent_rect.top());

        let mut block = DomNode::element(tag);
        block.attributes.insert("id".to_string(), id.to_string());
        block.bounds = Some(DomRect::new(parent_rect.x, bottom, parent_rect.width, 0.0));
        let block_id = self.add_node(block);
        self.append_child(parent, block_id).ok()?;
        Some(block_id)
    }

    fn set_block_height(&mut self, node: NodeId, height: f64) {
        let height = height.max(0.0);
        if let Ok(n) = self.get_mut(node) {
            if let Some(bounds) = n.bounds.as_mut() {
                bounds.height = height;
            }
        }
        self.apply_style(node, &[("height", &crate::utils::px(height))]);
        self.clamp_scroll_offsets();
    }

    fn remove(&mut self, node: NodeId) -> Result<()> {
        self.detach(node)?;
        self.clamp_scroll_offsets();
        Ok(())
    }
}
