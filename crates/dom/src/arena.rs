//! Arena-based document tree storage
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [Node0][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Nodes are never freed. A removed node stays in the arena, detached, so
//! handles held elsewhere keep resolving (and report "not connected").
//!
//! Documents embedded by `<iframe>` elements live in their own arenas,
//! keyed by the iframe node.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{DomError, Result};
use crate::types::{DomNode, DomRect, NodeId, NodeType, Position, Viewport};

/// Arena allocator for document nodes
#[derive(Debug, Clone)]
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<DomNode>,

    /// Root node ID (if set)
    root_id: Option<NodeId>,

    viewport: Viewport,

    pub(crate) frames: AHashMap<NodeId, Rc<RefCell<DomArena>>>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root_id: None,
            viewport: Viewport::default(),
            frames: AHashMap::new(),
        }
    }

    /// Add a detached node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        node.parent_id = None;
        self.nodes.push(node);
        node_id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.add_node(DomNode::element(tag))
    }

    /// Attach the document an `<iframe>` element displays
    pub fn set_frame_document(&mut self, iframe: NodeId, document: DomArena) -> Result<()> {
        self.get(iframe)?;
        self.frames.insert(iframe, Rc::new(RefCell::new(document)));
        Ok(())
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::InvalidNodeType {
                expected: "node outside the child's subtree".to_string(),
                actual: format!("{parent}"),
            });
        }
        self.detach(child)?;
        self.get_mut(parent)?.children_ids.push(child);
        self.get_mut(child)?.parent_id = Some(parent);
        Ok(())
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let parent_id = self.get(node_id)?.parent_id;
        if let Some(parent_id) = parent_id {
            self.get_mut(parent_id)?
                .children_ids
                .retain(|id| *id != node_id);
            self.get_mut(node_id)?.parent_id = None;
        }
        Ok(())
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Set root node
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        // Verify node exists
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.get(node_id).ok().and_then(|n| n.parent_id);
        std::iter::successors(first, move |&id| self.get(id).ok().and_then(|n| n.parent_id))
    }

    /// `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }

    /// Whether the node hangs off the root
    pub fn is_attached(&self, node_id: NodeId) -> bool {
        match self.root_id {
            Some(root) => root == node_id || self.is_ancestor(root, node_id),
            None => false,
        }
    }

    /// Depth-first walk from `start_id`, children left to right
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Descendants of `scope` in document order, `scope` excluded
    pub fn descendant_ids(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let _ = self.traverse_df(scope, |node| {
            if node.node_id != scope {
                out.push(node.node_id);
            }
            Ok(())
        });
        out
    }

    /// Find nodes matching predicate
    pub fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&DomNode) -> bool,
    {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                if predicate(node) {
                    Some(idx as NodeId)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Find all elements by tag name
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find(|node| {
            node.node_type == NodeType::Element && node.node_name.eq_ignore_ascii_case(tag)
        })
    }

    /// Find attached element by ID attribute
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let root = self.root_id?;
        self.descendant_ids(root).into_iter().find(|&node_id| {
            self.get(node_id)
                .map(|node| node.is_element() && node.attr("id") == Some(id))
                .unwrap_or(false)
        })
    }

    /// Lowest bottom / rightmost right edge among the rendered descendants
    /// of `scope`, skipping fixed-position subtrees.
    pub(crate) fn content_extent(&self, scope: NodeId) -> Option<(f64, f64)> {
        let mut extent: Option<(f64, f64)> = None;
        let mut stack: Vec<NodeId> = self
            .get(scope)
            .map(|n| n.children_ids.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(node_id) = stack.pop() {
            let Ok(node) = self.get(node_id) else { continue };
            let style = node.computed_style();
            if style.position == Position::Fixed || style.display_none {
                continue;
            }
            if let Some(bounds) = node.bounds {
                let (bottom, right) = extent.unwrap_or((f64::MIN, f64::MIN));
                extent = Some((bottom.max(bounds.bottom()), right.max(bounds.right())));
            }
            stack.extend(node.children_ids.iter().rev().copied());
        }
        extent
    }

    /// Page rect of a node, zero when it has no layout box
    pub(crate) fn page_rect(&self, node_id: NodeId) -> DomRect {
        self.get(node_id)
            .ok()
            .and_then(|n| n.bounds)
            .unwrap_or_else(DomRect::zero)
    }

    /// Clear arena (reuse allocation)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root_id = None;
        self.frames.clear();
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (DomArena, NodeId, NodeId, NodeId) {
        let mut arena = DomArena::new();
        let root = arena.create_element("div");
        let a = arena.create_element("span");
        let b = arena.create_element("span");
        arena.append_child(root, a).unwrap();
        arena.append_child(root, b).unwrap();
        arena.set_root(root).unwrap();
        (arena, root, a, b)
    }

    #[test]
    fn test_arena_basic() {
        let mut arena = DomArena::new();
        let id = arena.add_node(DomNode::element("DIV"));
        assert_eq!(id, 0);

        let retrieved = arena.get(id).unwrap();
        assert_eq!(retrieved.node_name, "div");
        assert!(arena.get(7).is_err());
    }

    #[test]
    fn test_traverse_df() {
        let (mut arena, root, a, _) = tree();
        let text = arena.add_node(DomNode::text("hi"));
        arena.append_child(a, text).unwrap();

        let mut visited = Vec::new();
        arena
            .traverse_df(root, |node| {
                visited.push(node.node_name.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, vec!["div", "span", "#text", "span"]);
        assert_eq!(arena.descendant_ids(root).len(), 3);
    }

    #[test]
    fn test_append_moves_node() {
        let (mut arena, root, a, b) = tree();
        arena.append_child(b, a).unwrap();

        assert_eq!(arena.get(root).unwrap().children_ids.as_slice(), &[b]);
        assert_eq!(arena.get(a).unwrap().parent_id, Some(b));
        assert!(arena.is_ancestor(root, a));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let (mut arena, root, a, _) = tree();
        assert!(arena.append_child(a, root).is_err());
        assert!(arena.append_child(a, a).is_err());
    }

    #[test]
    fn test_detach() {
        let (mut arena, root, a, _) = tree();
        assert!(arena.is_attached(a));

        arena.detach(a).unwrap();
        assert!(!arena.is_attached(a));
        assert!(arena.is_attached(root));
        assert_eq!(arena.get(root).unwrap().children_ids.len(), 1);
    }

    #[test]
    fn test_find_by_id_ignores_detached() {
        let (mut arena, _, a, _) = tree();
        arena
            .get_mut(a)
            .unwrap()
            .attributes
            .insert("id".to_string(), "x".to_string());
        assert_eq!(arena.find_by_id("x"), Some(a));

        arena.detach(a).unwrap();
        assert_eq!(arena.find_by_id("x"), None);
        assert_eq!(arena.find_by_tag("SPAN").len(), 2);
    }
}
