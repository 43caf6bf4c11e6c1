//! Document service - builds an arena from a layout snapshot
//!
//! Snapshot format (JSON):
//! ```json
//! {
//!   "viewport": { "width": 1280, "height": 800, "scrollX": 0, "scrollY": 0 },
//!   "root": {
//!     "nodeName": "html",
//!     "attributes": { "class": "page" },
//!     "bounds": { "x": 0, "y": 0, "width": 1280, "height": 4000 },
//!     "styles": { "position": "static" },
//!     "scrollTop": 0,
//!     "children": [ "bare strings are text nodes", { "nodeName": "body" } ]
//!   }
//! }
//! ```
//! `#text` nodes carry their value in `text`; `#document` and `#comment`
//! map to the matching node types. An `iframe` node may hold the snapshot
//! of the document it shows under `contentDocument`.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Configuration for snapshot loading
#[derive(Debug, Clone)]
pub struct DomServiceConfig {
    /// Nesting deeper than this is rejected
    pub max_depth: usize,
}

impl Default for DomServiceConfig {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

/// Main document service
pub struct DomService {
    config: DomServiceConfig,
    arena: DomArena,
}

impl DomService {
    /// Create new service with default config
    pub fn new() -> Self {
        Self::with_config(DomServiceConfig::default())
    }

    /// Create service with custom config
    pub fn with_config(config: DomServiceConfig) -> Self {
        Self {
            config,
            arena: DomArena::new(),
        }
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    pub fn into_arena(self) -> DomArena {
        self.arena
    }

    /// Parse a snapshot and rebuild the arena, returns the root id
    pub fn parse_snapshot(&mut self, snapshot: &Value) -> Result<NodeId> {
        let root = snapshot
            .get("root")
            .ok_or_else(|| DomError::Snapshot("Missing 'root' in snapshot".to_string()))?;

        self.arena.clear();
        let viewport = match snapshot.get("viewport") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Viewport::default(),
        };
        self.arena.set_viewport(viewport);

        let root_id = self.parse_node(root, None, 0)?;
        self.arena.set_root(root_id)?;
        debug!(nodes = self.arena.len(), "snapshot loaded");

        Ok(root_id)
    }

    pub fn parse_snapshot_str(&mut self, json: &str) -> Result<NodeId> {
        let value: Value = serde_json::from_str(json)?;
        self.parse_snapshot(&value)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<NodeId> {
        let json = std::fs::read_to_string(path)?;
        self.parse_snapshot_str(&json)
    }

    /// Recursively parse a snapshot node
    fn parse_node(
        &mut self,
        value: &Value,
        parent_id: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        if depth > self.config.max_depth {
            return Err(DomError::MaxDepthExceeded {
                current: depth,
                max: self.config.max_depth,
            });
        }

        if let Some(text) = value.as_str() {
            return self.attach(DomNode::text(text), parent_id);
        }
        if !value.is_object() {
            return Err(DomError::InvalidNodeType {
                expected: "object or string".to_string(),
                actual: value.to_string(),
            });
        }

        let node_name = value["nodeName"]
            .as_str()
            .ok_or_else(|| DomError::Snapshot("Missing nodeName".to_string()))?;

        let mut node = match node_name {
            "#text" => DomNode::text(value["text"].as_str().unwrap_or("")),
            "#comment" => DomNode::new(0, NodeType::Comment, node_name.to_string()),
            "#document" => DomNode::new(0, NodeType::Document, node_name.to_string()),
            tag => DomNode::element(tag),
        };

        if let Some(attrs) = value["attributes"].as_object() {
            for (key, attr) in attrs {
                if let Some(attr) = attr.as_str() {
                    node.attributes.insert(key.clone(), attr.to_string());
                }
            }
        }
        if let Some(styles) = value["styles"].as_object() {
            for (key, style) in styles {
                let style = match style {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                node.styles.insert(key.to_ascii_lowercase(), style);
            }
        }
        if let Some(bounds) = value.get("bounds").filter(|b| !b.is_null()) {
            node.bounds = Some(serde_json::from_value(bounds.clone())?);
        }
        node.scroll_top = value["scrollTop"].as_f64().unwrap_or(0.0);
        let frame_size = node.bounds;

        let current_node_id = self.attach(node, parent_id)?;

        if let Some(frame) = value.get("contentDocument").filter(|f| f.is_object()) {
            let document = self.parse_frame(frame, frame_size)?;
            self.arena.set_frame_document(current_node_id, document)?;
        }

        if let Some(children) = value["children"].as_array() {
            for child in children {
                self.parse_node(child, Some(current_node_id), depth + 1)?;
            }
        }

        Ok(current_node_id)
    }

    /// Load an iframe's document; without its own viewport it gets the
    /// iframe box size
    fn parse_frame(&self, snapshot: &Value, size: Option<DomRect>) -> Result<DomArena> {
        let mut service = DomService::with_config(self.config.clone());
        service.parse_snapshot(snapshot)?;
        let mut arena = service.into_arena();
        if let (None, Some(size)) = (snapshot.get("viewport"), size) {
            arena.set_viewport(Viewport {
                width: size.width,
                height: size.height,
                ..Viewport::default()
            });
        }
        Ok(arena)
    }

    fn attach(&mut self, node: DomNode, parent_id: Option<NodeId>) -> Result<NodeId> {
        let node_id = self.arena.add_node(node);
        if let Some(parent_id) = parent_id {
            self.arena.append_child(parent_id, node_id)?;
        }
        Ok(node_id)
    }
}

impl Default for DomService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentTree;

    #[test]
    fn test_parse_simple_snapshot() {
        let snapshot = serde_json::json!({
            "viewport": { "width": 1000, "height": 600, "scrollY": 20 },
            "root": {
                "nodeName": "#document",
                "children": [{
                    "nodeName": "HTML",
                    "bounds": { "x": 0, "y": 0, "width": 1000, "height": 2000 },
                    "children": [{
                        "nodeName": "body",
                        "attributes": { "class": "post" },
                        "styles": { "font-size": "18px", "z-index": 3 },
                        "children": ["Hello ", { "nodeName": "#text", "text": "world" }]
                    }]
                }]
            }
        });

        let mut service = DomService::new();
        let root_id = service.parse_snapshot(&snapshot).unwrap();
        let arena = service.arena();

        assert_eq!(root_id, 0);
        assert_eq!(arena.len(), 5);
        assert_eq!(arena.viewport().scroll_y, 20.0);
        assert_eq!(arena.viewport().height, 600.0);

        let body = arena.body().unwrap();
        assert_eq!(arena.document_element(), Some(1));
        assert_eq!(arena.text_content(body), "Hello world");
        assert!(arena.get(body).unwrap().has_class("post"));
        assert_eq!(arena.computed_style(body).font_size, 18.0);
        assert_eq!(arena.computed_style(body).z_index, Some(3));
        assert!(arena.get(body).unwrap().bounds.is_none());
    }

    #[test]
    fn test_iframe_content_document() {
        let snapshot = serde_json::json!({
            "root": { "nodeName": "html", "children": [{
                "nodeName": "body",
                "children": [{
                    "nodeName": "iframe",
                    "bounds": { "x": 0, "y": 0, "width": 900, "height": 700 },
                    "contentDocument": {
                        "root": { "nodeName": "html", "children": [
                            { "nodeName": "body", "children": ["framed"] }
                        ]}
                    }
                }, {
                    "nodeName": "iframe",
                    "bounds": { "x": 0, "y": 700, "width": 300, "height": 100 }
                }]
            }]}
        });

        let mut service = DomService::new();
        service.parse_snapshot(&snapshot).unwrap();
        let arena = service.arena();
        let iframes = arena.find_by_tag("iframe");

        let frame = arena.frame_document(iframes[0]).unwrap();
        let frame = frame.borrow();
        assert_eq!(frame.text_content(frame.body().unwrap()), "framed");
        assert_eq!((frame.viewport().width, frame.viewport().height), (900.0, 700.0));
        assert!(arena.frame_document(iframes[1]).is_none());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("dom-snapshot-{}.json", std::process::id()));
        let json = r#"{ "root": { "nodeName": "html", "children": ["saved"] } }"#;
        std::fs::write(&path, json).unwrap();

        let mut service = DomService::new();
        let root = service.load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(service.arena().text_content(root), "saved");

        assert!(matches!(service.load_file(&path), Err(DomError::IoError(_))));
    }

    #[test]
    fn test_missing_root() {
        let mut service = DomService::new();
        let err = service.parse_snapshot(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, DomError::Snapshot(_)));
    }

    #[test]
    fn test_malformed_nodes() {
        let mut service = DomService::new();
        let no_name = serde_json::json!({ "root": { "children": [] } });
        assert!(service.parse_snapshot(&no_name).is_err());

        let number = serde_json::json!({ "root": 42 });
        assert!(matches!(
            service.parse_snapshot(&number),
            Err(DomError::InvalidNodeType { .. })
        ));

        assert!(matches!(
            service.parse_snapshot_str("{ not json"),
            Err(DomError::ParseError(_))
        ));
    }

    #[test]
    fn test_max_depth() {
        let mut service = DomService::with_config(DomServiceConfig { max_depth: 2 });
        let deep = serde_json::json!({ "root": {
            "nodeName": "div",
            "children": [{ "nodeName": "div", "children": [
                { "nodeName": "div", "children": ["x"] }
            ]}]
        }});
        assert!(matches!(
            service.parse_snapshot(&deep),
            Err(DomError::MaxDepthExceeded { current: 3, max: 2 })
        ));
    }
}
