//! Core type definitions for the document model
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Geometry is stored once, in page coordinates; viewport coordinates
//!    are derived on demand
//! 3. Use SmallVec for small arrays (avoid heap allocation)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::utils::{num, parse_declarations};

/// Node identifier (index into arena)
pub type NodeId = u32;

/// Node type matching DOM specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
}

/// Rectangle with coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Half-open hit test: left/top edges inside, right/bottom outside
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// The root viewport: window size and document scroll position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn rect(&self) -> DomRect {
        DomRect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Scroll state of a scroll container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
    pub scroll_width: f64,
}

impl ScrollMetrics {
    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Auto,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    BorderBox,
}

/// Typed view of the styles the core reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub position: Position,
    /// `None` for `auto` or unset
    pub z_index: Option<i32>,
    pub overflow_y: Overflow,
    pub font_size: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub padding_left: f64,
    pub padding_right: f64,
    pub box_sizing: BoxSizing,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: false,
            position: Position::Static,
            z_index: None,
            overflow_y: Overflow::Visible,
            font_size: 16.0,
            margin_left: 0.0,
            margin_right: 0.0,
            padding_left: 0.0,
            padding_right: 0.0,
            box_sizing: BoxSizing::ContentBox,
        }
    }
}

impl ComputedStyle {
    /// Build from `property: value` pairs; later pairs win
    pub fn from_declarations<'a>(
        declarations: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut style = Self::default();
        for (property, value) in declarations {
            style.apply(property, value);
        }
        style
    }

    fn apply(&mut self, property: &str, value: &str) {
        let value = value.trim();
        match property.trim().to_ascii_lowercase().as_str() {
            "display" => self.display_none = value == "none",
            "visibility" => self.visibility_hidden = value == "hidden" || value == "collapse",
            "position" => {
                self.position = match value {
                    "relative" => Position::Relative,
                    "absolute" => Position::Absolute,
                    "fixed" => Position::Fixed,
                    "sticky" => Position::Sticky,
                    _ => Position::Static,
                }
            }
            "z-index" => self.z_index = value.parse().ok(),
            "overflow" | "overflow-y" => {
                self.overflow_y = match value {
                    "hidden" => Overflow::Hidden,
                    "auto" => Overflow::Auto,
                    "scroll" => Overflow::Scroll,
                    _ => Overflow::Visible,
                }
            }
            "font-size" => self.font_size = num(value),
            "margin-left" => self.margin_left = num(value),
            "margin-right" => self.margin_right = num(value),
            "padding-left" => self.padding_left = num(value),
            "padding-right" => self.padding_right = num(value),
            "box-sizing" => {
                self.box_sizing = if value == "border-box" {
                    BoxSizing::BorderBox
                } else {
                    BoxSizing::ContentBox
                }
            }
            _ => {}
        }
    }

    pub fn is_scrollable_overflow(&self) -> bool {
        matches!(self.overflow_y, Overflow::Auto | Overflow::Scroll)
    }
}

/// The main document tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>, // Most nodes have <4 children

    pub node_name: String,
    pub node_value: String,
    pub attributes: HashMap<String, String>,

    /// Stylesheet-resolved styles; the `style` attribute overrides them
    pub styles: HashMap<String, String>,

    /// Layout box in page coordinates (document scrolled to 0, every
    /// scroll container scrolled to 0). `None` for unrendered nodes.
    pub bounds: Option<DomRect>,

    /// Scroll offset when this element is a scroll container
    pub scroll_top: f64,
}

impl DomNode {
    pub fn new(node_id: NodeId, node_type: NodeType, node_name: String) -> Self {
        Self {
            node_id,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name,
            node_value: String::new(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounds: None,
            scroll_top: 0.0,
        }
    }

    /// Element node; ids are assigned by the arena
    pub fn element(tag: &str) -> Self {
        Self::new(0, NodeType::Element, tag.to_ascii_lowercase())
    }

    pub fn text(value: &str) -> Self {
        let mut node = Self::new(0, NodeType::Text, "#text".to_string());
        node.node_value = value.to_string();
        node
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Inline style text (`style` attribute)
    pub fn inline_style(&self) -> &str {
        self.attr("style").unwrap_or("")
    }

    /// Stylesheet styles overridden by the inline style
    pub fn computed_style(&self) -> ComputedStyle {
        let inline = parse_declarations(self.inline_style());
        let declarations = self
            .styles
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(inline.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        ComputedStyle::from_declarations(declarations)
    }
}
