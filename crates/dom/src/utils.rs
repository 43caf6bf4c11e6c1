//! Utility functions for document processing

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{NodeId, NodeType};

/// `"12px"` → `12.0`; anything unparsable is `0.0`
pub fn num(size: &str) -> f64 {
    size.trim()
        .trim_end_matches("px")
        .trim()
        .parse()
        .unwrap_or(0.0)
}

/// `12.0` → `"12px"`
pub fn px(size: f64) -> String {
    format!("{size}px")
}

/// Clamp `value` into `[min, max]`
pub fn between(min: f64, value: f64, max: f64) -> f64 {
    min.max(max.min(value))
}

/// Split CSS declaration text into `(property, value)` pairs.
/// `!important` is dropped; the last duplicate wins when applied in order.
pub fn parse_declarations(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if property.is_empty() {
                None
            } else {
                Some((property, value.to_string()))
            }
        })
        .collect()
}

/// Serialize declarations back to inline style text
pub fn to_css_text(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Get all text content from node and its children
pub fn get_text_content(arena: &DomArena, node_id: NodeId) -> Result<String> {
    let mut text = String::new();

    arena.traverse_df(node_id, |node| {
        if node.node_type == NodeType::Text {
            text.push_str(&node.node_value);
        }
        Ok(())
    })?;

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_and_px() {
        assert_eq!(num("12px"), 12.0);
        assert_eq!(num(" 7.5 "), 7.5);
        assert_eq!(num("auto"), 0.0);
        assert_eq!(px(990.0), "990px");
    }

    #[test]
    fn test_between() {
        assert_eq!(between(12.0, 20.0, 16.0), 16.0);
        assert_eq!(between(12.0, 10.0, 16.0), 12.0);
        assert_eq!(between(12.0, 14.0, 16.0), 14.0);
    }

    #[test]
    fn test_parse_declarations() {
        let parsed = parse_declarations("color: red; Max-Width: 990px !important;; bad");
        assert_eq!(
            parsed,
            vec![
                ("color".to_string(), "red".to_string()),
                ("max-width".to_string(), "990px".to_string()),
            ]
        );
        assert_eq!(to_css_text(&parsed), "color: red; max-width: 990px;");
    }
}
