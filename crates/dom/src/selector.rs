//! Compound simple selectors: `tag`, `.class`, `#id` and combinations
//! such as `div.entry#main`. No combinators, attributes or pseudo-classes.

use std::fmt;
use std::str::FromStr;

use crate::error::{DomError, Result};
use crate::types::DomNode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid());
        }

        let mut selector = Selector {
            tag: None,
            id: None,
            classes: Vec::new(),
        };
        let mut rest = input;
        while !rest.is_empty() {
            let (sigil, body) = match rest.as_bytes()[0] {
                b'.' | b'#' => (Some(rest.as_bytes()[0]), &rest[1..]),
                _ => (None, rest),
            };
            let end = body
                .find(|c: char| c == '.' || c == '#')
                .unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() || !name.chars().all(is_name_char) {
                return Err(invalid());
            }
            match sigil {
                Some(b'.') => selector.classes.push(name.to_string()),
                Some(_) if selector.id.is_none() => selector.id = Some(name.to_string()),
                None if selector.tag.is_none() && rest.len() == input.len() => {
                    selector.tag = Some(name.to_ascii_lowercase())
                }
                _ => return Err(invalid()),
            }
            rest = &body[end..];
        }
        Ok(selector)
    }

    /// Whether an element node matches every part of the selector
    pub fn matches(&self, node: &DomNode) -> bool {
        let Some(tag) = node.tag_name() else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !tag.eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| node.has_class(class))
    }

    /// The tag part, lowercased
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{tag}")?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)]) -> DomNode {
        let mut node = DomNode::element(tag);
        for (k, v) in attrs {
            node.attributes.insert(k.to_string(), v.to_string());
        }
        node
    }

    #[test]
    fn test_simple_selectors() {
        let article = element("ARTICLE", &[("class", "post content"), ("id", "main")]);

        assert!(Selector::parse("article").unwrap().matches(&article));
        assert!(Selector::parse(".content").unwrap().matches(&article));
        assert!(Selector::parse("#main").unwrap().matches(&article));
        assert!(!Selector::parse(".cont").unwrap().matches(&article));
        assert!(!Selector::parse("nav").unwrap().matches(&article));
    }

    #[test]
    fn test_compound_selector() {
        let selector: Selector = "div.entry.wide#x".parse().unwrap();
        assert_eq!(selector.tag(), Some("div"));
        assert_eq!(selector.to_string(), "div#x.entry.wide");

        let hit = element("div", &[("class", "wide entry"), ("id", "x")]);
        let miss = element("div", &[("class", "entry"), ("id", "x")]);
        assert!(selector.matches(&hit));
        assert!(!selector.matches(&miss));
    }

    #[test]
    fn test_text_nodes_never_match() {
        let text = DomNode::text("article");
        assert!(!Selector::parse("article").unwrap().matches(&text));
    }

    #[test]
    fn test_invalid_selectors() {
        for input in ["", "  ", "div p", "a > b", ".", "#a#b", "div.", "[href]", "a:hover"] {
            assert!(Selector::parse(input).is_err(), "{input:?} should be rejected");
        }
    }
}
