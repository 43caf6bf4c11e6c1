//! Active heading under the current scroll position

use crate::content::Content;

/// A heading counts as passed once its top is this close to the visible top
pub const HYSTERESIS: f64 = 15.0;

/// Index of the last heading above the visible top, 0 when none is
pub fn active_heading_index(content: &Content, scroll_top: f64, topbar_height: f64) -> usize {
    let visible_top = topbar_height.max(content.scroller.rect.top());
    let first_below = content
        .headings
        .iter()
        .position(|heading| content.heading_top(heading, scroll_top) >= visible_top + HYSTERESIS)
        .unwrap_or(content.headings.len());
    first_below.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::build_content;
    use crate::testing::{article_page, PageIds};

    // headings at on-screen tops [0, 300, 700] once the article top sits at 0
    fn content() -> Content {
        let (mut arena, PageIds { body, article, .. }) = article_page(&[0.0, 300.0, 700.0]);
        let mut content = build_content(&mut arena, article, body);
        content.article.offset_from_scroller_top = 0.0;
        content
    }

    #[test]
    fn test_active_heading_below_visible_top() {
        let content = content();
        assert_eq!(active_heading_index(&content, 0.0, 320.0), 1);
    }

    #[test]
    fn test_active_heading_at_top() {
        let content = content();
        assert_eq!(active_heading_index(&content, 0.0, 0.0), 0);
    }

    #[test]
    fn test_active_heading_follows_scroll() {
        let content = content();
        assert_eq!(active_heading_index(&content, 690.0, 0.0), 2);
        // a heading 1px above the hysteresis line counts as reached
        assert_eq!(active_heading_index(&content, 286.0, 0.0), 1);
        assert_eq!(active_heading_index(&content, 284.0, 0.0), 0);
    }

    #[test]
    fn test_no_headings() {
        let mut content = content();
        content.headings.clear();
        assert_eq!(active_heading_index(&content, 500.0, 0.0), 0);
    }
}
