//! # Pager Core
//!
//! A [`Viewport`] over the content and an optional [`Search`]; highlights
//! are applied while rendering and never touch the content itself.

pub mod search;
pub mod viewport;

pub use search::{Hit, Search};
pub use viewport::{wrap, Row, Viewport};

use crate::ui::Theme;
use ratatui::text::{Line, Span};
use std::ops::Range;

/// Columns taken by the `%4d │ ` gutter.
pub const GUTTER_WIDTH: usize = 7;

/// Render the visible rows.
pub fn render_rows(
    viewport: &Viewport,
    search: Option<&Search>,
    theme: &Theme,
    line_numbers: bool,
) -> Vec<Line<'static>> {
    viewport
        .visible()
        .iter()
        .map(|row| {
            let text = &viewport.content()[row.line];
            let mut spans = Vec::new();
            if line_numbers {
                let gutter = if row.first {
                    format!("{:>4} │ ", row.line + 1)
                } else {
                    "     │ ".to_string()
                };
                spans.push(Span::styled(gutter, theme.dim()));
            }
            let hits: Vec<(Range<usize>, bool)> = search
                .map(|s| s.on_line(row.line).collect())
                .unwrap_or_default();
            spans.extend(highlight_row(text, &row.range, &hits, theme));
            Line::from(spans)
        })
        .collect()
}

fn highlight_row(
    text: &str,
    row: &Range<usize>,
    hits: &[(Range<usize>, bool)],
    theme: &Theme,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut pos = row.start;
    for (range, current) in hits {
        let lo = range.start.max(row.start);
        let hi = range.end.min(row.end);
        if lo >= hi {
            continue;
        }
        if pos < lo {
            spans.push(Span::styled(text[pos..lo].to_string(), theme.text()));
        }
        let style = if *current { theme.current_hit() } else { theme.matched() };
        spans.push(Span::styled(text[lo..hi].to_string(), style));
        pos = hi;
    }
    if pos < row.end {
        spans.push(Span::styled(text[pos..row.end].to_string(), theme.text()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_gutter_only_on_first_row() {
        let mut vp = Viewport::new("abcdef", true);
        vp.set_size(3, 5);
        let lines = render_rows(&vp, None, Theme::default_theme(), true);
        assert_eq!(plain(&lines[0]), "   1 │ abc");
        assert_eq!(plain(&lines[1]), "     │ def");
    }

    #[test]
    fn test_highlight_clipped_to_row() {
        let mut vp = Viewport::new("xxabcdxx", true);
        vp.set_size(4, 5);
        let search = Search::run("abcd", vp.content());
        let theme = Theme::default_theme();
        let lines = render_rows(&vp, Some(&search), theme, false);
        assert_eq!(plain(&lines[0]), "xxab");
        assert_eq!(lines[0].spans[1].content, "ab");
        assert_eq!(lines[0].spans[1].style, theme.current_hit());
        assert_eq!(lines[1].spans[0].content, "cd");
    }
}
