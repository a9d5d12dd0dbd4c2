//! Rendering helpers shared by the widgets' `view` functions.

use crate::config::Padding;
use crate::ui::theme::Theme;
use ratatui::text::{Line, Span, Text};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Key help such as `↑/↓ navigate • enter submit`.
pub fn help_line(theme: &Theme, bindings: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(bindings.len() * 3);
    for (i, (keys, action)) in bindings.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", theme.dim()));
        }
        spans.push(Span::styled((*keys).to_string(), theme.text()));
        spans.push(Span::styled(format!(" {action}"), theme.dim()));
    }
    Line::from(spans)
}

/// Header text, one line per embedded newline.
pub fn header_lines(theme: &Theme, header: &str) -> Vec<Line<'static>> {
    if header.is_empty() {
        return Vec::new();
    }
    header
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), theme.header())))
        .collect()
}

/// Page indicator: one filled dot for the current page.
pub fn pagination_dots(theme: &Theme, pages: usize, current: usize) -> Line<'static> {
    let spans: Vec<Span<'static>> = (0..pages)
        .map(|page| {
            if page == current {
                Span::styled("•", theme.text())
            } else {
                Span::styled("•", theme.dim())
            }
        })
        .collect();
    Line::from(spans)
}

/// Apply padding: blank rows above and below, spaces on the left.
pub fn pad(text: Text<'static>, padding: Padding) -> Text<'static> {
    if padding == Padding::default() {
        return text;
    }
    let mut lines: Vec<Line<'static>> = Vec::new();
    lines.extend((0..padding.top).map(|_| Line::default()));
    let indent = " ".repeat(usize::from(padding.left));
    for line in text.lines {
        let mut spans = Vec::with_capacity(line.spans.len() + 1);
        if !indent.is_empty() {
            spans.push(Span::raw(indent.clone()));
        }
        spans.extend(line.spans);
        lines.push(Line::from(spans).style(line.style));
    }
    lines.extend((0..padding.bottom).map(|_| Line::default()));
    Text::from(lines)
}

/// Cut a string to at most `width` columns, ending in `…` when cut.
pub fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Rows needed for a list of `items` entries plus fixed chrome.
pub fn list_height(items: usize, limit: usize, chrome: usize) -> u16 {
    u16::try_from(items.min(limit) + chrome).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_help_line_joins_bindings() {
        let line = help_line(
            Theme::default_theme(),
            &[("↑/↓", "navigate"), ("enter", "submit")],
        );
        assert_eq!(plain(&line), "↑/↓ navigate • enter submit");
    }

    #[test]
    fn test_header_splits_lines() {
        let lines = header_lines(Theme::default_theme(), "Pick\none");
        assert_eq!(lines.len(), 2);
        assert!(header_lines(Theme::default_theme(), "").is_empty());
    }

    #[test]
    fn test_pad_adds_rows_and_indent() {
        let padding = Padding {
            top: 1,
            right: 0,
            bottom: 2,
            left: 2,
        };
        let text = pad(Text::from("x"), padding);
        assert_eq!(text.lines.len(), 4);
        assert_eq!(plain(&text.lines[1]), "  x");
    }

    #[test]
    fn test_truncate_respects_wide_chars() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_dots_mark_current_page() {
        let line = pagination_dots(Theme::default_theme(), 3, 1);
        assert_eq!(plain(&line), "•••");
        assert_eq!(line.spans[1].style, Theme::default_theme().text());
    }
}
