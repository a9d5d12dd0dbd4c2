//! Scrollable, optionally soft-wrapped view over a list of lines.

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// One screen row: a byte range of a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    pub range: Range<usize>,
    /// First row of its source line (carries the line number).
    pub first: bool,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    content: Vec<String>,
    rows: Vec<Row>,
    soft_wrap: bool,
    width: usize,
    height: usize,
    y_offset: usize,
}

impl Viewport {
    pub fn new(content: &str, soft_wrap: bool) -> Self {
        let content: Vec<String> = content.lines().map(str::to_string).collect();
        let mut viewport = Self {
            content,
            rows: Vec::new(),
            soft_wrap,
            width: 80,
            height: 1,
            y_offset: 0,
        };
        viewport.layout();
        viewport
    }

    pub fn content(&self) -> &[String] {
        &self.content
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn y_offset(&self) -> usize {
        self.y_offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize the text area; rows are recomputed when wrapping.
    pub fn set_size(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        let rewrap = self.soft_wrap && width != self.width;
        self.width = width;
        self.height = height.max(1);
        if rewrap {
            let anchor = self.rows.get(self.y_offset).map(|r| (r.line, r.range.start));
            self.layout();
            if let Some((line, byte)) = anchor {
                self.y_offset = self.row_of(line, byte);
            }
        }
        self.clamp();
    }

    pub fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.height)
    }

    pub fn visible(&self) -> &[Row] {
        let end = (self.y_offset + self.height).min(self.rows.len());
        &self.rows[self.y_offset.min(end)..end]
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.y_offset = self.y_offset.saturating_add(n);
        self.clamp();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.y_offset = self.y_offset.saturating_sub(n);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height);
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.height / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.height / 2).max(1));
    }

    pub fn top(&mut self) {
        self.y_offset = 0;
    }

    pub fn bottom(&mut self) {
        self.y_offset = self.max_offset();
    }

    /// Scroll so the row holding `byte` of `line` is on screen, leaving the
    /// offset alone when it already is.
    pub fn reveal(&mut self, line: usize, byte: usize) {
        let row = self.row_of(line, byte);
        if row < self.y_offset || row >= self.y_offset + self.height {
            self.y_offset = row;
            self.clamp();
        }
    }

    /// Fraction of the content scrolled past, for the status line.
    pub fn scroll_percent(&self) -> u16 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        ((self.y_offset * 100) / max) as u16
    }

    fn row_of(&self, line: usize, byte: usize) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.line < line || (r.line == line && r.range.start <= byte))
            .unwrap_or(0)
    }

    fn clamp(&mut self) {
        self.y_offset = self.y_offset.min(self.max_offset());
    }

    fn layout(&mut self) {
        self.rows.clear();
        for (index, text) in self.content.iter().enumerate() {
            if !self.soft_wrap {
                self.rows.push(Row {
                    line: index,
                    range: 0..text.len(),
                    first: true,
                });
                continue;
            }
            for (n, range) in wrap(text, self.width).into_iter().enumerate() {
                self.rows.push(Row {
                    line: index,
                    range,
                    first: n == 0,
                });
            }
        }
    }
}

/// Split `text` into byte ranges no wider than `width` columns.
pub fn wrap(text: &str, width: usize) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut used = 0;
    for (offset, grapheme) in text.grapheme_indices(true) {
        let w = grapheme.width();
        if used + w > width && used > 0 {
            rows.push(start..offset);
            start = offset;
            used = 0;
        }
        used += w;
    }
    rows.push(start..text.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_offset_stays_in_bounds() {
        let mut vp = Viewport::new(&numbered(10), false);
        vp.set_size(20, 4);
        vp.scroll_down(100);
        assert_eq!(vp.y_offset(), 6);
        assert_eq!(vp.y_offset(), vp.max_offset());
        vp.scroll_up(100);
        assert_eq!(vp.y_offset(), 0);
        vp.bottom();
        assert_eq!(vp.visible().len(), 4);
        assert_eq!(vp.visible()[3].line, 9);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let mut vp = Viewport::new("a\nb", false);
        vp.set_size(20, 10);
        vp.page_down();
        assert_eq!(vp.y_offset(), 0);
        assert_eq!(vp.scroll_percent(), 100);
    }

    #[test]
    fn test_soft_wrap_splits_by_width() {
        assert_eq!(wrap("abcdefg", 3), vec![0..3, 3..6, 6..7]);
        assert_eq!(wrap("", 3), vec![0..0]);
        // Wide graphemes never straddle a row boundary.
        assert_eq!(wrap("a日本", 2), vec![0..1, 1..4, 4..7]);
    }

    #[test]
    fn test_wrapped_rows_mark_first() {
        let mut vp = Viewport::new("abcdef\nxy", true);
        vp.set_size(4, 5);
        let rows = vp.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].first);
        assert!(!rows[1].first);
        assert_eq!(rows[2].line, 1);
    }

    #[test]
    fn test_reveal_scrolls_to_target() {
        let mut vp = Viewport::new(&numbered(50), false);
        vp.set_size(20, 5);
        vp.reveal(30, 0);
        assert_eq!(vp.y_offset(), 30);
        vp.reveal(32, 0);
        assert_eq!(vp.y_offset(), 30);
        vp.reveal(49, 0);
        assert_eq!(vp.y_offset(), 45);
    }

    #[test]
    fn test_half_pages() {
        let mut vp = Viewport::new(&numbered(20), false);
        vp.set_size(10, 6);
        vp.half_page_down();
        assert_eq!(vp.y_offset(), 3);
        vp.half_page_up();
        assert_eq!(vp.y_offset(), 0);
    }
}
