//! Turning matched byte ranges into something drawable.
//!
//! Ranges are snapped to grapheme clusters: a cluster is highlighted when
//! any of its bytes was matched, so combining marks, ZWJ sequences and wide
//! characters are never split.

use ratatui::style::Style;
use ratatui::text::Span;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

fn touches(ranges: &[Range<usize>], cluster: &Range<usize>) -> bool {
    ranges
        .iter()
        .any(|r| r.start < cluster.end && cluster.start < r.end)
}

/// Matched ranges expressed as visible column ranges.
pub fn visible_columns(text: &str, ranges: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut columns: Vec<Range<usize>> = Vec::new();
    let mut col = 0;
    for (start, grapheme) in text.grapheme_indices(true) {
        let width = grapheme.width();
        let cluster = start..start + grapheme.len();
        if touches(ranges, &cluster) && width > 0 {
            match columns.last_mut() {
                Some(last) if last.end == col => last.end = col + width,
                _ => columns.push(col..col + width),
            }
        }
        col += width;
    }
    columns
}

/// Split `text` into spans, styling matched clusters with `highlight`.
pub fn spans(text: &str, ranges: &[Range<usize>], base: Style, highlight: Style) -> Vec<Span<'static>> {
    if ranges.is_empty() {
        return vec![Span::styled(text.to_string(), base)];
    }
    let mut out: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_hit = false;
    for (start, grapheme) in text.grapheme_indices(true) {
        let hit = touches(ranges, &(start..start + grapheme.len()));
        if hit != run_hit && !run.is_empty() {
            let style = if run_hit { highlight } else { base };
            out.push(Span::styled(std::mem::take(&mut run), style));
        }
        run_hit = hit;
        run.push_str(grapheme);
    }
    if !run.is_empty() {
        out.push(Span::styled(run, if run_hit { highlight } else { base }));
    }
    out
}
