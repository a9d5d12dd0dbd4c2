//! # Virtual Terminal Snapshot
//!
//! Converts the visible rows of a vt100 screen into styled ratatui lines so
//! that child output can be shown under the spinner with its colours and
//! attributes intact.
//!
//! Only the last `rows` non-blank rows are kept: a child that printed three
//! lines on a 24-row pseudo-terminal shows three lines, not 21 blank ones.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

fn vt100_color_to_ratatui(color: vt100::Color) -> Option<Color> {
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(idx) => Some(Color::Indexed(idx)),
        vt100::Color::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
    }
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut style = Style::default();
    if let Some(fg) = vt100_color_to_ratatui(cell.fgcolor()) {
        style = style.fg(fg);
    }
    if let Some(bg) = vt100_color_to_ratatui(cell.bgcolor()) {
        style = style.bg(bg);
    }
    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

/// One screen row as spans, merging runs of identically styled cells and
/// dropping trailing blanks.
fn row_to_line(screen: &vt100::Screen, row: u16, cols: u16) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();

    for col in 0..cols {
        let Some(cell) = screen.cell(row, col) else {
            continue;
        };
        if cell.is_wide_continuation() {
            continue;
        }
        let contents = cell.contents();
        let contents = if contents.is_empty() { " " } else { contents };
        let style = cell_style(cell);
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push_str(contents);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }

    // Trim trailing unstyled whitespace.
    while let Some(last) = spans.last_mut() {
        if last.style != Style::default() {
            break;
        }
        let trimmed = last.content.trim_end().to_string();
        if trimmed.is_empty() {
            spans.pop();
        } else {
            last.content = trimmed.into();
            break;
        }
    }
    Line::from(spans)
}

/// The last `rows` rows of the screen that hold output.
pub fn screen_tail(parser: &vt100::Parser, rows: usize) -> Vec<Line<'static>> {
    let screen = parser.screen();
    let (height, width) = screen.size();
    let lines: Vec<Line<'static>> = (0..height).map(|row| row_to_line(screen, row, width)).collect();
    let used = lines
        .iter()
        .rposition(|line| !line.spans.is_empty())
        .map_or(0, |last| last + 1);
    let start = used.saturating_sub(rows);
    lines.into_iter().take(used).skip(start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_plain_output_rows() {
        let mut parser = vt100::Parser::new(10, 20, 0);
        parser.process(b"one\r\ntwo\r\nthree\r\n");
        let lines = screen_tail(&parser, 5);
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(text, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_tail_keeps_last_rows() {
        let mut parser = vt100::Parser::new(10, 20, 0);
        parser.process(b"a\r\nb\r\nc\r\nd");
        let text: Vec<String> = screen_tail(&parser, 2).iter().map(plain).collect();
        assert_eq!(text, vec!["c", "d"]);
    }

    #[test]
    fn test_colours_and_attributes_survive() {
        let mut parser = vt100::Parser::new(2, 20, 0);
        parser.process(b"\x1b[1;31mred\x1b[0m ok");
        let lines = screen_tail(&parser, 1);
        let first = &lines[0].spans[0];
        assert_eq!(first.content, "red");
        assert_eq!(first.style.fg, Some(Color::Indexed(1)));
        assert!(first.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&lines[0]), "red ok");
    }

    #[test]
    fn test_empty_screen_has_no_lines() {
        let parser = vt100::Parser::new(5, 10, 0);
        assert!(screen_tail(&parser, 3).is_empty());
    }
}
