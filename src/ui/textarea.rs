//! Multi-line editor for the `write` widget.

use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

#[derive(Debug, Clone)]
pub struct TextArea {
    lines: Vec<Vec<char>>,
    row: usize,
    col: usize,
    top: usize,
    /// Maximum total characters, 0 for unlimited.
    pub char_limit: usize,
    /// Maximum number of lines, 0 for unlimited.
    pub max_lines: usize,
    pub prompt: String,
    pub placeholder: String,
    pub show_line_numbers: bool,
}

impl Default for TextArea {
    fn default() -> Self {
        Self {
            lines: vec![Vec::new()],
            row: 0,
            col: 0,
            top: 0,
            char_limit: 0,
            max_lines: 0,
            prompt: String::new(),
            placeholder: String::new(),
            show_line_numbers: false,
        }
    }
}

impl TextArea {
    pub fn value(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn total_chars(&self) -> usize {
        self.lines.iter().map(Vec::len).sum::<usize>() + self.lines.len() - 1
    }

    fn has_room(&self) -> bool {
        self.char_limit == 0 || self.total_chars() < self.char_limit
    }

    pub fn set_value(&mut self, value: &str) {
        self.lines = vec![Vec::new()];
        self.row = 0;
        self.col = 0;
        self.insert_str(value);
    }

    /// Insert text, turning newlines into line breaks.
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\n' => {
                    self.insert_newline();
                }
                '\r' => {}
                '\t' => self.insert_char(' '),
                c if c.is_control() => {}
                c => self.insert_char(c),
            }
        }
    }

    fn insert_char(&mut self, c: char) {
        if !self.has_room() {
            return;
        }
        self.lines[self.row].insert(self.col, c);
        self.col += 1;
    }

    pub fn insert_newline(&mut self) -> bool {
        if self.max_lines > 0 && self.lines.len() >= self.max_lines {
            return false;
        }
        if !self.has_room() {
            return false;
        }
        let rest = self.lines[self.row].split_off(self.col);
        self.row += 1;
        self.lines.insert(self.row, rest);
        self.col = 0;
        true
    }

    /// Apply an editing key. Newline insertion is left to the caller.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('a') if ctrl => self.col = 0,
            KeyCode::Char('e') if ctrl => self.col = self.lines[self.row].len(),
            KeyCode::Char('u') if ctrl => {
                self.lines[self.row].drain(..self.col);
                self.col = 0;
                return true;
            }
            KeyCode::Char('k') if ctrl => {
                self.lines[self.row].truncate(self.col);
                return true;
            }
            KeyCode::Char(c) if !ctrl && !alt => {
                self.insert_char(c);
                return true;
            }
            KeyCode::Backspace => return self.backspace(),
            KeyCode::Delete => return self.delete(),
            KeyCode::Left => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = self.lines[self.row].len();
                }
            }
            KeyCode::Right => {
                if self.col < self.lines[self.row].len() {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
            }
            KeyCode::Up => {
                if self.row > 0 {
                    self.row -= 1;
                    self.col = self.col.min(self.lines[self.row].len());
                }
            }
            KeyCode::Down => {
                if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = self.col.min(self.lines[self.row].len());
                }
            }
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = self.lines[self.row].len(),
            _ => {}
        }
        false
    }

    fn backspace(&mut self) -> bool {
        if self.col > 0 {
            self.col -= 1;
            self.lines[self.row].remove(self.col);
            true
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.lines[self.row].len();
            self.lines[self.row].extend(line);
            true
        } else {
            false
        }
    }

    fn delete(&mut self) -> bool {
        if self.col < self.lines[self.row].len() {
            self.lines[self.row].remove(self.col);
            true
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].extend(next);
            true
        } else {
            false
        }
    }

    /// Keep the cursor row within a window of `height` rows.
    pub fn scroll_to_cursor(&mut self, height: usize) {
        let height = height.max(1);
        if self.row < self.top {
            self.top = self.row;
        } else if self.row >= self.top + height {
            self.top = self.row + 1 - height;
        }
    }

    pub fn view(&self, theme: &Theme, height: usize) -> Vec<Line<'static>> {
        let height = height.max(1);
        let cursor_style = Style::default().add_modifier(Modifier::REVERSED);
        let number_width = self.lines.len().to_string().len();

        (self.top..self.top + height)
            .map(|row| {
                let mut spans = vec![Span::styled(self.prompt.clone(), theme.dim())];
                if self.show_line_numbers {
                    let number = if row < self.lines.len() {
                        format!("{:>number_width$} ", row + 1)
                    } else {
                        format!("{:>number_width$} ", "")
                    };
                    spans.push(Span::styled(number, theme.dim()));
                }
                if self.is_empty() && row == 0 {
                    let mut chars = self.placeholder.chars();
                    let first = chars.next().map_or_else(|| " ".to_string(), String::from);
                    spans.push(Span::styled(first, cursor_style.fg(theme.fg_dim)));
                    spans.push(Span::styled(chars.collect::<String>(), theme.dim()));
                    return Line::from(spans);
                }
                let Some(line) = self.lines.get(row) else {
                    return Line::from(spans);
                };
                if row == self.row {
                    let before: String = line[..self.col].iter().collect();
                    let at = line.get(self.col).map_or_else(|| " ".to_string(), char::to_string);
                    let after: String = line.get(self.col + 1..).map(|rest| rest.iter().collect()).unwrap_or_default();
                    spans.push(Span::styled(before, theme.text()));
                    spans.push(Span::styled(at, cursor_style));
                    spans.push(Span::styled(after, theme.text()));
                } else {
                    spans.push(Span::styled(line.iter().collect::<String>(), theme.text()));
                }
                Line::from(spans)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_newlines_split_lines() {
        let mut area = TextArea::default();
        area.insert_str("ab");
        area.insert_newline();
        area.insert_str("cd");
        assert_eq!(area.value(), "ab\ncd");
        assert_eq!(area.position(), (1, 2));
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut area = TextArea::default();
        area.set_value("ab\ncd");
        area.handle_key(&key(KeyCode::Home));
        assert!(area.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(area.value(), "abcd");
        assert_eq!(area.position(), (0, 2));
    }

    #[test]
    fn test_max_lines_blocks_newline() {
        let mut area = TextArea {
            max_lines: 2,
            ..TextArea::default()
        };
        assert!(area.insert_newline());
        assert!(!area.insert_newline());
        assert_eq!(area.value(), "\n");
    }

    #[test]
    fn test_char_limit_counts_line_breaks() {
        let mut area = TextArea {
            char_limit: 4,
            ..TextArea::default()
        };
        area.set_value("ab\ncdef");
        assert_eq!(area.value(), "ab\nc");
    }

    #[test]
    fn test_carriage_returns_are_dropped() {
        let mut area = TextArea::default();
        area.set_value("one\r\ntwo");
        assert_eq!(area.value(), "one\ntwo");
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut area = TextArea::default();
        area.set_value("1\n2\n3\n4\n5");
        area.scroll_to_cursor(2);
        let lines = area.view(Theme::default_theme(), 2);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(first, "4");
    }
}
