//! Single-line text editor used by `input`, `filter` and the pager search.

use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

#[derive(Debug, Clone, Default)]
pub struct TextInput {
    chars: Vec<char>,
    cursor: usize,
    /// Maximum number of characters, 0 for unlimited.
    pub char_limit: usize,
    /// Visible columns for the value, 0 for unlimited.
    pub width: usize,
    pub prompt: String,
    pub placeholder: String,
    pub password: bool,
}

impl TextInput {
    pub fn new(prompt: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            placeholder: placeholder.into(),
            ..Self::default()
        }
    }

    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the value and move the cursor to its end.
    pub fn set_value(&mut self, value: &str) {
        self.chars = value.chars().filter(|c| !c.is_control()).collect();
        if self.char_limit > 0 {
            self.chars.truncate(self.char_limit);
        }
        self.cursor = self.chars.len();
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            if self.char_limit > 0 && self.chars.len() >= self.char_limit {
                break;
            }
            self.chars.insert(self.cursor, c);
            self.cursor += 1;
        }
    }

    /// Apply an editing key. Returns `true` when the value changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let before = self.chars.len();
        match key.code {
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.chars.len(),
            KeyCode::Char('b') if ctrl => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Char('f') if ctrl => self.cursor = (self.cursor + 1).min(self.chars.len()),
            KeyCode::Char('u') if ctrl => {
                self.chars.drain(..self.cursor);
                self.cursor = 0;
                return true;
            }
            KeyCode::Char('k') if ctrl => {
                self.chars.truncate(self.cursor);
                return before != self.chars.len();
            }
            KeyCode::Char('w') if ctrl => return self.delete_word_backward(),
            KeyCode::Backspace if alt => return self.delete_word_backward(),
            KeyCode::Char('h') if ctrl => return self.backspace(),
            KeyCode::Char('d') if ctrl => return self.delete(),
            KeyCode::Char(c) if !ctrl && !alt => {
                self.insert_str(&c.to_string());
                return before != self.chars.len();
            }
            KeyCode::Backspace => return self.backspace(),
            KeyCode::Delete => return self.delete(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.chars.len(),
            _ => {}
        }
        false
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    fn delete_word_backward(&mut self) -> bool {
        let mut start = self.cursor;
        while start > 0 && self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        if start == self.cursor {
            return false;
        }
        self.chars.drain(start..self.cursor);
        self.cursor = start;
        true
    }

    /// Prompt, value and a block cursor.
    pub fn view(&self, theme: &Theme, focused: bool) -> Line<'static> {
        let mut spans = vec![Span::styled(self.prompt.clone(), theme.cursor())];
        let cursor_style = Style::default().add_modifier(Modifier::REVERSED);

        if self.chars.is_empty() {
            let mut placeholder = self.placeholder.chars();
            if focused {
                let first = placeholder.next().map_or_else(|| " ".to_string(), String::from);
                spans.push(Span::styled(first, cursor_style.fg(theme.fg_dim)));
            }
            let rest: String = placeholder.collect();
            if !rest.is_empty() {
                spans.push(Span::styled(rest, theme.dim()));
            }
            return Line::from(spans);
        }

        let shown: Vec<char> = if self.password {
            vec!['*'; self.chars.len()]
        } else {
            self.chars.clone()
        };
        let start = if self.width > 0 && self.cursor >= self.width {
            self.cursor + 1 - self.width
        } else {
            0
        };
        let end = if self.width > 0 {
            (start + self.width).min(shown.len())
        } else {
            shown.len()
        };

        let before: String = shown[start..self.cursor.min(end)].iter().collect();
        spans.push(Span::styled(before, theme.text()));
        if focused {
            let at = shown.get(self.cursor).map_or_else(|| " ".to_string(), char::to_string);
            spans.push(Span::styled(at, cursor_style));
            if self.cursor + 1 < end {
                let after: String = shown[self.cursor + 1..end].iter().collect();
                spans.push(Span::styled(after, theme.text()));
            }
        } else if self.cursor < end {
            let after: String = shown[self.cursor..end].iter().collect();
            spans.push(Span::styled(after, theme.text()));
        }
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn typed(text: &str) -> TextInput {
        let mut input = TextInput::new("> ", "");
        for c in text.chars() {
            input.handle_key(&key(KeyCode::Char(c)));
        }
        input
    }

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut input = typed("helo");
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Char('l')));
        assert_eq!(input.value(), "hello");
        input.handle_key(&key(KeyCode::End));
        assert!(input.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "hell");
    }

    #[test]
    fn test_char_limit_stops_insertion() {
        let mut input = TextInput::new("", "");
        input.char_limit = 3;
        input.insert_str("abcdef");
        assert_eq!(input.value(), "abc");
        assert!(!input.handle_key(&key(KeyCode::Char('x'))));
    }

    #[test]
    fn test_kill_shortcuts() {
        let mut input = typed("one two three");
        assert!(input.handle_key(&ctrl('w')));
        assert_eq!(input.value(), "one two ");
        input.handle_key(&ctrl('a'));
        input.handle_key(&key(KeyCode::Right));
        input.handle_key(&ctrl('k'));
        assert_eq!(input.value(), "o");
        input.handle_key(&key(KeyCode::End));
        input.handle_key(&ctrl('u'));
        assert!(input.is_empty());
    }

    #[test]
    fn test_password_is_masked() {
        let mut input = typed("secret");
        input.password = true;
        let text = plain(&input.view(Theme::default_theme(), false));
        assert_eq!(text, "> ******");
    }

    #[test]
    fn test_placeholder_when_empty() {
        let input = TextInput::new("> ", "Type...");
        assert_eq!(plain(&input.view(Theme::default_theme(), true)), "> Type...");
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let mut input = TextInput::new("", "");
        input.set_value("a\tb\nc");
        assert_eq!(input.value(), "abc");
    }
}
