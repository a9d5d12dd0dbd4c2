//! `knit write`: read multi-line text.

use super::{inline_options, Status};
use crate::config::Padding;
use crate::exit::{Outcome, Output};
use crate::runtime::{is_ctrl, parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::stdin;
use crate::ui::render::{header_lines, help_line, pad};
use crate::ui::{TextArea, Theme};
use clap::builder::BoolishValueParser;
use clap::Args;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span, Text};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct WriteArgs {
    /// Text area width
    #[arg(long, default_value_t = 50, env = "KNIT_WRITE_WIDTH")]
    pub width: usize,

    /// Visible lines
    #[arg(long, default_value_t = 5, env = "KNIT_WRITE_HEIGHT")]
    pub height: usize,

    #[arg(long, default_value = "", env = "KNIT_WRITE_HEADER")]
    pub header: String,

    #[arg(long, default_value = "Write something...", env = "KNIT_WRITE_PLACEHOLDER")]
    pub placeholder: String,

    #[arg(long, default_value = "┃ ", env = "KNIT_WRITE_PROMPT")]
    pub prompt: String,

    #[arg(long, env = "KNIT_WRITE_SHOW_LINE_NUMBERS", value_parser = BoolishValueParser::new())]
    pub show_line_numbers: bool,

    /// Initial value (also read from stdin); the answer on timeout
    #[arg(long, default_value = "", env = "KNIT_WRITE_VALUE")]
    pub value: String,

    /// Maximum number of characters (0 for no limit)
    #[arg(long, default_value_t = 0, env = "KNIT_WRITE_CHAR_LIMIT")]
    pub char_limit: usize,

    /// Maximum number of lines (0 for no limit)
    #[arg(long, default_value_t = 0, env = "KNIT_WRITE_MAX_LINES")]
    pub max_lines: usize,

    #[arg(long, env = "KNIT_WRITE_SHOW_HELP", value_parser = BoolishValueParser::new())]
    pub show_help: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_WRITE_TIMEOUT")]
    pub timeout: Duration,

    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_WRITE_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMsg {
    Tick,
}

pub struct Write {
    area: TextArea,
    header: String,
    height: usize,
    theme: &'static Theme,
    show_help: bool,
    padding: Padding,
    timeout: Timeout<String>,
    timed_out_with: Option<String>,
    status: Status,
}

impl Write {
    pub fn new(area: TextArea, height: usize, theme: &'static Theme) -> Self {
        Self {
            area,
            header: String::new(),
            height: height.max(1),
            theme,
            show_help: false,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            timed_out_with: None,
            status: Status::Running,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration, default: &str) -> Self {
        let payload = (!default.is_empty()).then(|| default.to_string());
        self.timeout = Timeout::new(timeout, payload);
        self
    }

    pub fn value(&self) -> String {
        self.area.value()
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            Status::Committed => Outcome::committed(self.area.value()),
            Status::TimedOut => Outcome::TimedOut(self.timed_out_with.clone().map(Output::Line)),
            Status::Declined => Outcome::Declined(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }

    fn finish(&mut self, status: Status) -> Cmd<WriteMsg> {
        self.status = status;
        Cmd::Quit
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<WriteMsg> {
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if alt => {
                self.area.insert_newline();
            }
            KeyCode::Char('j') if is_ctrl(&key, 'j') => {
                self.area.insert_newline();
            }
            KeyCode::Enter => return self.finish(Status::Committed),
            KeyCode::Char('d') if is_ctrl(&key, 'd') => return self.finish(Status::Committed),
            KeyCode::Esc => return self.finish(Status::Aborted),
            _ => {
                self.area.handle_key(&key);
            }
        }
        self.area.scroll_to_cursor(self.height);
        Cmd::None
    }
}

impl Model for Write {
    type Msg = WriteMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<WriteMsg> {
        self.timeout.schedule(|| WriteMsg::Tick)
    }

    fn update(&mut self, event: Event<WriteMsg>) -> Cmd<WriteMsg> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => {
                self.area.insert_str(&text);
                self.area.scroll_to_cursor(self.height);
                Cmd::None
            }
            Event::Interrupt => self.finish(Status::Aborted),
            Event::Msg(WriteMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| WriteMsg::Tick),
                Tick::Expired(payload) => {
                    self.timed_out_with = payload;
                    self.finish(Status::TimedOut)
                }
                Tick::Ignored => Cmd::None,
            },
            Event::Resize { .. } => Cmd::None,
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut lines = header_lines(theme, &self.header);
        lines.extend(self.area.view(theme, self.height));
        let label = self.timeout.label();
        if self.show_help || !label.is_empty() {
            let mut help = if self.show_help {
                help_line(
                    theme,
                    &[("ctrl+j", "new line"), ("enter", "submit"), ("esc", "cancel")],
                )
            } else {
                Line::default()
            };
            help.spans.push(Span::styled(label, theme.dim()));
            lines.push(help);
        }
        pad(Text::from(lines), self.padding)
    }
}

pub async fn run(args: WriteArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let piped = stdin::read(false)?;
    let initial = if piped.is_empty() {
        args.value.clone()
    } else {
        piped.trim_end_matches('\n').to_string()
    };

    let mut area = TextArea::default();
    area.char_limit = args.char_limit;
    area.max_lines = args.max_lines;
    area.prompt = args.prompt.clone();
    area.placeholder = args.placeholder.clone();
    area.show_line_numbers = args.show_line_numbers;
    area.set_value(&initial);
    area.scroll_to_cursor(args.height);

    let mut model = Write::new(area, args.height, theme).with_timeout(args.timeout, &args.value);
    model.header = args.header.clone();
    model.show_help = args.show_help;
    model.padding = args.padding;

    let help = usize::from(args.show_help || !args.timeout.is_zero());
    let rows = model.header.lines().count() + model.height + help;
    let model = Program::new(model, inline_options(rows, args.padding)).run().await?;
    Ok(model.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{feed, run_scripted};
    use crate::runtime::ScriptedEvents;

    fn key(code: KeyCode) -> Event<WriteMsg> {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event<WriteMsg> {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn model() -> Write {
        Write::new(TextArea::default(), 3, Theme::default_theme())
    }

    fn typed(text: &str) -> Vec<Event<WriteMsg>> {
        text.chars().map(|c| key(KeyCode::Char(c))).collect()
    }

    #[test]
    fn test_ctrl_j_inserts_newline_enter_commits() {
        let mut write = model();
        feed(&mut write, typed("one"));
        feed(&mut write, [ctrl('j')]);
        feed(&mut write, typed("two"));
        assert!(feed(&mut write, [key(KeyCode::Enter)]));
        assert_eq!(write.outcome(), Outcome::committed("one\ntwo"));
    }

    #[test]
    fn test_alt_enter_inserts_newline() {
        let mut write = model();
        feed(&mut write, typed("a"));
        let quit = feed(
            &mut write,
            [Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT))],
        );
        assert!(!quit);
        assert_eq!(write.value(), "a\n");
    }

    #[test]
    fn test_ctrl_d_commits() {
        let mut write = model();
        feed(&mut write, typed("x"));
        assert!(feed(&mut write, [ctrl('d')]));
        assert_eq!(write.outcome(), Outcome::committed("x"));
    }

    #[test]
    fn test_paste_drops_carriage_returns() {
        let mut write = model();
        feed(&mut write, [Event::Paste("a\r\nb".into()), key(KeyCode::Enter)]);
        assert_eq!(write.outcome(), Outcome::committed("a\nb"));
    }

    #[tokio::test]
    async fn test_scripted_abort() {
        let events = ScriptedEvents::keys([KeyCode::Char('z'), KeyCode::Esc]);
        let write = run_scripted(model(), events, (40, 5)).await.unwrap();
        assert_eq!(write.outcome(), Outcome::Aborted);
    }
}
