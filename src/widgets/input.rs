//! `knit input`: read a single line.

use super::{inline_options, Status};
use crate::config::{flag, Padding};
use crate::exit::{Outcome, Output};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::stdin;
use crate::ui::render::{header_lines, help_line, pad};
use crate::ui::{TextInput, Theme};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::KeyCode;
use ratatui::text::{Span, Text};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    #[arg(long, default_value = "> ", env = "KNIT_INPUT_PROMPT")]
    pub prompt: String,

    #[arg(long, default_value = "Type something...", env = "KNIT_INPUT_PLACEHOLDER")]
    pub placeholder: String,

    /// Initial value (also read from stdin); the answer on timeout
    #[arg(long, default_value = "", env = "KNIT_INPUT_VALUE")]
    pub value: String,

    /// Mask the typed characters
    #[arg(long, env = "KNIT_INPUT_PASSWORD", value_parser = BoolishValueParser::new())]
    pub password: bool,

    /// Maximum number of characters (0 for no limit)
    #[arg(long, default_value_t = 400, env = "KNIT_INPUT_CHAR_LIMIT")]
    pub char_limit: usize,

    /// Input width (0 for the terminal width)
    #[arg(long, default_value_t = 0, env = "KNIT_INPUT_WIDTH")]
    pub width: usize,

    #[arg(long, default_value = "", env = "KNIT_INPUT_HEADER")]
    pub header: String,

    #[arg(
        long,
        env = "KNIT_INPUT_STRIP_ANSI",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub strip_ansi: bool,

    #[arg(long, hide = true)]
    pub no_strip_ansi: bool,

    #[arg(long, env = "KNIT_INPUT_SHOW_HELP", value_parser = BoolishValueParser::new())]
    pub show_help: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_INPUT_TIMEOUT")]
    pub timeout: Duration,

    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_INPUT_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMsg {
    Tick,
}

pub struct Input {
    input: TextInput,
    header: String,
    theme: &'static Theme,
    show_help: bool,
    padding: Padding,
    timeout: Timeout<String>,
    timed_out_with: Option<String>,
    status: Status,
}

impl Input {
    pub fn new(input: TextInput, theme: &'static Theme) -> Self {
        Self {
            input,
            header: String::new(),
            theme,
            show_help: false,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            timed_out_with: None,
            status: Status::Running,
        }
    }

    /// Give up after `timeout`, committing `default` when it is non-empty.
    pub fn with_timeout(mut self, timeout: Duration, default: &str) -> Self {
        let payload = (!default.is_empty()).then(|| default.to_string());
        self.timeout = Timeout::new(timeout, payload);
        self
    }

    pub fn value(&self) -> String {
        self.input.value()
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            Status::Committed => Outcome::committed(self.input.value()),
            Status::TimedOut => match &self.timed_out_with {
                Some(value) => Outcome::TimedOut(Some(Output::line(value.clone()))),
                None => Outcome::TimedOut(None),
            },
            Status::Declined => Outcome::Declined(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }
}

impl Model for Input {
    type Msg = InputMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<InputMsg> {
        self.timeout.schedule(|| InputMsg::Tick)
    }

    fn update(&mut self, event: Event<InputMsg>) -> Cmd<InputMsg> {
        match event {
            Event::Key(key) => match key.code {
                KeyCode::Enter => {
                    self.status = Status::Committed;
                    Cmd::Quit
                }
                KeyCode::Esc => {
                    self.status = Status::Aborted;
                    Cmd::Quit
                }
                _ => {
                    self.input.handle_key(&key);
                    Cmd::None
                }
            },
            Event::Paste(text) => {
                self.input.insert_str(&text);
                Cmd::None
            }
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Msg(InputMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| InputMsg::Tick),
                Tick::Expired(payload) => {
                    self.timed_out_with = payload;
                    self.status = Status::TimedOut;
                    Cmd::Quit
                }
                Tick::Ignored => Cmd::None,
            },
            Event::Resize { width, .. } => {
                if self.input.width == 0 {
                    let prompt = self.input.prompt.width();
                    self.input.width = usize::from(width).saturating_sub(prompt + 1).max(1);
                }
                Cmd::None
            }
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut lines = header_lines(theme, &self.header);
        let mut line = self.input.view(theme, true);
        let label = self.timeout.label();
        if !label.is_empty() {
            line.spans.push(Span::styled(label, theme.dim()));
        }
        lines.push(line);
        if self.show_help {
            lines.push(help_line(theme, &[("enter", "submit"), ("esc", "cancel")]));
        }
        pad(Text::from(lines), self.padding)
    }
}

pub async fn run(args: InputArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let strip = flag(args.strip_ansi, args.no_strip_ansi);
    let piped = stdin::read(strip)?;
    let initial = if piped.is_empty() {
        args.value.clone()
    } else {
        piped.trim_end_matches(['\n', '\r']).to_string()
    };

    let mut editor = TextInput::new(args.prompt.clone(), args.placeholder.clone());
    editor.char_limit = args.char_limit;
    editor.width = args.width;
    editor.password = args.password;
    editor.set_value(&initial);

    let mut model = Input::new(editor, theme).with_timeout(args.timeout, &args.value);
    model.header = args.header.clone();
    model.show_help = args.show_help;
    model.padding = args.padding;

    let rows = model.header.lines().count() + 1 + usize::from(model.show_help);
    let model = Program::new(model, inline_options(rows, args.padding)).run().await?;
    Ok(model.outcome())
}
