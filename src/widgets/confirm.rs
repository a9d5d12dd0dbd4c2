//! `knit confirm`: ask a yes/no question, answer through the exit status.

use super::{inline_options, Status};
use crate::config::{flag, Padding};
use crate::exit::{Outcome, Output};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::stdin;
use crate::ui::render::{help_line, pad};
use crate::ui::Theme;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span, Text};
use std::io::{self, BufRead};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct ConfirmArgs {
    /// Question to ask
    #[arg(default_value = "Are you sure?")]
    pub prompt: String,

    #[arg(long, default_value = "Yes", env = "KNIT_CONFIRM_AFFIRMATIVE")]
    pub affirmative: String,

    /// Label of the negative answer (empty hides it)
    #[arg(long, default_value = "No", env = "KNIT_CONFIRM_NEGATIVE")]
    pub negative: String,

    /// Start on the affirmative answer; also the answer on timeout
    #[arg(
        long,
        env = "KNIT_CONFIRM_DEFAULT",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub default: bool,

    #[arg(long)]
    pub no_default: bool,

    /// Print the prompt and the chosen answer
    #[arg(long, env = "KNIT_CONFIRM_SHOW_OUTPUT", value_parser = BoolishValueParser::new())]
    pub show_output: bool,

    #[arg(
        long,
        env = "KNIT_CONFIRM_SHOW_HELP",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub show_help: bool,

    #[arg(long, hide = true)]
    pub no_show_help: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_CONFIRM_TIMEOUT")]
    pub timeout: Duration,

    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_CONFIRM_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMsg {
    Tick,
}

pub struct Confirm {
    prompt: String,
    affirmative: String,
    negative: String,
    theme: &'static Theme,
    /// Focused answer: `true` is affirmative.
    focus: bool,
    default: bool,
    answer: Option<bool>,
    show_help: bool,
    padding: Padding,
    timeout: Timeout<bool>,
    status: Status,
}

impl Confirm {
    pub fn new(prompt: impl Into<String>, default: bool, theme: &'static Theme) -> Self {
        Self {
            prompt: prompt.into(),
            affirmative: "Yes".to_string(),
            negative: "No".to_string(),
            theme,
            focus: default,
            default,
            answer: None,
            show_help: true,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, Some(self.default));
        self
    }

    fn has_negative(&self) -> bool {
        !self.negative.is_empty()
    }

    pub fn focus(&self) -> bool {
        self.focus
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn answer(&mut self, yes: bool) -> Cmd<ConfirmMsg> {
        self.answer = Some(yes);
        self.status = Status::Committed;
        Cmd::Quit
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<ConfirmMsg> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('y' | 'Y') if !ctrl => self.answer(true),
            KeyCode::Char('n' | 'N' | 'q') if !ctrl && self.has_negative() => self.answer(false),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab
            | KeyCode::Char('h' | 'l') => {
                if self.has_negative() {
                    self.focus = !self.focus;
                }
                Cmd::None
            }
            KeyCode::Char('p' | 'n') if ctrl && self.has_negative() => {
                self.focus = !self.focus;
                Cmd::None
            }
            KeyCode::Enter => self.answer(self.focus || !self.has_negative()),
            KeyCode::Esc => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            _ => Cmd::None,
        }
    }

    pub fn outcome(&self, show_output: bool) -> Outcome {
        let Some(yes) = self.answer else {
            return match self.status {
                Status::TimedOut => Outcome::TimedOut(None),
                _ => Outcome::Aborted,
            };
        };
        let output = show_output.then(|| {
            let label = if yes { &self.affirmative } else { &self.negative };
            Output::Line(format!("{} {}", self.prompt, label))
        });
        if yes {
            Outcome::Committed(output)
        } else {
            Outcome::Declined(output)
        }
    }

    fn button(&self, label: &str, yes: bool) -> Span<'static> {
        let mut text = format!("  {label}");
        if yes == self.default {
            text.push_str(&self.timeout.label());
        }
        text.push_str("  ");
        Span::styled(text, self.theme.button(self.focus == yes))
    }
}

impl Model for Confirm {
    type Msg = ConfirmMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<ConfirmMsg> {
        self.timeout.schedule(|| ConfirmMsg::Tick)
    }

    fn update(&mut self, event: Event<ConfirmMsg>) -> Cmd<ConfirmMsg> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Msg(ConfirmMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| ConfirmMsg::Tick),
                Tick::Expired(Some(default)) => {
                    tracing::debug!(default, "confirm timed out");
                    self.answer(default)
                }
                Tick::Expired(None) => {
                    self.status = Status::TimedOut;
                    Cmd::Quit
                }
                Tick::Ignored => Cmd::None,
            },
            Event::Paste(_) | Event::Resize { .. } => Cmd::None,
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut lines = vec![
            Line::from(Span::styled(self.prompt.clone(), theme.header())),
            Line::default(),
        ];
        let mut buttons = vec![self.button(&self.affirmative, true)];
        if self.has_negative() {
            buttons.push(Span::raw("  "));
            buttons.push(self.button(&self.negative, false));
        }
        lines.push(Line::from(buttons));
        if self.show_help {
            lines.push(Line::default());
            lines.push(help_line(
                theme,
                &[("←/→", "toggle"), ("enter", "submit"), ("y", "affirm"), ("n", "deny")],
            ));
        }
        pad(Text::from(lines), self.padding)
    }
}

/// Answer from a single piped line: `Some(true)` for `y`/`yes`,
/// `Some(false)` for anything else, `None` when there was nothing.
pub fn piped_answer<R: BufRead>(mut reader: R) -> io::Result<Option<bool>> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    if answer.is_empty() {
        return Ok(None);
    }
    Ok(Some(matches!(answer.as_str(), "y" | "yes")))
}

pub async fn run(args: ConfirmArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    if stdin::detect()?.is_readable() {
        if let Some(yes) = piped_answer(io::stdin().lock())? {
            tracing::debug!(yes, "answered from stdin");
            return Ok(if yes {
                Outcome::Committed(None)
            } else {
                Outcome::Declined(None)
            });
        }
    }

    let default = flag(args.default, args.no_default);
    let mut model = Confirm::new(args.prompt.clone(), default, theme).with_timeout(args.timeout);
    model.affirmative = args.affirmative.clone();
    model.negative = args.negative.clone();
    model.show_help = flag(args.show_help, args.no_show_help);
    model.padding = args.padding;
    if !model.has_negative() {
        model.focus = true;
    }

    let rows = if model.show_help { 5 } else { 3 };
    let model = Program::new(model, inline_options(rows, args.padding)).run().await?;
    Ok(model.outcome(args.show_output))
}
