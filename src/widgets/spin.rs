//! `knit spin`: show a spinner while a command runs.
//!
//! The command is started before the UI so a missing program fails fast
//! with status 127. Child events are forwarded into the session by a
//! stream command; the spinner itself animates on its own tick.

use crate::exit::{Outcome, Output};
use crate::process::{spawn, ChildEvent, ChildHandle, ExecutionStatus, Mode};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, ProgramOptions, Tick, Timeout};
use crate::ui::terminal_widget::screen_tail;
use crate::ui::Theme;
use crate::widgets::Status;
use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{Args, ValueEnum};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use std::io::{IsTerminal, Write};
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Time the child gets to exit after SIGINT before it is killed.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Rows of child output shown under the spinner with `--show-output`.
const OUTPUT_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SpinnerKind {
    Line,
    #[default]
    Dot,
    Minidot,
    Jump,
    Pulse,
    Points,
    Globe,
    Moon,
    Monkey,
    Meter,
    Hamburger,
}

impl SpinnerKind {
    pub fn frames(self) -> &'static [&'static str] {
        match self {
            SpinnerKind::Line => &["|", "/", "-", "\\"],
            SpinnerKind::Dot => &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "],
            SpinnerKind::Minidot => &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            SpinnerKind::Jump => &["⢄", "⢂", "⢁", "⡁", "⡈", "⡐", "⡠"],
            SpinnerKind::Pulse => &["█", "▓", "▒", "░"],
            SpinnerKind::Points => &["∙∙∙", "●∙∙", "∙●∙", "∙∙●"],
            SpinnerKind::Globe => &["🌍", "🌎", "🌏"],
            SpinnerKind::Moon => &["🌑", "🌒", "🌓", "🌔", "🌕", "🌖", "🌗", "🌘"],
            SpinnerKind::Monkey => &["🙈", "🙉", "🙊"],
            SpinnerKind::Meter => &["▱▱▱", "▰▱▱", "▰▰▱", "▰▰▰", "▰▰▱", "▰▱▱", "▱▱▱"],
            SpinnerKind::Hamburger => &["☱", "☲", "☴", "☲"],
        }
    }

    pub fn interval(self) -> Duration {
        let fps = match self {
            SpinnerKind::Line | SpinnerKind::Dot | SpinnerKind::Jump => 10,
            SpinnerKind::Minidot => 12,
            SpinnerKind::Pulse | SpinnerKind::Moon => 8,
            SpinnerKind::Points | SpinnerKind::Meter => 7,
            SpinnerKind::Globe => 4,
            SpinnerKind::Monkey | SpinnerKind::Hamburger => 3,
        };
        Duration::from_secs(1) / fps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Align {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Args)]
pub struct SpinArgs {
    /// Command to run
    #[arg(last = true, required = true)]
    pub command: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = SpinnerKind::Dot, env = "KNIT_SPIN_SPINNER")]
    pub spinner: SpinnerKind,

    #[arg(long, default_value = "Loading...", env = "KNIT_SPIN_TITLE")]
    pub title: String,

    /// Spinner position relative to the title
    #[arg(long, value_enum, default_value_t = Align::Left, env = "KNIT_SPIN_ALIGN")]
    pub align: Align,

    /// Show the command's output under the spinner
    #[arg(long, env = "KNIT_SPIN_SHOW_OUTPUT", value_parser = BoolishValueParser::new())]
    pub show_output: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_SPIN_TIMEOUT")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinMsg {
    Frame,
    Output(Vec<u8>),
    Exited(i32),
    Timeout,
    /// The grace period after SIGINT has passed.
    Escalate,
}

pub struct Spin {
    kind: SpinnerKind,
    frame: usize,
    title: String,
    align: Align,
    theme: &'static Theme,
    child: Option<ChildHandle>,
    events: Option<Receiver<ChildEvent>>,
    /// Rendered child output, present with `--show-output`.
    screen: Option<vt100::Parser>,
    translate_newlines: bool,
    execution: ExecutionStatus,
    exit_code: Option<i32>,
    /// Set once the child has been asked to stop.
    stopping: Option<Status>,
    timeout: Timeout<()>,
}

impl Spin {
    pub fn new(
        child: ChildHandle,
        events: Receiver<ChildEvent>,
        kind: SpinnerKind,
        title: impl Into<String>,
        theme: &'static Theme,
    ) -> Self {
        Self {
            kind,
            frame: 0,
            title: title.into(),
            align: Align::Left,
            theme,
            translate_newlines: child.mode() == Mode::Pipes,
            child: Some(child),
            events: Some(events),
            screen: None,
            execution: ExecutionStatus::Running,
            exit_code: None,
            stopping: None,
            timeout: Timeout::disabled(),
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Render the child's output under the spinner.
    pub fn show_output(mut self, rows: u16, cols: u16) -> Self {
        self.screen = Some(vt100::Parser::new(rows.max(1), cols.max(1), 0));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, None);
        self
    }

    pub fn execution(&self) -> ExecutionStatus {
        self.execution
    }

    pub fn spinner_frame(&self) -> &'static str {
        let frames = self.kind.frames();
        frames[self.frame % frames.len()]
    }

    /// Final status. Child stdout becomes the payload of a normal exit.
    pub fn outcome(&self) -> Outcome {
        match self.stopping {
            Some(Status::TimedOut) => return Outcome::TimedOut(None),
            Some(_) => return Outcome::Aborted,
            None => {}
        }
        let code = self.exit_code.unwrap_or(1);
        let stdout = self.child.as_ref().map(ChildHandle::take_stdout).unwrap_or_default();
        Outcome::Exited {
            code,
            output: (!stdout.is_empty()).then_some(Output::Raw(stdout)),
        }
    }

    /// Error output kept for a failed run.
    pub fn take_errors(&self) -> Vec<u8> {
        self.child.as_ref().map(ChildHandle::take_errors).unwrap_or_default()
    }

    fn stop(&mut self, reason: Status) -> Cmd<SpinMsg> {
        if self.stopping.is_some() {
            return Cmd::None;
        }
        self.stopping = Some(reason);
        match &self.child {
            Some(child) if !child.has_exited() => {
                tracing::debug!(pid = child.pid(), ?reason, "interrupting child group");
                child.interrupt();
                Cmd::tick(KILL_GRACE, |_| SpinMsg::Escalate)
            }
            _ => Cmd::Quit,
        }
    }

    fn record_output(&mut self, chunk: &[u8]) {
        let Some(screen) = self.screen.as_mut() else {
            return;
        };
        if self.translate_newlines {
            let mut translated = Vec::with_capacity(chunk.len() + 8);
            for &b in chunk {
                if b == b'\n' {
                    translated.push(b'\r');
                }
                translated.push(b);
            }
            screen.process(&translated);
        } else {
            screen.process(chunk);
        }
    }

    fn spinner_line(&self) -> Line<'static> {
        let spinner = Span::styled(self.spinner_frame(), Style::default().fg(self.theme.accent));
        let title = Span::styled(self.title.clone(), self.theme.text());
        let label = Span::styled(self.timeout.label(), self.theme.dim());
        match self.align {
            Align::Left => Line::from(vec![spinner, Span::raw(" "), title, label]),
            Align::Right => Line::from(vec![title, label, Span::raw(" "), spinner]),
        }
    }
}

impl Model for Spin {
    type Msg = SpinMsg;

    fn key_input(&self) -> KeyInput {
        KeyInput::Unused
    }

    fn init(&mut self) -> Cmd<SpinMsg> {
        let forward = match self.events.take() {
            Some(events) => Cmd::stream(move |emitter| {
                for event in events.iter() {
                    let msg = match event {
                        ChildEvent::Output(chunk) => SpinMsg::Output(chunk),
                        ChildEvent::Exited(code) => SpinMsg::Exited(code),
                    };
                    if !emitter.emit(msg) {
                        break;
                    }
                }
            }),
            None => Cmd::None,
        };
        Cmd::batch([
            Cmd::tick(self.kind.interval(), |_| SpinMsg::Frame),
            forward,
            self.timeout.schedule(|| SpinMsg::Timeout),
        ])
    }

    fn update(&mut self, event: Event<SpinMsg>) -> Cmd<SpinMsg> {
        match event {
            Event::Interrupt => self.stop(Status::Aborted),
            Event::Msg(SpinMsg::Frame) => {
                self.frame = self.frame.wrapping_add(1);
                Cmd::tick(self.kind.interval(), |_| SpinMsg::Frame)
            }
            Event::Msg(SpinMsg::Output(chunk)) => {
                self.record_output(&chunk);
                Cmd::None
            }
            Event::Msg(SpinMsg::Exited(code)) => {
                tracing::debug!(code, "child exited");
                self.exit_code = Some(code);
                self.execution = ExecutionStatus::from_code(code);
                Cmd::Quit
            }
            Event::Msg(SpinMsg::Timeout) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| SpinMsg::Timeout),
                Tick::Expired(_) => self.stop(Status::TimedOut),
                Tick::Ignored => Cmd::None,
            },
            Event::Msg(SpinMsg::Escalate) => {
                if let Some(child) = &self.child {
                    tracing::debug!(pid = child.pid(), "grace period over, killing child group");
                    child.kill();
                }
                Cmd::None
            }
            Event::Resize { width, height } => {
                if let Some(child) = &self.child {
                    child.resize(height, width);
                }
                if let Some(screen) = self.screen.as_mut() {
                    screen.screen_mut().set_size(height.max(1), width.max(1));
                }
                Cmd::None
            }
            Event::Key(_) | Event::Paste(_) => Cmd::None,
        }
    }

    fn view(&self) -> Text<'static> {
        let mut lines = vec![self.spinner_line()];
        if let Some(screen) = &self.screen {
            lines.extend(screen_tail(screen, OUTPUT_ROWS));
        }
        Text::from(lines)
    }
}

pub async fn run(args: SpinArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
    let mode = if std::io::stdout().is_terminal() {
        Mode::Pty { rows, cols }
    } else {
        Mode::Pipes
    };
    let (child, events) = spawn(&args.command, mode, args.show_output)?;
    tracing::debug!(command = ?args.command, ?mode, "spinning");

    let mut model = Spin::new(child, events, args.spinner, args.title.clone(), theme)
        .align(args.align)
        .with_timeout(args.timeout);
    let mut height = 1;
    if args.show_output {
        model = model.show_output(rows, cols);
        height += OUTPUT_ROWS;
    }

    let options = ProgramOptions::from_env().inline_height(height as u16);
    let model = Program::new(model, options).run().await?;

    let outcome = model.outcome();
    if !args.show_output && model.execution() == ExecutionStatus::Failed {
        let errors = model.take_errors();
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(&errors)
            .and_then(|()| stderr.flush())
            .context("failed to print command errors")?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::feed;
    use crate::runtime::Headless;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    fn spin(parts: &[&str], tee: bool) -> Spin {
        let (child, events) = spawn(&cmd(parts), Mode::Pipes, tee).unwrap();
        Spin::new(child, events, SpinnerKind::Line, "Working", Theme::default_theme())
    }

    async fn run_headless(model: Spin) -> Spin {
        Program::new(model, ProgramOptions::default())
            .run_with(Headless::with_size(80, 24), None)
            .await
            .unwrap()
    }

    #[test]
    fn test_every_kind_has_frames_and_interval() {
        for kind in SpinnerKind::value_variants() {
            assert!(!kind.frames().is_empty());
            assert!(kind.interval() > Duration::ZERO);
        }
    }

    #[tokio::test]
    async fn test_stdout_is_the_payload() {
        let model = run_headless(spin(&["printf", "hello"], false)).await;
        assert_eq!(model.execution(), ExecutionStatus::Succeeded);
        assert_eq!(
            model.outcome(),
            Outcome::Exited {
                code: 0,
                output: Some(Output::Raw(b"hello".to_vec()))
            }
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_status_and_errors() {
        let model = run_headless(spin(&["sh", "-c", "echo bad >&2; exit 42"], false)).await;
        assert_eq!(model.execution(), ExecutionStatus::Failed);
        assert_eq!(model.outcome().exit_code(), 42);
        assert_eq!(model.take_errors(), b"bad\n");
    }

    #[tokio::test]
    async fn test_timeout_stops_child_with_124() {
        let model = spin(&["sleep", "30"], false).with_timeout(Duration::from_secs(1));
        let model = run_headless(model).await;
        assert_eq!(model.outcome().exit_code(), 124);
    }

    #[tokio::test]
    async fn test_show_output_renders_child_lines() {
        let model = spin(&["printf", "one\\ntwo\\n"], true).show_output(10, 40);
        let model = run_headless(model).await;
        let text = model.view();
        let rendered: Vec<String> = text
            .lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(&rendered[1..], ["one", "two"]);
    }

    #[test]
    fn test_interrupt_signals_then_waits() {
        let mut model = spin(&["sleep", "30"], false);
        let cmd = model.update(Event::Interrupt);
        assert!(matches!(cmd, Cmd::Tick(after, _) if after == KILL_GRACE));
        assert_eq!(model.outcome(), Outcome::Aborted);
        // A second interrupt does not restart the escalation.
        assert!(!feed(&mut model, [Event::Interrupt]));
    }

    #[test]
    fn test_alignment() {
        let model = spin(&["true"], false).align(Align::Right);
        let line = model.spinner_line();
        assert_eq!(line.spans[0].content, "Working");
        assert_eq!(line.spans.last().map(|s| s.content.as_ref()), Some("|"));
    }
}
