//! `knit progress`: count progress indicators arriving on stdin.

use crate::error::Error;
use crate::exit::{Outcome, Output};
use crate::progress::{count_indicators, ProgressInfo, Template};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, ProgramOptions, Tick, Timeout};
use crate::stdin;
use crate::ui::Theme;
use crate::widgets::Status;
use chrono::Local;
use clap::builder::BoolishValueParser;
use clap::Args;
use ratatui::text::{Line, Span, Text};
use std::io::{self, Read};
use std::time::{Duration, Instant};

const REFRESH: Duration = Duration::from_millis(250);
const CHUNK: usize = 4096;

#[derive(Debug, Clone, Args)]
pub struct ProgressArgs {
    #[arg(long, default_value = "", env = "KNIT_PROGRESS_TITLE")]
    pub title: String,

    /// Expected number of indicators (0 when unknown)
    #[arg(short, long, default_value_t = 0, env = "KNIT_PROGRESS_LIMIT")]
    pub limit: u64,

    /// Line template, see `{Title} {Iter} {Limit} {Elapsed} {Avg} {Pct} {Remaining} {Eta} {Bar}`
    #[arg(short, long, env = "KNIT_PROGRESS_FORMAT")]
    pub format: Option<String>,

    /// Byte sequence counted as one unit of progress
    #[arg(long, default_value = "\n", env = "KNIT_PROGRESS_INDICATOR")]
    pub progress_indicator: String,

    /// Drop the indicator from echoed output
    #[arg(long, env = "KNIT_PROGRESS_HIDE_INDICATOR", value_parser = BoolishValueParser::new())]
    pub hide_progress_indicator: bool,

    /// Echo the consumed input on stdout
    #[arg(short = 'o', long, env = "KNIT_PROGRESS_SHOW_OUTPUT", value_parser = BoolishValueParser::new())]
    pub show_output: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_PROGRESS_TIMEOUT")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMsg {
    Chunk(Vec<u8>, Instant),
    Eof,
    Failed(String),
    Refresh,
    Timeout,
}

type Source = Box<dyn Read + Send>;

pub struct Progress {
    info: ProgressInfo,
    template: Template,
    theme: &'static Theme,
    indicator: Vec<u8>,
    carry: Vec<u8>,
    echo: Option<Vec<u8>>,
    hide_indicator: bool,
    width: usize,
    source: Option<Source>,
    failure: Option<String>,
    timeout: Timeout<()>,
    status: Status,
}

impl Progress {
    pub fn new(info: ProgressInfo, template: Template, source: Source, theme: &'static Theme) -> Self {
        Self {
            info,
            template,
            theme,
            indicator: b"\n".to_vec(),
            carry: Vec::new(),
            echo: None,
            hide_indicator: false,
            width: 80,
            source: Some(source),
            failure: None,
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    pub fn indicator(mut self, indicator: &str) -> Self {
        self.indicator = indicator.as_bytes().to_vec();
        self
    }

    /// Keep the consumed input for the result stream.
    pub fn echo(mut self, hide_indicator: bool) -> Self {
        self.echo = Some(Vec::new());
        self.hide_indicator = hide_indicator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, None);
        self
    }

    pub fn info(&self) -> &ProgressInfo {
        &self.info
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            Status::Committed => Outcome::Committed(self.echoed().map(Output::Raw)),
            Status::TimedOut => Outcome::TimedOut(None),
            Status::Declined => Outcome::Declined(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }

    fn echoed(&self) -> Option<Vec<u8>> {
        let echo = self.echo.as_ref()?;
        if !self.hide_indicator || self.indicator.is_empty() {
            return Some(echo.clone());
        }
        let mut out = Vec::with_capacity(echo.len());
        let mut rest = echo.as_slice();
        while !rest.is_empty() {
            if rest.starts_with(&self.indicator) {
                rest = &rest[self.indicator.len()..];
            } else {
                out.push(rest[0]);
                rest = &rest[1..];
            }
        }
        Some(out)
    }

    fn finish(&mut self, status: Status) -> Cmd<ProgressMsg> {
        self.status = status;
        Cmd::Quit
    }
}

/// Read `source` to the end in chunks, one message per chunk.
fn pump(mut source: Source) -> Cmd<ProgressMsg> {
    Cmd::stream(move |emitter| {
        let mut buf = [0u8; CHUNK];
        loop {
            let msg = match source.read(&mut buf) {
                Ok(0) => ProgressMsg::Eof,
                Ok(n) => ProgressMsg::Chunk(buf[..n].to_vec(), Instant::now()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => ProgressMsg::Failed(e.to_string()),
            };
            let last = !matches!(msg, ProgressMsg::Chunk(..));
            if !emitter.emit(msg) || last {
                break;
            }
        }
    })
}

impl Model for Progress {
    type Msg = ProgressMsg;

    fn key_input(&self) -> KeyInput {
        KeyInput::Unused
    }

    fn init(&mut self) -> Cmd<ProgressMsg> {
        let reader = self.source.take().map_or(Cmd::None, pump);
        Cmd::batch([
            reader,
            Cmd::tick(REFRESH, |_| ProgressMsg::Refresh),
            self.timeout.schedule(|| ProgressMsg::Timeout),
        ])
    }

    fn update(&mut self, event: Event<ProgressMsg>) -> Cmd<ProgressMsg> {
        match event {
            Event::Interrupt => self.finish(Status::Aborted),
            Event::Msg(ProgressMsg::Chunk(chunk, at)) => {
                let units = count_indicators(&self.indicator, &mut self.carry, &chunk);
                self.info.increment(units, at);
                if let Some(echo) = self.echo.as_mut() {
                    echo.extend_from_slice(&chunk);
                }
                Cmd::None
            }
            Event::Msg(ProgressMsg::Eof) => {
                tracing::debug!(iter = self.info.iter(), "input finished");
                self.finish(Status::Committed)
            }
            Event::Msg(ProgressMsg::Failed(reason)) => {
                self.failure = Some(reason);
                self.finish(Status::Aborted)
            }
            Event::Msg(ProgressMsg::Refresh) => Cmd::tick(REFRESH, |_| ProgressMsg::Refresh),
            Event::Msg(ProgressMsg::Timeout) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| ProgressMsg::Timeout),
                Tick::Expired(_) => self.finish(Status::TimedOut),
                Tick::Ignored => Cmd::None,
            },
            Event::Resize { width, .. } => {
                self.width = usize::from(width);
                Cmd::None
            }
            Event::Key(_) | Event::Paste(_) => Cmd::None,
        }
    }

    fn view(&self) -> Text<'static> {
        let line = self
            .template
            .render(&self.info, Instant::now(), Local::now(), self.width);
        let mut spans = vec![Span::styled(line, self.theme.text())];
        let label = self.timeout.label();
        if !label.is_empty() {
            spans.push(Span::styled(label, self.theme.dim()));
        }
        Text::from(Line::from(spans))
    }
}

pub async fn run(args: ProgressArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let source: Source = if stdin::detect()?.is_readable() {
        Box::new(io::stdin())
    } else {
        Box::new(io::empty())
    };
    let template = Template::new(
        args.format
            .clone()
            .unwrap_or_else(|| Template::default_source(args.limit, &args.title).to_string()),
    );
    let info = ProgressInfo::new(args.title.clone(), args.limit, Instant::now());

    let mut model = Progress::new(info, template, source, theme)
        .indicator(&args.progress_indicator)
        .with_timeout(args.timeout);
    if args.show_output {
        model = model.echo(args.hide_progress_indicator);
    }

    let options = ProgramOptions::from_env().inline_height(1);
    let model = Program::new(model, options).run().await?;
    if let Some(reason) = model.failure() {
        return Err(Error::StdinRead(io::Error::other(reason.to_string())).into());
    }
    Ok(model.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::feed;
    use crate::runtime::Headless;

    fn progress(input: &'static str, limit: u64) -> Progress {
        let info = ProgressInfo::new("", limit, Instant::now());
        let template = Template::new(Template::default_source(limit, ""));
        Progress::new(info, template, Box::new(input.as_bytes()), Theme::default_theme())
    }

    async fn run_headless(model: Progress) -> Progress {
        Program::new(model, ProgramOptions::default())
            .run_with(Headless::with_size(40, 5), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_counts_lines_and_commits_at_eof() {
        let model = run_headless(progress("a\nb\nc\nd\n", 4)).await;
        assert_eq!(model.info().iter(), 4);
        assert!(model.info().is_finished());
        assert_eq!(model.outcome(), Outcome::Committed(None));
    }

    #[tokio::test]
    async fn test_show_output_echoes_input() {
        let model = run_headless(progress("one\ntwo\n", 0).echo(false)).await;
        assert_eq!(model.outcome().output(), Some(&Output::Raw(b"one\ntwo\n".to_vec())));
    }

    #[tokio::test]
    async fn test_hidden_indicator_is_stripped_from_echo() {
        let model = run_headless(progress("a.b.c.", 3).indicator(".").echo(true)).await;
        assert_eq!(model.info().iter(), 3);
        assert_eq!(model.outcome().output(), Some(&Output::Raw(b"abc".to_vec())));
    }

    #[test]
    fn test_view_shows_bar_at_width() {
        let mut model = progress("", 2);
        feed(
            &mut model,
            [
                Event::Resize { width: 20, height: 1 },
                Event::Msg(ProgressMsg::Chunk(b"x\n".to_vec(), Instant::now())),
            ],
        );
        let text: String = model.view().lines[0]
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.ends_with(" 50%"), "{text}");
        assert!(text.contains('█'));
    }

    #[test]
    fn test_interrupt_aborts() {
        let mut model = progress("", 0);
        assert!(feed(&mut model, [Event::Interrupt]));
        assert_eq!(model.outcome().exit_code(), 130);
    }

    #[test]
    fn test_read_failure_is_recorded() {
        let mut model = progress("", 0);
        feed(&mut model, [Event::Msg(ProgressMsg::Failed("broken pipe".into()))]);
        assert_eq!(model.failure(), Some("broken pipe"));
    }
}
