//! `knit pager`: scroll through text with regex search.

use crate::config::flag;
use crate::exit::Outcome;
use crate::pager::{render_rows, Search, Viewport, GUTTER_WIDTH};
use crate::runtime::{
    is_ctrl, parse_duration, Cmd, Event, KeyInput, Model, OutputChannel, Program, ProgramOptions, Tick, Timeout,
};
use crate::stdin;
use crate::ui::render::help_line;
use crate::ui::{TextInput, Theme};
use crate::widgets::Status;
use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span, Text};
use std::io::{IsTerminal, Write};
use std::time::Duration;

/// Rows below the text: the search prompt or a blank row, then help.
const CHROME_ROWS: usize = 2;

#[derive(Debug, Clone, Args)]
pub struct PagerArgs {
    /// Text to show (read from stdin when omitted)
    pub content: Option<String>,

    #[arg(
        long,
        env = "KNIT_PAGER_SHOW_LINE_NUMBERS",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub show_line_numbers: bool,

    #[arg(long, hide = true)]
    pub no_show_line_numbers: bool,

    #[arg(
        long,
        env = "KNIT_PAGER_SOFT_WRAP",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub soft_wrap: bool,

    #[arg(long, hide = true)]
    pub no_soft_wrap: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_PAGER_TIMEOUT")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerMsg {
    Tick,
}

pub struct Pager {
    viewport: Viewport,
    search: Option<Search>,
    /// Present while the search prompt is open.
    prompt: Option<TextInput>,
    line_numbers: bool,
    theme: &'static Theme,
    timeout: Timeout<()>,
    status: Status,
}

impl Pager {
    pub fn new(content: &str, soft_wrap: bool, line_numbers: bool, theme: &'static Theme) -> Self {
        let content = content.replace('\t', "    ");
        Self {
            viewport: Viewport::new(&content, soft_wrap),
            search: None,
            prompt: None,
            line_numbers,
            theme,
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, None);
        self
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn search(&self) -> Option<&Search> {
        self.search.as_ref()
    }

    pub fn is_searching(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            Status::TimedOut => Outcome::TimedOut(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
            Status::Committed | Status::Declined => Outcome::Committed(None),
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        let gutter = if self.line_numbers { GUTTER_WIDTH } else { 0 };
        let width = usize::from(width).saturating_sub(gutter);
        let height = usize::from(height).saturating_sub(CHROME_ROWS);
        self.viewport.set_size(width, height);
    }

    fn reveal_current(&mut self) {
        if let Some(hit) = self.search.as_ref().and_then(Search::current_hit) {
            let (line, byte) = (hit.line, hit.range.start);
            self.viewport.reveal(line, byte);
        }
    }

    fn search_key(&mut self, key: KeyEvent) -> Cmd<PagerMsg> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Cmd::None;
        };
        match key.code {
            KeyCode::Enter => {
                let query = prompt.value();
                self.prompt = None;
                if query.is_empty() {
                    return Cmd::None;
                }
                let mut search = Search::run(&query, self.viewport.content());
                search.next();
                tracing::debug!(query, matches = search.len(), "pager search");
                self.search = Some(search);
                self.reveal_current();
            }
            KeyCode::Esc => self.prompt = None,
            KeyCode::Char('d') if is_ctrl(&key, 'd') => self.prompt = None,
            _ => {
                prompt.handle_key(&key);
            }
        }
        Cmd::None
    }

    fn browse_key(&mut self, key: KeyEvent) -> Cmd<PagerMsg> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.status = Status::Committed;
                return Cmd::Quit;
            }
            KeyCode::Char('u') if ctrl => self.viewport.half_page_up(),
            KeyCode::Char('d') if ctrl => self.viewport.half_page_down(),
            KeyCode::Up | KeyCode::Char('k') => self.viewport.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.viewport.scroll_down(1),
            KeyCode::PageUp | KeyCode::Char('b') => self.viewport.page_up(),
            KeyCode::PageDown | KeyCode::Char('f' | ' ') => self.viewport.page_down(),
            KeyCode::Home | KeyCode::Char('g') => self.viewport.top(),
            KeyCode::End | KeyCode::Char('G') => self.viewport.bottom(),
            KeyCode::Char('/') => {
                self.prompt = Some(TextInput::new("/", ""));
            }
            KeyCode::Char('n') => {
                if let Some(search) = self.search.as_mut() {
                    search.next();
                }
                self.reveal_current();
            }
            KeyCode::Char('N' | 'p') => {
                if let Some(search) = self.search.as_mut() {
                    search.prev();
                }
                self.reveal_current();
            }
            _ => {}
        }
        Cmd::None
    }

    fn status_line(&self) -> Line<'static> {
        let theme = self.theme;
        let mut bindings = vec![("↑/↓", "navigate"), ("q", "quit"), ("/", "search")];
        if self.search.as_ref().is_some_and(|s| !s.is_empty()) {
            bindings.push(("n", "next match"));
            bindings.push(("N", "prev match"));
        }
        let mut line = help_line(theme, &bindings);
        if let Some(search) = &self.search {
            let position = search.current().map_or(0, |i| i + 1);
            line.spans.push(Span::styled(
                format!("  {}/{} \"{}\"", position, search.len(), search.query()),
                theme.dim(),
            ));
        }
        line.spans.push(Span::styled(
            format!("  {}%", self.viewport.scroll_percent()),
            theme.dim(),
        ));
        let label = self.timeout.label();
        if !label.is_empty() {
            line.spans.push(Span::styled(label, theme.dim()));
        }
        line
    }
}

impl Model for Pager {
    type Msg = PagerMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<PagerMsg> {
        self.timeout.schedule(|| PagerMsg::Tick)
    }

    fn update(&mut self, event: Event<PagerMsg>) -> Cmd<PagerMsg> {
        match event {
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Key(key) if self.prompt.is_some() => self.search_key(key),
            Event::Key(key) => self.browse_key(key),
            Event::Paste(text) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.insert_str(&text);
                }
                Cmd::None
            }
            Event::Resize { width, height } => {
                self.resize(width, height);
                Cmd::None
            }
            Event::Msg(PagerMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| PagerMsg::Tick),
                Tick::Expired(_) => {
                    self.status = Status::TimedOut;
                    Cmd::Quit
                }
                Tick::Ignored => Cmd::None,
            },
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut lines = render_rows(&self.viewport, self.search.as_ref(), theme, self.line_numbers);
        let shown = lines.len();
        if self.line_numbers {
            lines.extend(
                (shown..self.viewport.height()).map(|_| Line::from(Span::styled("   ~ │ ", theme.dim()))),
            );
        } else {
            lines.extend((shown..self.viewport.height()).map(|_| Line::default()));
        }
        match &self.prompt {
            Some(prompt) => lines.push(prompt.view(theme, true)),
            None => lines.push(Line::default()),
        }
        lines.push(self.status_line());
        Text::from(lines)
    }
}

pub async fn run(args: PagerArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let content = match &args.content {
        Some(content) => content.clone(),
        None => stdin::read(true)?,
    };

    // Nothing to page through on a pipe.
    if !std::io::stdout().is_terminal() {
        let mut out = std::io::stdout().lock();
        out.write_all(content.as_bytes())
            .and_then(|()| out.flush())
            .context("failed to write content")?;
        return Ok(Outcome::Committed(None));
    }

    let line_numbers = flag(args.show_line_numbers, args.no_show_line_numbers);
    let soft_wrap = flag(args.soft_wrap, args.no_soft_wrap);
    let model = Pager::new(&content, soft_wrap, line_numbers, theme).with_timeout(args.timeout);

    let options = ProgramOptions::from_env()
        .output(OutputChannel::Stdout)
        .alt_screen(true);
    let model = Program::new(model, options).run().await?;
    Ok(model.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{feed, run_scripted};
    use crate::runtime::ScriptedEvents;

    fn key(code: KeyCode) -> Event<PagerMsg> {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn typed(text: &str) -> Vec<Event<PagerMsg>> {
        text.chars().map(|c| key(KeyCode::Char(c))).collect()
    }

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    fn pager(content: &str) -> Pager {
        let mut pager = Pager::new(content, true, true, Theme::default_theme());
        // 10 text rows.
        feed(&mut pager, [Event::Resize { width: 40, height: 12 }]);
        pager
    }

    #[test]
    fn test_navigation_keys() {
        let mut model = pager(&numbered(50));
        feed(&mut model, [key(KeyCode::Char('j')), key(KeyCode::Down)]);
        assert_eq!(model.viewport().y_offset(), 2);
        feed(&mut model, [key(KeyCode::Char('G'))]);
        assert_eq!(model.viewport().y_offset(), 40);
        feed(&mut model, [key(KeyCode::Char('b'))]);
        assert_eq!(model.viewport().y_offset(), 30);
        feed(&mut model, [key(KeyCode::Home)]);
        assert_eq!(model.viewport().y_offset(), 0);
    }

    #[test]
    fn test_search_reveals_and_wraps() {
        let mut model = pager(&numbered(50));
        feed(&mut model, [key(KeyCode::Char('/'))]);
        assert!(model.is_searching());
        feed(&mut model, typed("line 4[05]"));
        feed(&mut model, [key(KeyCode::Enter)]);
        assert!(!model.is_searching());

        let search = model.search().unwrap();
        assert_eq!(search.len(), 2);
        assert_eq!(search.current_hit().unwrap().line, 39);
        assert!(model.viewport().y_offset() <= 39);
        assert!(model.viewport().y_offset() + 10 > 39);

        feed(&mut model, [key(KeyCode::Char('n')), key(KeyCode::Char('n'))]);
        assert_eq!(model.search().unwrap().current(), Some(0));
        feed(&mut model, [key(KeyCode::Char('N'))]);
        assert_eq!(model.search().unwrap().current(), Some(1));
    }

    #[test]
    fn test_invalid_pattern_finds_nothing() {
        let mut model = pager("abc\n");
        feed(&mut model, [key(KeyCode::Char('/'))]);
        feed(&mut model, typed("(["));
        feed(&mut model, [key(KeyCode::Enter)]);
        assert!(model.search().unwrap().is_empty());
        assert!(!feed(&mut model, [key(KeyCode::Char('n'))]));
    }

    #[test]
    fn test_escape_leaves_search_then_quits() {
        let mut model = pager("abc\n");
        feed(&mut model, [key(KeyCode::Char('/'))]);
        assert!(!feed(&mut model, [key(KeyCode::Esc)]));
        assert!(feed(&mut model, [key(KeyCode::Esc)]));
        assert_eq!(model.outcome().exit_code(), 0);
    }

    #[test]
    fn test_short_content_is_padded_with_tildes() {
        let model = pager("only\n");
        let text = model.view();
        assert_eq!(text.lines.len(), 12);
        let second: String = text.lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(second, "   ~ │ ");
    }

    #[tokio::test]
    async fn test_ctrl_c_aborts() {
        let events = ScriptedEvents::new([crossterm::event::Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        ))]);
        let model = run_scripted(Pager::new("x", true, false, Theme::default_theme()), events, (20, 5))
            .await
            .unwrap();
        assert_eq!(model.outcome().exit_code(), 130);
    }
}
