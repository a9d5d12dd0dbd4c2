//! `knit choose`: pick one or more options from a list.

use super::{gather, inline_options, split_names, Status};
use crate::config::{flag, Padding};
use crate::error::Error;
use crate::exit::{Outcome, Output};
use crate::runtime::{is_ctrl, parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::select::{candidates, join_values, Candidate, Edge, Limit, Matcher, Selection};
use crate::ui::render::{header_lines, help_line, pad, pagination_dots};
use crate::ui::Theme;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span, Text};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Args)]
pub struct ChooseArgs {
    /// Options to choose from (read from stdin when omitted)
    pub options: Vec<String>,

    /// Maximum number of options to pick
    #[arg(long, default_value_t = 1, env = "KNIT_CHOOSE_LIMIT")]
    pub limit: usize,

    /// Pick any number of options
    #[arg(long, env = "KNIT_CHOOSE_NO_LIMIT", value_parser = BoolishValueParser::new())]
    pub no_limit: bool,

    /// Emit options in the order they were picked
    #[arg(long, env = "KNIT_CHOOSE_ORDERED", value_parser = BoolishValueParser::new())]
    pub ordered: bool,

    /// Height of the list
    #[arg(long, default_value_t = 10, env = "KNIT_CHOOSE_HEIGHT")]
    pub height: usize,

    /// Prefix for the option under the cursor
    #[arg(long, default_value = "> ", env = "KNIT_CHOOSE_CURSOR")]
    pub cursor: String,

    /// Header shown above the list
    #[arg(long, default_value = "Choose:", env = "KNIT_CHOOSE_HEADER")]
    pub header: String,

    /// Prefix for the unselected option under the cursor
    #[arg(long, default_value = "• ", env = "KNIT_CHOOSE_CURSOR_PREFIX")]
    pub cursor_prefix: String,

    /// Prefix for selected options
    #[arg(long, default_value = "✓ ", env = "KNIT_CHOOSE_SELECTED_PREFIX")]
    pub selected_prefix: String,

    /// Prefix for unselected options
    #[arg(long, default_value = "• ", env = "KNIT_CHOOSE_UNSELECTED_PREFIX")]
    pub unselected_prefix: String,

    /// Options selected on start (`*` for all)
    #[arg(long, env = "KNIT_CHOOSE_SELECTED")]
    pub selected: Vec<String>,

    /// Pick the only option without showing the list
    #[arg(long, env = "KNIT_CHOOSE_SELECT_IF_ONE", value_parser = BoolishValueParser::new())]
    pub select_if_one: bool,

    /// Delimiter between piped options
    #[arg(long, default_value = "\n", env = "KNIT_CHOOSE_INPUT_DELIMITER")]
    pub input_delimiter: String,

    /// Delimiter between emitted options
    #[arg(long, default_value = "\n", env = "KNIT_CHOOSE_OUTPUT_DELIMITER")]
    pub output_delimiter: String,

    /// Split each option into `label<delimiter>value`
    #[arg(long, default_value = "", env = "KNIT_CHOOSE_LABEL_DELIMITER")]
    pub label_delimiter: String,

    /// Strip ANSI sequences from options
    #[arg(
        long,
        env = "KNIT_CHOOSE_STRIP_ANSI",
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

    /// Show the key help line
    #[arg(
        long,
        env = "KNIT_CHOOSE_SHOW_HELP",
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

    /// Give up after this long (0 disables)
    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_CHOOSE_TIMEOUT")]
    pub timeout: Duration,

    /// Padding around the widget (CSS order)
    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_CHOOSE_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChooseMsg {
    Tick,
}

pub struct Choose {
    selection: Selection,
    theme: &'static Theme,
    cursor: String,
    header: String,
    cursor_prefix: String,
    selected_prefix: String,
    unselected_prefix: String,
    show_help: bool,
    padding: Padding,
    timeout: Timeout<()>,
    status: Status,
}

impl Choose {
    pub fn new(items: Vec<Candidate>, limit: Limit, height: usize, theme: &'static Theme) -> Self {
        let mut selection = Selection::new(items, Matcher::default(), limit, Edge::Clamp);
        selection.set_height(height.max(1));
        Self {
            selection,
            theme,
            cursor: "> ".to_string(),
            header: String::new(),
            cursor_prefix: "• ".to_string(),
            selected_prefix: "✓ ".to_string(),
            unselected_prefix: "• ".to_string(),
            show_help: true,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    fn from_args(args: &ChooseArgs, items: Vec<Candidate>, theme: &'static Theme) -> Self {
        let limit = Limit::from_flags(args.limit, args.no_limit);
        let mut choose = Self::new(items, limit, args.height, theme);
        choose.cursor = args.cursor.clone();
        choose.header = args.header.clone();
        choose.cursor_prefix = args.cursor_prefix.clone();
        choose.selected_prefix = args.selected_prefix.clone();
        choose.unselected_prefix = args.unselected_prefix.clone();
        choose.show_help = flag(args.show_help, args.no_show_help);
        choose.padding = args.padding;
        choose.timeout = Timeout::new(args.timeout, None);
        choose.selection.preselect(&split_names(&args.selected));
        choose
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn multi(&self) -> bool {
        !self.selection.limit().is_single()
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<ChooseMsg> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Down | KeyCode::Char('j') if !ctrl => self.selection.move_down(),
            KeyCode::Char('n') if ctrl => self.selection.move_down(),
            KeyCode::Up | KeyCode::Char('k') if !ctrl => self.selection.move_up(),
            KeyCode::Char('p') if ctrl => self.selection.move_up(),
            KeyCode::Right | KeyCode::Char('l') if !ctrl => self.selection.page_down(),
            KeyCode::Char('f') if ctrl => self.selection.page_down(),
            KeyCode::Left | KeyCode::Char('h') if !ctrl => self.selection.page_up(),
            KeyCode::Char('b') if ctrl => self.selection.page_up(),
            KeyCode::Home | KeyCode::Char('g') => self.selection.home(),
            KeyCode::End | KeyCode::Char('G') => self.selection.end(),
            KeyCode::Char(' ' | 'x') | KeyCode::Tab if self.multi() => {
                self.selection.toggle_current();
            }
            KeyCode::Char('a') if self.selection.limit() == Limit::Unlimited => {
                self.selection.toggle_all();
            }
            KeyCode::Enter => {
                self.status = Status::Committed;
                return Cmd::Quit;
            }
            KeyCode::Esc => {
                self.status = Status::Aborted;
                return Cmd::Quit;
            }
            _ => {}
        }
        Cmd::None
    }

    fn item_line(&self, row: usize, index: usize) -> Line<'static> {
        let theme = self.theme;
        let Some(candidate) = self.selection.candidates().get(index) else {
            return Line::default();
        };
        let at_cursor = row == self.selection.cursor();
        let selected = self.selection.is_selected(index);

        let mut spans = Vec::with_capacity(3);
        if at_cursor {
            spans.push(Span::styled(self.cursor.clone(), theme.cursor()));
        } else {
            spans.push(Span::raw(" ".repeat(self.cursor.width())));
        }
        if self.multi() {
            let (prefix, style) = if selected {
                (&self.selected_prefix, theme.selected())
            } else if at_cursor {
                (&self.cursor_prefix, theme.cursor())
            } else {
                (&self.unselected_prefix, theme.dim())
            };
            spans.push(Span::styled(prefix.clone(), style));
        }
        let style = if selected {
            theme.selected()
        } else if at_cursor {
            theme.cursor()
        } else {
            theme.text()
        };
        spans.push(Span::styled(candidate.label.clone(), style));
        Line::from(spans)
    }

    fn rows(&self) -> usize {
        let header = self.header.lines().count();
        let list = self.selection.matches().len().min(self.selection.height());
        let dots = usize::from(self.selection.pages().0 > 1);
        header + list + dots + usize::from(self.show_help)
    }
}

impl Model for Choose {
    type Msg = ChooseMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<ChooseMsg> {
        self.timeout.schedule(|| ChooseMsg::Tick)
    }

    fn update(&mut self, event: Event<ChooseMsg>) -> Cmd<ChooseMsg> {
        match event {
            Event::Key(key) if is_ctrl(&key, 'a') && self.selection.limit() == Limit::Unlimited => {
                self.selection.toggle_all();
                Cmd::None
            }
            Event::Key(key) => self.handle_key(key),
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Msg(ChooseMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| ChooseMsg::Tick),
                Tick::Expired(_) => {
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
        let mut lines = header_lines(theme, &self.header);
        for (row, m) in self.selection.visible() {
            lines.push(self.item_line(row, m.index));
        }
        let (pages, page) = self.selection.pages();
        if pages > 1 {
            lines.push(pagination_dots(theme, pages, page));
        }
        if self.show_help {
            let mut keys: Vec<(&str, &str)> = vec![("↑/↓", "navigate")];
            if self.multi() {
                keys.push(("x", "toggle"));
            }
            if self.selection.limit() == Limit::Unlimited {
                keys.push(("a", "all"));
            }
            keys.push(("enter", "submit"));
            let mut help = help_line(theme, &keys);
            let label = self.timeout.label();
            if !label.is_empty() {
                help.spans.push(Span::styled(label, theme.dim()));
            }
            lines.push(help);
        }
        pad(Text::from(lines), self.padding)
    }
}

pub async fn run(args: ChooseArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let strip = flag(args.strip_ansi, args.no_strip_ansi);
    let items = gather(&args.options, &args.input_delimiter, strip)?;
    if items.is_empty() {
        return Err(Error::NoOptions("choose").into());
    }
    let items = candidates(&items, &args.label_delimiter);

    if args.select_if_one && items.len() == 1 {
        tracing::debug!("single option, skipping the list");
        let value = items[0].value.clone();
        return Ok(Outcome::Committed(Some(Output::Line(value))));
    }

    let model = Choose::from_args(&args, items, theme);
    let options = inline_options(model.rows(), args.padding);
    let model = Program::new(model, options).run().await?;
    Ok(model.outcome(args.ordered, &args.output_delimiter))
}

impl Choose {
    /// Final outcome of a finished session.
    pub fn outcome(&self, ordered: bool, delimiter: &str) -> Outcome {
        match self.status {
            Status::Committed => {
                let picked = self.selection.commit(ordered);
                Outcome::Committed(Some(Output::Line(join_values(&picked, delimiter))))
            }
            Status::TimedOut => Outcome::TimedOut(None),
            Status::Declined => Outcome::Declined(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{feed, run_scripted};
    use crate::runtime::ScriptedEvents;

    fn model(items: &[&str], limit: Limit) -> Choose {
        let items = items.iter().map(|s| Candidate::new(*s)).collect();
        Choose::new(items, limit, 10, Theme::default_theme())
    }

    fn key(code: KeyCode) -> Event<ChooseMsg> {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_single_pick_commits_cursor_item() {
        let mut choose = model(&["a", "b", "c"], Limit::One);
        let quit = feed(&mut choose, [key(KeyCode::Down), key(KeyCode::Enter)]);
        assert!(quit);
        assert_eq!(choose.outcome(false, "\n"), Outcome::committed("b"));
    }

    #[test]
    fn test_navigation_clamps() {
        let mut choose = model(&["a", "b"], Limit::One);
        feed(&mut choose, [key(KeyCode::Up), key(KeyCode::Down), key(KeyCode::Down)]);
        assert_eq!(choose.selection().cursor(), 1);
    }

    #[test]
    fn test_multi_select_respects_limit() {
        let mut choose = model(&["a", "b", "c"], Limit::AtMost(2));
        feed(
            &mut choose,
            [
                key(KeyCode::Char('x')),
                key(KeyCode::Down),
                key(KeyCode::Char('x')),
                key(KeyCode::Down),
                key(KeyCode::Char('x')),
                key(KeyCode::Enter),
            ],
        );
        assert_eq!(choose.outcome(false, ","), Outcome::committed("a,b"));
    }

    #[test]
    fn test_ordered_output_follows_selection_order() {
        let mut choose = model(&["a", "b", "c"], Limit::Unlimited);
        feed(
            &mut choose,
            [
                key(KeyCode::End),
                key(KeyCode::Char(' ')),
                key(KeyCode::Home),
                key(KeyCode::Char(' ')),
                key(KeyCode::Enter),
            ],
        );
        assert_eq!(choose.outcome(true, ","), Outcome::committed("c,a"));
        assert_eq!(choose.outcome(false, ","), Outcome::committed("a,c"));
    }

    #[test]
    fn test_toggle_all_only_without_limit() {
        let mut limited = model(&["a", "b"], Limit::AtMost(5));
        feed(&mut limited, [key(KeyCode::Char('a'))]);
        assert_eq!(limited.selection().selected_count(), 0);

        let mut unlimited = model(&["a", "b"], Limit::Unlimited);
        feed(&mut unlimited, [key(KeyCode::Char('a'))]);
        assert_eq!(unlimited.selection().selected_count(), 2);
    }

    #[test]
    fn test_escape_and_interrupt_abort() {
        let mut choose = model(&["a"], Limit::One);
        assert!(feed(&mut choose, [key(KeyCode::Esc)]));
        assert_eq!(choose.outcome(false, "\n").exit_code(), 130);

        let mut choose = model(&["a"], Limit::One);
        assert!(feed(&mut choose, [Event::Interrupt]));
        assert_eq!(choose.outcome(false, "\n"), Outcome::Aborted);
    }

    #[test]
    fn test_pagination_dots_when_list_overflows() {
        let items: Vec<Candidate> = (0..12).map(|i| Candidate::new(format!("item {i}"))).collect();
        let choose = Choose::new(items, Limit::One, 5, Theme::default_theme());
        let view = choose.view();
        // five items, the dots and the help line
        assert_eq!(view.lines.len(), 7);
        let dots: String = view.lines[5].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(dots, "•••");
    }

    #[tokio::test]
    async fn test_scripted_session_picks_second_item() {
        let events = ScriptedEvents::keys([KeyCode::Char('j'), KeyCode::Enter]);
        let choose = run_scripted(model(&["red", "green", "blue"], Limit::One), events, (40, 6))
            .await
            .unwrap();
        assert_eq!(choose.outcome(false, "\n"), Outcome::committed("green"));
    }
}
