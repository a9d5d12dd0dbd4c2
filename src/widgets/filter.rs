//! `knit filter`: fuzzy-find options while typing a query.

use super::{gather, split_names, Status};
use crate::config::{flag, Padding};
use crate::error::Error;
use crate::exit::{Outcome, Output};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, ProgramOptions, Tick, Timeout};
use crate::select::highlight;
use crate::select::{candidates, join_values, Candidate, Edge, Limit, MatchMode, Matcher, Selection};
use crate::ui::render::{header_lines, help_line, pad};
use crate::ui::{TextInput, Theme};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span, Text};
use std::path::Path;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;
use walkdir::WalkDir;

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Options to filter (read from stdin, or the files below the current
    /// directory, when omitted)
    pub options: Vec<String>,

    /// Character for the option under the cursor
    #[arg(long, default_value = "•", env = "KNIT_FILTER_INDICATOR")]
    pub indicator: String,

    /// Prefix for selected options
    #[arg(long, default_value = " ◉ ", env = "KNIT_FILTER_SELECTED_PREFIX")]
    pub selected_prefix: String,

    /// Prefix for unselected options
    #[arg(long, default_value = " ○ ", env = "KNIT_FILTER_UNSELECTED_PREFIX")]
    pub unselected_prefix: String,

    /// Header shown above the input
    #[arg(long, default_value = "", env = "KNIT_FILTER_HEADER")]
    pub header: String,

    #[arg(long, default_value = "Filter...", env = "KNIT_FILTER_PLACEHOLDER")]
    pub placeholder: String,

    #[arg(long, default_value = "> ", env = "KNIT_FILTER_PROMPT")]
    pub prompt: String,

    /// Input width (0 for the terminal width)
    #[arg(long, default_value_t = 0, env = "KNIT_FILTER_WIDTH")]
    pub width: usize,

    /// List height (0 for the full screen)
    #[arg(long, default_value_t = 0, env = "KNIT_FILTER_HEIGHT")]
    pub height: usize,

    /// Initial query
    #[arg(long, default_value = "", env = "KNIT_FILTER_VALUE")]
    pub value: String,

    /// Show the list above the input, growing upwards
    #[arg(long, env = "KNIT_FILTER_REVERSE", value_parser = BoolishValueParser::new())]
    pub reverse: bool,

    /// Fuzzy matching (`--no-fuzzy` for exact substrings)
    #[arg(
        long,
        env = "KNIT_FILTER_FUZZY",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub fuzzy: bool,

    #[arg(long)]
    pub no_fuzzy: bool,

    /// Sort matches by score
    #[arg(
        long,
        env = "KNIT_FILTER_SORT",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub sort: bool,

    #[arg(long)]
    pub no_sort: bool,

    /// Only commit an actual match
    #[arg(
        long,
        env = "KNIT_FILTER_STRICT",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub strict: bool,

    #[arg(long)]
    pub no_strict: bool,

    /// Maximum number of options to pick
    #[arg(long, default_value_t = 1, env = "KNIT_FILTER_LIMIT")]
    pub limit: usize,

    /// Pick any number of options
    #[arg(long, env = "KNIT_FILTER_NO_LIMIT", value_parser = BoolishValueParser::new())]
    pub no_limit: bool,

    /// Emit options in the order they were picked
    #[arg(long, env = "KNIT_FILTER_ORDERED", value_parser = BoolishValueParser::new())]
    pub ordered: bool,

    /// Options selected on start (`*` for all)
    #[arg(long, env = "KNIT_FILTER_SELECTED")]
    pub selected: Vec<String>,

    /// Commit right away when exactly one option matches
    #[arg(long, env = "KNIT_FILTER_SELECT_IF_ONE", value_parser = BoolishValueParser::new())]
    pub select_if_one: bool,

    #[arg(long, default_value = "\n", env = "KNIT_FILTER_INPUT_DELIMITER")]
    pub input_delimiter: String,

    #[arg(long, default_value = "\n", env = "KNIT_FILTER_OUTPUT_DELIMITER")]
    pub output_delimiter: String,

    /// Split each option into `label<delimiter>value`
    #[arg(long, default_value = "", env = "KNIT_FILTER_LABEL_DELIMITER")]
    pub label_delimiter: String,

    #[arg(
        long,
        env = "KNIT_FILTER_STRIP_ANSI",
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

    #[arg(
        long,
        env = "KNIT_FILTER_SHOW_HELP",
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

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_FILTER_TIMEOUT")]
    pub timeout: Duration,

    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_FILTER_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMsg {
    Tick,
}

pub struct Filter {
    selection: Selection,
    input: TextInput,
    theme: &'static Theme,
    indicator: String,
    selected_prefix: String,
    unselected_prefix: String,
    header: String,
    reverse: bool,
    strict: bool,
    show_help: bool,
    fixed_height: Option<usize>,
    padding: Padding,
    timeout: Timeout<()>,
    status: Status,
}

impl Filter {
    pub fn new(items: Vec<Candidate>, matcher: Matcher, limit: Limit, theme: &'static Theme) -> Self {
        Self {
            selection: Selection::new(items, matcher, limit, Edge::Wrap),
            input: TextInput::new("> ", "Filter..."),
            theme,
            indicator: "•".to_string(),
            selected_prefix: " ◉ ".to_string(),
            unselected_prefix: " ○ ".to_string(),
            header: String::new(),
            reverse: false,
            strict: true,
            show_help: true,
            fixed_height: None,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    fn from_args(args: &FilterArgs, items: Vec<Candidate>, theme: &'static Theme) -> Self {
        let mode = if flag(args.fuzzy, args.no_fuzzy) {
            MatchMode::Fuzzy
        } else {
            MatchMode::Exact
        };
        let matcher = Matcher::new(mode, flag(args.sort, args.no_sort));
        let limit = Limit::from_flags(args.limit, args.no_limit);
        let mut filter = Self::new(items, matcher, limit, theme);
        filter.input = TextInput::new(args.prompt.clone(), args.placeholder.clone());
        filter.input.width = args.width;
        filter.indicator = args.indicator.clone();
        filter.selected_prefix = args.selected_prefix.clone();
        filter.unselected_prefix = args.unselected_prefix.clone();
        filter.header = args.header.clone();
        filter.reverse = args.reverse;
        filter.strict = flag(args.strict, args.no_strict);
        filter.show_help = flag(args.show_help, args.no_show_help);
        filter.padding = args.padding;
        filter.timeout = Timeout::new(args.timeout, None);
        filter.set_height((args.height > 0).then_some(args.height));
        filter.set_query(&args.value);
        filter.selection.preselect(&split_names(&args.selected));
        filter
    }

    /// A fixed list height, or `None` to fill the screen.
    pub fn set_height(&mut self, height: Option<usize>) {
        self.fixed_height = height;
        if let Some(height) = height {
            self.selection.set_height(height);
        }
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn set_query(&mut self, query: &str) {
        self.input.set_value(query);
        self.selection.set_query(&self.input.value());
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

    fn chrome(&self) -> usize {
        self.header.lines().count() + 1 + usize::from(self.show_help)
    }

    fn finish(&mut self, status: Status) -> Cmd<FilterMsg> {
        self.status = status;
        Cmd::Quit
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<FilterMsg> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => {
                if self.selection.matches().is_empty() && self.strict {
                    return self.finish(Status::Declined);
                }
                return self.finish(Status::Committed);
            }
            KeyCode::Esc => return self.finish(Status::Aborted),
            KeyCode::Down => self.selection.move_down(),
            KeyCode::Char('n' | 'j') if ctrl => self.selection.move_down(),
            KeyCode::Up => self.selection.move_up(),
            KeyCode::Char('p' | 'k') if ctrl => self.selection.move_up(),
            KeyCode::Tab if self.multi() => {
                self.selection.toggle_current();
                self.selection.move_down();
            }
            KeyCode::BackTab if self.multi() => {
                self.selection.toggle_current();
                self.selection.move_up();
            }
            KeyCode::Char('a') if ctrl && self.multi() => self.selection.toggle_all(),
            _ => {
                if self.input.handle_key(&key) {
                    self.selection.set_query(&self.input.value());
                }
            }
        }
        Cmd::None
    }

    fn item_line(&self, row: usize, index: usize, ranges: &[std::ops::Range<usize>]) -> Line<'static> {
        let theme = self.theme;
        let Some(candidate) = self.selection.candidates().get(index) else {
            return Line::default();
        };
        let at_cursor = row == self.selection.cursor();
        let mut spans = Vec::new();
        if at_cursor {
            spans.push(Span::styled(self.indicator.clone(), theme.cursor()));
        } else {
            spans.push(Span::raw(" ".repeat(self.indicator.width())));
        }
        if self.multi() {
            if self.selection.is_selected(index) {
                spans.push(Span::styled(self.selected_prefix.clone(), theme.selected()));
            } else {
                spans.push(Span::styled(self.unselected_prefix.clone(), theme.dim()));
            }
        } else {
            spans.push(Span::raw(" "));
        }
        let base = if at_cursor { theme.cursor() } else { theme.text() };
        spans.extend(highlight::spans(&candidate.label, ranges, base, theme.matched()));
        Line::from(spans)
    }

    /// Committed values, or the raw query when nothing matched and the
    /// filter is not strict.
    pub fn outcome(&self, ordered: bool, delimiter: &str) -> Outcome {
        match self.status {
            Status::Committed => {
                let picked = self.selection.commit(ordered);
                if picked.is_empty() {
                    return Outcome::committed(self.input.value());
                }
                Outcome::Committed(Some(Output::Line(join_values(&picked, delimiter))))
            }
            Status::Declined => Outcome::Declined(None),
            Status::TimedOut => Outcome::TimedOut(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }
}

impl Model for Filter {
    type Msg = FilterMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<FilterMsg> {
        self.timeout.schedule(|| FilterMsg::Tick)
    }

    fn update(&mut self, event: Event<FilterMsg>) -> Cmd<FilterMsg> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => {
                self.input.insert_str(&text);
                self.selection.set_query(&self.input.value());
                Cmd::None
            }
            Event::Resize { height, .. } => {
                if self.fixed_height.is_none() {
                    let rows = usize::from(height)
                        .saturating_sub(self.chrome())
                        .saturating_sub(usize::from(self.padding.top + self.padding.bottom));
                    self.selection.set_height(rows.max(1));
                }
                Cmd::None
            }
            Event::Interrupt => self.finish(Status::Aborted),
            Event::Msg(FilterMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| FilterMsg::Tick),
                Tick::Expired(_) => self.finish(Status::TimedOut),
                Tick::Ignored => Cmd::None,
            },
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut items: Vec<Line<'static>> = self
            .selection
            .visible()
            .map(|(row, m)| self.item_line(row, m.index, &m.ranges))
            .collect();
        let input = self.input.view(theme, true);

        let mut lines = header_lines(theme, &self.header);
        if self.reverse {
            items.reverse();
            let pad_rows = self.selection.height().saturating_sub(items.len());
            lines.extend((0..pad_rows).map(|_| Line::default()));
            lines.extend(items);
            lines.push(input);
        } else {
            lines.push(input);
            lines.extend(items);
        }
        if self.show_help {
            let mut keys: Vec<(&str, &str)> = vec![("↑/↓", "navigate")];
            if self.multi() {
                keys.push(("tab", "toggle"));
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

/// Files below `root`, hidden entries skipped, as relative paths.
pub fn list_files(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect()
}

pub async fn run(args: FilterArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let strip = flag(args.strip_ansi, args.no_strip_ansi);
    let mut items = gather(&args.options, &args.input_delimiter, strip)?;
    if items.is_empty() {
        tracing::debug!("no options given, listing files");
        items = list_files(Path::new("."));
    }
    if items.is_empty() {
        return Err(Error::NoOptions("filter").into());
    }

    let model = Filter::from_args(&args, candidates(&items, &args.label_delimiter), theme);
    if args.select_if_one && model.selection.matches().len() == 1 {
        let Some(only) = model.selection.current_candidate() else {
            return Err(Error::Invariant("single match without a candidate".into()).into());
        };
        return Ok(Outcome::committed(only.value.clone()));
    }

    let options = if args.height == 0 {
        ProgramOptions::from_env().alt_screen(true)
    } else {
        super::inline_options(model.chrome() + args.height, args.padding)
    };
    let model = Program::new(model, options).run().await?;
    Ok(model.outcome(args.ordered, &args.output_delimiter))
}
