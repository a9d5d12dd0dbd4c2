//! `knit table`: show delimited rows and pick one.

use crate::error::Error;
use crate::exit::{Outcome, Output};
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::select::{Candidate, Edge, Limit, Matcher, Selection};
use crate::stdin;
use crate::ui::render::{help_line, truncate};
use crate::ui::Theme;
use crate::widgets::{inline_options, split_names, Status};
use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::Args;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::{Line, Span, Text};
use std::path::PathBuf;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// Field separator
    #[arg(short, long, default_value = ",", env = "KNIT_TABLE_SEPARATOR")]
    pub separator: String,

    /// Column names (the first row is data when given)
    #[arg(short, long, env = "KNIT_TABLE_COLUMNS")]
    pub columns: Vec<String>,

    /// Column widths (0 or missing fits the content)
    #[arg(short, long, value_delimiter = ',', env = "KNIT_TABLE_WIDTHS")]
    pub widths: Vec<usize>,

    #[arg(long, default_value_t = 10, env = "KNIT_TABLE_HEIGHT")]
    pub height: usize,

    /// Read rows from a file instead of stdin
    #[arg(short, long, env = "KNIT_TABLE_FILE")]
    pub file: Option<PathBuf>,

    /// Print the table and exit
    #[arg(short, long, env = "KNIT_TABLE_PRINT", value_parser = BoolishValueParser::new())]
    pub print: bool,

    #[arg(long, env = "KNIT_TABLE_SHOW_HELP", value_parser = BoolishValueParser::new())]
    pub show_help: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_TABLE_TIMEOUT")]
    pub timeout: Duration,
}

/// Parsed rows with a header of the same arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    /// Split `text` into rows of `separator`-delimited fields. Blank lines
    /// are skipped; every row must match the header's field count.
    pub fn parse(text: &str, separator: &str, columns: &[String]) -> Result<Self, Error> {
        if separator.is_empty() {
            return Err(Error::InvalidOption("empty table separator".into()));
        }
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, split_row(line, separator)));

        let header = if columns.is_empty() {
            match lines.next() {
                Some((_, header)) => header,
                None => return Ok(Self { header: Vec::new(), rows: Vec::new() }),
            }
        } else {
            columns.to_vec()
        };

        let mut rows = Vec::new();
        for (line, row) in lines {
            if row.len() != header.len() {
                return Err(Error::InvalidRow {
                    line,
                    expected: header.len(),
                    found: row.len(),
                });
            }
            rows.push(row);
        }
        Ok(Self { header, rows })
    }

    /// Column widths: the requested width where given and non-zero,
    /// otherwise the widest cell.
    pub fn widths(&self, requested: &[usize]) -> Vec<usize> {
        (0..self.header.len())
            .map(|col| match requested.get(col) {
                Some(&w) if w > 0 => w,
                _ => std::iter::once(&self.header)
                    .chain(&self.rows)
                    .map(|row| row[col].width())
                    .max()
                    .unwrap_or(0),
            })
            .collect()
    }
}

fn split_row(line: &str, separator: &str) -> Vec<String> {
    line.split(separator).map(|f| f.trim().to_string()).collect()
}

/// One aligned row, cells cut to their column width.
pub fn format_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let cell = truncate(cell, width);
            let fill = width.saturating_sub(cell.width());
            format!("{cell}{}", " ".repeat(fill))
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

/// The whole table as plain text, for `--print`.
pub fn render_plain(grid: &Grid, widths: &[usize]) -> String {
    let rule_width = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
    let mut out = vec![format_row(&grid.header, widths), "─".repeat(rule_width)];
    out.extend(grid.rows.iter().map(|row| format_row(row, widths)));
    out.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMsg {
    Tick,
}

pub struct Table {
    header: String,
    selection: Selection,
    theme: &'static Theme,
    show_help: bool,
    timeout: Timeout<()>,
    status: Status,
}

impl Table {
    pub fn new(grid: &Grid, widths: &[usize], separator: &str, height: usize, theme: &'static Theme) -> Self {
        let candidates = grid
            .rows
            .iter()
            .map(|row| Candidate {
                label: format_row(row, widths),
                value: row.join(separator),
            })
            .collect();
        let mut selection = Selection::new(candidates, Matcher::default(), Limit::One, Edge::Clamp);
        selection.set_height(height);
        Self {
            header: format_row(&grid.header, widths),
            selection,
            theme,
            show_help: false,
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, None);
        self
    }

    pub fn cursor(&self) -> usize {
        self.selection.cursor()
    }

    pub fn rows(&self) -> usize {
        2 + self.selection.height() + usize::from(self.show_help)
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            Status::Committed => match self.selection.commit(false).first() {
                Some(row) => Outcome::Committed(Some(Output::Line(row.value.clone()))),
                None => Outcome::Committed(None),
            },
            Status::TimedOut => Outcome::TimedOut(None),
            Status::Declined => Outcome::Declined(None),
            Status::Aborted | Status::Running => Outcome::Aborted,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<TableMsg> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.selection.move_down(),
            KeyCode::Up | KeyCode::Char('k') => self.selection.move_up(),
            KeyCode::PageDown | KeyCode::Char('f') => self.selection.page_down(),
            KeyCode::PageUp | KeyCode::Char('b') => self.selection.page_up(),
            KeyCode::Home | KeyCode::Char('g') => self.selection.home(),
            KeyCode::End | KeyCode::Char('G') => self.selection.end(),
            KeyCode::Enter => {
                self.status = Status::Committed;
                return Cmd::Quit;
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.status = Status::Aborted;
                return Cmd::Quit;
            }
            _ => {}
        }
        Cmd::None
    }
}

impl Model for Table {
    type Msg = TableMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<TableMsg> {
        self.timeout.schedule(|| TableMsg::Tick)
    }

    fn update(&mut self, event: Event<TableMsg>) -> Cmd<TableMsg> {
        match event {
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Key(key) => self.handle_key(key),
            Event::Msg(TableMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| TableMsg::Tick),
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
        let rule = "─".repeat(self.header.width());
        let mut lines = vec![
            Line::from(Span::styled(format!("  {}", self.header), theme.header())),
            Line::from(Span::styled(format!("  {rule}"), theme.dim())),
        ];
        let candidates = self.selection.candidates();
        for (row, m) in self.selection.visible() {
            let label = &candidates[m.index].label;
            let line = if row == self.selection.cursor() {
                Line::from(vec![
                    Span::styled("> ", theme.cursor()),
                    Span::styled(label.clone(), theme.selected()),
                ])
            } else {
                Line::from(Span::styled(format!("  {label}"), theme.text()))
            };
            lines.push(line);
        }
        let label = self.timeout.label();
        if self.show_help || !label.is_empty() {
            let mut help = if self.show_help {
                help_line(theme, &[("↑/↓", "navigate"), ("enter", "select"), ("q", "quit")])
            } else {
                Line::default()
            };
            help.spans.push(Span::styled(label, theme.dim()));
            lines.push(help);
        }
        Text::from(lines)
    }
}

pub async fn run(args: TableArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => stdin::read(true)?,
    };
    let columns = split_names(&args.columns);
    let grid = Grid::parse(&text, &args.separator, &columns)?;
    if grid.header.is_empty() {
        return Err(Error::NoOptions("table").into());
    }
    let widths = grid.widths(&args.widths);

    if args.print {
        return Ok(Outcome::committed(render_plain(&grid, &widths)));
    }

    let mut model = Table::new(&grid, &widths, &args.separator, args.height, theme)
        .with_timeout(args.timeout);
    model.show_help = args.show_help;
    let options = inline_options(model.rows(), Default::default());
    let model = Program::new(model, options).run().await?;
    Ok(model.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{feed, run_scripted};
    use crate::runtime::ScriptedEvents;
    use crossterm::event::KeyModifiers;

    const FRUIT: &str = "Name,Colour\nStrawberry,red\nBanana,yellow\n\nKiwi,green\n";

    fn key(code: KeyCode) -> Event<TableMsg> {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn table() -> Table {
        let grid = Grid::parse(FRUIT, ",", &[]).unwrap();
        let widths = grid.widths(&[]);
        Table::new(&grid, &widths, ",", 5, Theme::default_theme())
    }

    #[test]
    fn test_first_row_is_header() {
        let grid = Grid::parse(FRUIT, ",", &[]).unwrap();
        assert_eq!(grid.header, vec!["Name", "Colour"]);
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.widths(&[]), vec![10, 6]);
        assert_eq!(grid.widths(&[4]), vec![4, 6]);
    }

    #[test]
    fn test_columns_make_first_row_data() {
        let columns = vec!["A".to_string(), "B".to_string()];
        let grid = Grid::parse("x;y\n", ";", &columns).unwrap();
        assert_eq!(grid.header, columns);
        assert_eq!(grid.rows, vec![vec!["x".to_string(), "y".to_string()]]);
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let err = Grid::parse("a,b\n1,2\n3\n", ",", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRow {
                line: 3,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_plain_render_aligns_columns() {
        let grid = Grid::parse(FRUIT, ",", &[]).unwrap();
        let text = render_plain(&grid, &grid.widths(&[]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name        Colour");
        assert_eq!(lines[1], "─".repeat(18));
        assert_eq!(lines[2], "Strawberry  red");
        assert_eq!(lines[4], "Kiwi        green");
    }

    #[test]
    fn test_enter_emits_rejoined_row() {
        let mut model = table();
        feed(&mut model, [key(KeyCode::Down)]);
        assert!(feed(&mut model, [key(KeyCode::Enter)]));
        assert_eq!(model.outcome(), Outcome::committed("Banana,yellow"));
    }

    #[test]
    fn test_navigation_clamps() {
        let mut model = table();
        feed(&mut model, [key(KeyCode::Up)]);
        assert_eq!(model.cursor(), 0);
        feed(&mut model, [key(KeyCode::Char('G')), key(KeyCode::Down)]);
        assert_eq!(model.cursor(), 2);
    }

    #[tokio::test]
    async fn test_scripted_quit_aborts() {
        let events = ScriptedEvents::keys([KeyCode::Down, KeyCode::Char('q')]);
        let model = run_scripted(table(), events, (40, 8)).await.unwrap();
        assert_eq!(model.outcome().exit_code(), 130);
    }
}
