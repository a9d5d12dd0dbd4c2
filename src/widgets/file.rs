//! `knit file`: pick a file or directory by browsing the tree.

use crate::config::{flag, Padding};
use crate::exit::Outcome;
use crate::runtime::{parse_duration, Cmd, Event, KeyInput, Model, Program, Tick, Timeout};
use crate::ui::render::{help_line, pad};
use crate::ui::Theme;
use crate::widgets::{inline_options, Status};
use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::{Line, Span, Text};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// Directory to start in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    #[arg(short, long, default_value = "> ", env = "KNIT_FILE_CURSOR")]
    pub cursor: String,

    /// Show hidden entries
    #[arg(short, long, env = "KNIT_FILE_ALL", value_parser = BoolishValueParser::new())]
    pub all: bool,

    /// Allow files to be picked
    #[arg(
        long,
        env = "KNIT_FILE_FILE",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub file: bool,

    #[arg(long, hide = true)]
    pub no_file: bool,

    /// Allow directories to be picked
    #[arg(long, env = "KNIT_FILE_DIRECTORY", value_parser = BoolishValueParser::new())]
    pub directory: bool,

    /// Visible entries (0 fills the terminal)
    #[arg(long, default_value_t = 10, env = "KNIT_FILE_HEIGHT")]
    pub height: usize,

    #[arg(long, env = "KNIT_FILE_SHOW_HELP", value_parser = BoolishValueParser::new())]
    pub show_help: bool,

    #[arg(long, default_value = "0s", value_parser = parse_duration, env = "KNIT_FILE_TIMEOUT")]
    pub timeout: Duration,

    #[arg(long, default_value = "${defaultPadding}", env = "KNIT_FILE_PADDING")]
    pub padding: Padding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    /// Symlink target, when the entry is one.
    pub target: Option<PathBuf>,
    pub mode: u32,
    pub size: u64,
}

impl Entry {
    fn permissions(&self) -> String {
        let kind = if self.target.is_some() {
            'l'
        } else if self.is_dir {
            'd'
        } else {
            '-'
        };
        let bits = ['r', 'w', 'x'];
        std::iter::once(kind)
            .chain((0..9).map(|i| {
                if self.mode & (0o400 >> i) != 0 {
                    bits[i % 3]
                } else {
                    '-'
                }
            }))
            .collect()
    }
}

/// Directory entries sorted directories first, then by name. A symlink
/// to a directory counts as a directory.
pub fn read_entries(dir: &Path, show_hidden: bool) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        let meta = item.metadata()?;
        let (is_dir, target) = if meta.file_type().is_symlink() {
            let target = fs::read_link(item.path()).unwrap_or_default();
            let is_dir = fs::metadata(item.path()).is_ok_and(|m| m.is_dir());
            (is_dir, Some(target))
        } else {
            (meta.is_dir(), None)
        };
        entries.push(Entry {
            name,
            is_dir,
            target,
            mode: meta.permissions().mode(),
            size: meta.len(),
        });
    }
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Decimal size such as `4.1kB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMsg {
    Loaded(PathBuf, Result<Vec<Entry>, String>),
    Tick,
}

/// Cursor and scroll position of a directory left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct View {
    cursor: usize,
    top: usize,
}

pub struct FilePicker {
    dir: PathBuf,
    entries: Vec<Entry>,
    cursor: usize,
    top: usize,
    height: usize,
    auto_height: bool,
    stack: Vec<View>,
    /// View to restore once the pending listing arrives.
    restore: Option<View>,
    show_hidden: bool,
    file_allowed: bool,
    dir_allowed: bool,
    cursor_glyph: String,
    error: Option<String>,
    chosen: Option<PathBuf>,
    theme: &'static Theme,
    show_help: bool,
    padding: Padding,
    timeout: Timeout<()>,
    status: Status,
}

impl FilePicker {
    pub fn new(dir: PathBuf, height: usize, theme: &'static Theme) -> Self {
        Self {
            dir,
            entries: Vec::new(),
            cursor: 0,
            top: 0,
            height: height.max(1),
            auto_height: height == 0,
            stack: Vec::new(),
            restore: None,
            show_hidden: false,
            file_allowed: true,
            dir_allowed: false,
            cursor_glyph: "> ".to_string(),
            error: None,
            chosen: None,
            theme,
            show_help: false,
            padding: Padding::default(),
            timeout: Timeout::disabled(),
            status: Status::Running,
        }
    }

    pub fn allow(mut self, files: bool, directories: bool) -> Self {
        self.file_allowed = files;
        self.dir_allowed = directories;
        self
    }

    pub fn show_hidden(mut self, on: bool) -> Self {
        self.show_hidden = on;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::new(timeout, None);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.chosen, self.status) {
            (Some(path), Status::Committed) => Outcome::committed(path.display().to_string()),
            (_, Status::TimedOut) => Outcome::TimedOut(None),
            _ => Outcome::Aborted,
        }
    }

    fn load(&self) -> Cmd<FileMsg> {
        let dir = self.dir.clone();
        let show_hidden = self.show_hidden;
        Cmd::task(move || {
            let entries = read_entries(&dir, show_hidden).map_err(|e| e.to_string());
            FileMsg::Loaded(dir, entries)
        })
    }

    fn move_to(&mut self, cursor: usize) {
        let last = self.entries.len().saturating_sub(1);
        self.cursor = cursor.min(last);
        if self.cursor < self.top {
            self.top = self.cursor;
        } else if self.cursor >= self.top + self.height {
            self.top = self.cursor + 1 - self.height;
        }
    }

    fn open(&mut self, commit: bool) -> Cmd<FileMsg> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Cmd::None;
        };
        let path = self.dir.join(&entry.name);
        let allowed = if entry.is_dir { self.dir_allowed } else { self.file_allowed };
        if commit && allowed {
            tracing::debug!(path = %path.display(), "picked");
            self.chosen = Some(path);
            self.status = Status::Committed;
            return Cmd::Quit;
        }
        if !entry.is_dir {
            return Cmd::None;
        }
        self.stack.push(View {
            cursor: self.cursor,
            top: self.top,
        });
        self.dir = path;
        self.restore = None;
        self.load()
    }

    fn back(&mut self) -> Cmd<FileMsg> {
        let Some(parent) = self.dir.parent().map(Path::to_path_buf) else {
            return Cmd::None;
        };
        self.dir = parent;
        self.restore = self.stack.pop();
        self.load()
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<FileMsg> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_to(self.cursor + 1),
            KeyCode::Up | KeyCode::Char('k') => self.move_to(self.cursor.saturating_sub(1)),
            KeyCode::PageDown | KeyCode::Char('J') => self.move_to(self.cursor + self.height),
            KeyCode::PageUp | KeyCode::Char('K') => self.move_to(self.cursor.saturating_sub(self.height)),
            KeyCode::Home | KeyCode::Char('g') => self.move_to(0),
            KeyCode::End | KeyCode::Char('G') => self.move_to(usize::MAX),
            KeyCode::Enter => return self.open(true),
            KeyCode::Right | KeyCode::Char('l') => return self.open(false),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Backspace => return self.back(),
            KeyCode::Esc | KeyCode::Char('q') => {
                self.status = Status::Aborted;
                return Cmd::Quit;
            }
            _ => {}
        }
        Cmd::None
    }

    fn entry_line(&self, index: usize, entry: &Entry) -> Line<'static> {
        let theme = self.theme;
        let focused = index == self.cursor;
        let glyph = if focused {
            self.cursor_glyph.clone()
        } else {
            " ".repeat(self.cursor_glyph.chars().count())
        };
        let name_style = if focused {
            theme.cursor()
        } else if entry.is_dir {
            theme.header()
        } else {
            theme.text()
        };
        let name = match &entry.target {
            Some(target) => format!("{} → {}", entry.name, target.display()),
            None => entry.name.clone(),
        };
        Line::from(vec![
            Span::styled(glyph, theme.cursor()),
            Span::styled(format!("{} {:>8} ", entry.permissions(), human_size(entry.size)), theme.dim()),
            Span::styled(name, name_style),
        ])
    }
}

impl Model for FilePicker {
    type Msg = FileMsg;

    fn key_input(&self) -> KeyInput {
        if self.timeout.is_active() {
            KeyInput::Optional
        } else {
            KeyInput::Required
        }
    }

    fn init(&mut self) -> Cmd<FileMsg> {
        Cmd::batch([self.load(), self.timeout.schedule(|| FileMsg::Tick)])
    }

    fn update(&mut self, event: Event<FileMsg>) -> Cmd<FileMsg> {
        match event {
            Event::Interrupt => {
                self.status = Status::Aborted;
                Cmd::Quit
            }
            Event::Key(key) => self.handle_key(key),
            Event::Msg(FileMsg::Loaded(dir, result)) => {
                // A listing for a directory we already left.
                if dir != self.dir {
                    return Cmd::None;
                }
                match result {
                    Ok(entries) => {
                        self.entries = entries;
                        self.error = None;
                    }
                    Err(e) => {
                        tracing::debug!(dir = %dir.display(), error = %e, "listing failed");
                        self.entries.clear();
                        self.error = Some(e);
                    }
                }
                let view = self.restore.take().unwrap_or(View { cursor: 0, top: 0 });
                self.top = view.top;
                self.move_to(view.cursor);
                Cmd::None
            }
            Event::Msg(FileMsg::Tick) => match self.timeout.on_tick() {
                Tick::Continue => self.timeout.schedule(|| FileMsg::Tick),
                Tick::Expired(_) => {
                    self.status = Status::TimedOut;
                    Cmd::Quit
                }
                Tick::Ignored => Cmd::None,
            },
            Event::Resize { height, .. } => {
                if self.auto_height {
                    let chrome = 2 + usize::from(self.show_help);
                    self.height = usize::from(height).saturating_sub(chrome).max(1);
                    self.move_to(self.cursor);
                }
                Cmd::None
            }
            Event::Paste(_) => Cmd::None,
        }
    }

    fn view(&self) -> Text<'static> {
        let theme = self.theme;
        let mut lines = vec![Line::from(Span::styled(
            self.dir.display().to_string(),
            theme.dim(),
        ))];
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(error.clone(), theme.error())));
        } else if self.entries.is_empty() {
            lines.push(Line::from(Span::styled("No files found.", theme.dim())));
        }
        lines.extend(
            self.entries
                .iter()
                .enumerate()
                .skip(self.top)
                .take(self.height)
                .map(|(i, entry)| self.entry_line(i, entry)),
        );
        let label = self.timeout.label();
        if self.show_help || !label.is_empty() {
            let mut help = if self.show_help {
                help_line(
                    theme,
                    &[("↑/↓", "navigate"), ("→", "open"), ("←", "back"), ("enter", "select"), ("q", "quit")],
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

pub async fn run(args: FileArgs, theme: &'static Theme) -> anyhow::Result<Outcome> {
    let files = flag(args.file, args.no_file);
    if !files && !args.directory {
        anyhow::bail!(crate::error::Error::InvalidOption(
            "at least one of --file and --directory must be allowed".into()
        ));
    }
    let start = fs::canonicalize(&args.path)
        .with_context(|| format!("cannot open {}", args.path.display()))?;

    let mut model = FilePicker::new(start, args.height, theme)
        .allow(files, args.directory)
        .show_hidden(args.all)
        .with_timeout(args.timeout);
    model.cursor_glyph = args.cursor.clone();
    model.show_help = args.show_help;
    model.padding = args.padding;

    let help = usize::from(args.show_help || !args.timeout.is_zero());
    let options = if args.height == 0 {
        crate::runtime::ProgramOptions::from_env().alt_screen(true)
    } else {
        inline_options(1 + args.height + help, args.padding)
    };
    let model = Program::new(model, options).run().await?;
    Ok(model.outcome())
}
