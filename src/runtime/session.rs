//! Terminal ownership for the length of one session.
//!
//! [`TerminalSession`] switches the UI stream into raw mode (and optionally
//! the alternate screen) and puts everything back when dropped, on every
//! exit path. [`Surface`] is what the event loop draws on: a real ratatui
//! terminal, or [`Headless`] when the UI stream is not a terminal.
//! [`DetachedKeys`] keeps keys readable in that headless case.

use crate::error::Error;
use crossterm::{
    cursor::{Hide, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Position, Rect},
    text::Text,
    widgets::Paragraph,
    Terminal, TerminalOptions, Viewport,
};
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

/// Stream the animation is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputChannel {
    Stdout,
    #[default]
    Stderr,
}

impl OutputChannel {
    pub fn is_terminal(self) -> bool {
        match self {
            OutputChannel::Stdout => io::stdout().is_terminal(),
            OutputChannel::Stderr => io::stderr().is_terminal(),
        }
    }

    pub fn writer(self) -> UiWriter {
        match self {
            OutputChannel::Stdout => UiWriter::Stdout(io::stdout()),
            OutputChannel::Stderr => UiWriter::Stderr(io::stderr()),
        }
    }
}

/// Writer for whichever stream carries the UI.
pub enum UiWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl Write for UiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            UiWriter::Stdout(out) => out.write(buf),
            UiWriter::Stderr(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            UiWriter::Stdout(out) => out.flush(),
            UiWriter::Stderr(err) => err.flush(),
        }
    }
}

/// Raw mode guard. Restores the terminal on drop.
pub struct TerminalSession {
    channel: OutputChannel,
    alt_screen: bool,
}

impl TerminalSession {
    pub fn enter(channel: OutputChannel, alt_screen: bool) -> Result<Self, Error> {
        enable_raw_mode().map_err(|e| Error::Terminal(format!("enable raw mode: {e}")))?;
        // From here on Drop undoes whatever partially succeeded.
        let session = Self {
            channel,
            alt_screen,
        };
        let mut out = channel.writer();
        if alt_screen {
            execute!(out, EnterAlternateScreen)?;
        }
        execute!(out, EnableBracketedPaste, Hide)?;
        tracing::debug!(?channel, alt_screen, "terminal session started");
        Ok(session)
    }

    /// Build the ratatui terminal for this session.
    pub fn terminal(&self, inline_height: u16) -> Result<TerminalSurface<CrosstermBackend<UiWriter>>, Error> {
        let viewport = if self.alt_screen {
            Viewport::Fullscreen
        } else {
            Viewport::Inline(inline_height.max(1))
        };
        let backend = CrosstermBackend::new(self.channel.writer());
        let terminal = Terminal::with_options(backend, TerminalOptions { viewport })
            .map_err(|e| Error::Terminal(format!("create terminal: {e}")))?;
        Ok(TerminalSurface::new(terminal, !self.alt_screen))
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut out = self.channel.writer();
        let _ = execute!(out, DisableBracketedPaste, Show);
        if self.alt_screen {
            let _ = execute!(out, LeaveAlternateScreen);
        }
        let _ = disable_raw_mode();
        tracing::debug!("terminal session restored");
    }
}

/// Raw mode on the controlling terminal while the UI stream is redirected,
/// so keys still arrive one at a time. Restores cooked mode on drop.
pub struct DetachedKeys {
    _private: (),
}

impl DetachedKeys {
    pub fn open() -> Result<Self, Error> {
        if !io::stdin().is_terminal() {
            std::fs::File::open("/dev/tty")
                .map_err(|e| Error::Terminal(format!("no terminal to read keys from: {e}")))?;
        }
        enable_raw_mode().map_err(|e| Error::Terminal(format!("enable raw mode: {e}")))?;
        tracing::debug!("reading keys from the controlling terminal");
        Ok(Self { _private: () })
    }
}

impl Drop for DetachedKeys {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Put the terminal back after a panic. Only touches streams that are
/// terminals so a captured stdout stays clean.
pub fn restore_after_panic() {
    let _ = disable_raw_mode();
    for channel in [OutputChannel::Stderr, OutputChannel::Stdout] {
        if channel.is_terminal() {
            let _ = execute!(
                channel.writer(),
                DisableBracketedPaste,
                LeaveAlternateScreen,
                Show
            );
        }
    }
}

/// Something the event loop can render a view onto.
pub trait Surface {
    fn size(&self) -> (u16, u16);
    fn draw(&mut self, view: Text<'static>) -> Result<(), Error>;
    /// Erase whatever the session left behind.
    fn finish(&mut self) -> Result<(), Error>;
}

/// A ratatui terminal plus the bookkeeping for inline teardown.
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    inline: bool,
    last_area: Option<Rect>,
}

impl<B: Backend> TerminalSurface<B> {
    pub fn new(terminal: Terminal<B>, inline: bool) -> Self {
        Self {
            terminal,
            inline,
            last_area: None,
        }
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

fn terminal_error(action: &str, err: impl Display) -> Error {
    Error::Terminal(format!("{action}: {err}"))
}

impl<B> Surface for TerminalSurface<B>
where
    B: Backend,
    B::Error: Display,
{
    fn size(&self) -> (u16, u16) {
        self.terminal
            .size()
            .map(|size| (size.width, size.height))
            .unwrap_or((80, 24))
    }

    fn draw(&mut self, view: Text<'static>) -> Result<(), Error> {
        let completed = self
            .terminal
            .draw(|frame| {
                let area = frame.area();
                frame.render_widget(Paragraph::new(view), area);
            })
            .map_err(|e| terminal_error("draw", e))?;
        self.last_area = Some(completed.area);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.terminal
            .clear()
            .map_err(|e| terminal_error("clear", e))?;
        if self.inline {
            if let Some(area) = self.last_area {
                self.terminal
                    .set_cursor_position(Position::new(0, area.y))
                    .map_err(|e| terminal_error("move cursor", e))?;
            }
        }
        self.terminal
            .show_cursor()
            .map_err(|e| terminal_error("show cursor", e))
    }
}

/// Surface used when the UI stream is not a terminal: nothing is drawn.
#[derive(Debug, Clone, Copy)]
pub struct Headless {
    width: u16,
    height: u16,
}

impl Headless {
    pub fn new() -> Self {
        let (width, height) = crossterm::terminal::size().unwrap_or((80, 24));
        Self { width, height }
    }

    pub fn with_size(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for Headless {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for Headless {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn draw(&mut self, _view: Text<'static>) -> Result<(), Error> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
