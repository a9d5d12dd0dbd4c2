//! # Interactive Session Runtime
//!
//! Drives a [`Model`] through a model/update/view loop:
//!
//! 1. `init` returns the first commands,
//! 2. every input event, resize and command result is fed to `update`
//!    on the loop task, one at a time,
//! 3. `view` is drawn on the UI stream at most once per frame,
//! 4. a [`Cmd::Quit`] returned from `update` ends the session and hands
//!    the model back to the widget, which turns its state into an
//!    [`crate::exit::Outcome`].
//!
//! Commands run on worker threads and talk to the loop only by sending
//! events over a channel. SIGINT and SIGTERM arrive as the same
//! [`Event::Interrupt`] as a Ctrl+C key. A second interrupt inside
//! [`FORCE_QUIT_WINDOW`] ends the session immediately with
//! [`Error::Interrupted`].
//!
//! When the UI stream is not a terminal the same loop runs headless and
//! nothing is drawn. Keys are still read from the controlling terminal if
//! the model asks for them (see [`KeyInput`]); a model that cannot work
//! without keys fails with [`Error::Terminal`] when there is none.

pub mod event;
pub mod input;
pub mod session;
pub mod signals;
pub mod timeout;

pub use event::{is_ctrl, is_key, Cmd, Emitter, Event};
pub use input::{CrosstermEventReader, EventReader, ScriptedEvents};
pub use session::{DetachedKeys, Headless, OutputChannel, Surface, TerminalSession, TerminalSurface};
pub use signals::OsSignals;
pub use timeout::{parse_duration, Tick, Timeout};

use crate::config::RuntimeKnobs;
use crate::error::Error;
use ratatui::text::Text;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};

pub const DEFAULT_FPS: u32 = 60;
pub const FORCE_QUIT_WINDOW: Duration = Duration::from_secs(1);

/// How much a model depends on key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Finishes on its own; keys are never read.
    Unused,
    /// Reads keys when a terminal is available, otherwise waits for its
    /// own commands (a timeout, say) to end the session.
    Optional,
    /// Cannot finish without keys.
    Required,
}

/// A widget's state machine.
pub trait Model {
    type Msg: Send + 'static;

    fn key_input(&self) -> KeyInput {
        KeyInput::Required
    }

    fn init(&mut self) -> Cmd<Self::Msg> {
        Cmd::None
    }

    /// Apply one event. Never blocks; slow work goes into a returned command.
    fn update(&mut self, event: Event<Self::Msg>) -> Cmd<Self::Msg>;

    fn view(&self) -> Text<'static>;
}

/// Per-session settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    pub fps: u32,
    pub alt_screen: bool,
    pub output: OutputChannel,
    pub inline_height: u16,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            alt_screen: false,
            output: OutputChannel::Stderr,
            inline_height: 1,
        }
    }
}

impl ProgramOptions {
    pub fn from_knobs(knobs: RuntimeKnobs) -> Self {
        Self {
            fps: knobs.fps.unwrap_or(DEFAULT_FPS),
            alt_screen: knobs.alt_screen,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_knobs(RuntimeKnobs::from_env())
    }

    pub fn output(mut self, output: OutputChannel) -> Self {
        self.output = output;
        self
    }

    pub fn inline_height(mut self, height: u16) -> Self {
        self.inline_height = height;
        self
    }

    /// Force the alternate screen regardless of the environment.
    pub fn alt_screen(mut self, on: bool) -> Self {
        self.alt_screen = self.alt_screen || on;
        self
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

pub struct Program<M: Model> {
    model: M,
    options: ProgramOptions,
}

impl<M> Program<M>
where
    M: Model,
{
    pub fn new(model: M, options: ProgramOptions) -> Self {
        Self { model, options }
    }

    /// Run against the real terminal, or headless when the UI stream is
    /// not a terminal.
    pub async fn run(self) -> Result<M, Error> {
        if !self.options.output.is_terminal() {
            tracing::debug!("UI stream is not a terminal, running headless");
            if self.model.key_input() == KeyInput::Unused {
                return self.run_with(Headless::new(), None).await;
            }
            return self.run_detached(DetachedKeys::open).await;
        }
        let session = TerminalSession::enter(self.options.output, self.options.alt_screen)?;
        let surface = session.terminal(self.options.inline_height)?;
        let result = self
            .run_with(surface, Some(Box::new(CrosstermEventReader)))
            .await;
        drop(session);
        result
    }

    /// Draw nowhere but read keys through `open`, when it succeeds.
    pub async fn run_detached<F>(self, open: F) -> Result<M, Error>
    where
        F: FnOnce() -> Result<DetachedKeys, Error>,
    {
        match open() {
            Ok(keys) => {
                let result = self
                    .run_with(Headless::new(), Some(Box::new(CrosstermEventReader)))
                    .await;
                drop(keys);
                result
            }
            Err(err) if self.model.key_input() == KeyInput::Optional => {
                tracing::debug!(error = %err, "no terminal for keys, waiting on commands only");
                self.run_with(Headless::new(), None).await
            }
            Err(err) => Err(err),
        }
    }

    /// Run on an arbitrary surface with an optional input source.
    pub async fn run_with<S: Surface>(
        mut self,
        mut surface: S,
        input: Option<Box<dyn EventReader>>,
    ) -> Result<M, Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event<M::Msg>>();
        let stop = Arc::new(AtomicBool::new(false));
        let reader = input.map(|reader| input::spawn_reader(reader, tx.clone(), Arc::clone(&stop)));

        let result = self.event_loop(&mut surface, &tx, &mut rx).await;

        stop.store(true, Ordering::Relaxed);
        rx.close();
        if let Some(handle) = reader {
            let _ = handle.join();
        }
        let finished = surface.finish();
        result?;
        finished?;
        Ok(self.model)
    }

    async fn event_loop<S: Surface>(
        &mut self,
        surface: &mut S,
        tx: &UnboundedSender<Event<M::Msg>>,
        rx: &mut mpsc::UnboundedReceiver<Event<M::Msg>>,
    ) -> Result<(), Error> {
        let init = self.model.init();
        if dispatch(init, tx) {
            return Ok(());
        }
        let (width, height) = surface.size();
        if dispatch(self.model.update(Event::Resize { width, height }), tx) {
            return Ok(());
        }

        let mut frames = tokio::time::interval(self.options.frame_interval());
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut signals = OsSignals::install();
        let mut dirty = true;
        let mut last_interrupt: Option<Instant> = None;

        loop {
            let event = tokio::select! {
                Some(event) = rx.recv() => event,
                () = signals.recv() => Event::Interrupt,
                _ = frames.tick() => {
                    if dirty {
                        surface.draw(self.model.view())?;
                        dirty = false;
                    }
                    continue;
                }
            };
            if matches!(event, Event::Interrupt) {
                let now = Instant::now();
                if last_interrupt.is_some_and(|at| now.duration_since(at) < FORCE_QUIT_WINDOW) {
                    tracing::debug!("second interrupt, forcing exit");
                    return Err(Error::Interrupted);
                }
                last_interrupt = Some(now);
            }
            let cmd = self.model.update(event);
            dirty = true;
            if dispatch(cmd, tx) {
                return Ok(());
            }
        }
    }
}

/// Start every command; returns `true` when one of them asks to quit.
fn dispatch<M: Send + 'static>(cmd: Cmd<M>, tx: &UnboundedSender<Event<M>>) -> bool {
    match cmd {
        Cmd::None => false,
        Cmd::Quit => true,
        Cmd::Batch(cmds) => cmds
            .into_iter()
            .fold(false, |quit, cmd| dispatch(cmd, tx) || quit),
        Cmd::Tick(after, make) => {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = tx.send(Event::Msg(make(Instant::now())));
            });
            false
        }
        Cmd::Task(work) => {
            let tx = tx.clone();
            std::thread::spawn(move || {
                let _ = tx.send(Event::Msg(work()));
            });
            false
        }
        Cmd::Stream(work) => {
            let emitter = Emitter::new(tx.clone());
            std::thread::spawn(move || work(emitter));
            false
        }
    }
}

/// Helpers for driving models in tests without a terminal.
pub mod testing {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    /// Run a model with scripted input on an in-memory terminal.
    pub async fn run_scripted<M: Model>(
        model: M,
        events: ScriptedEvents,
        size: (u16, u16),
    ) -> Result<M, Error> {
        let terminal = Terminal::new(TestBackend::new(size.0, size.1))
            .map_err(|e| Error::Terminal(e.to_string()))?;
        Program::new(model, ProgramOptions::default())
            .run_with(TerminalSurface::new(terminal, false), Some(Box::new(events)))
            .await
    }

    /// Feed events straight into `update`, ignoring returned commands
    /// except for reporting whether one of them quits.
    pub fn feed<M: Model>(model: &mut M, events: impl IntoIterator<Item = Event<M::Msg>>) -> bool {
        events
            .into_iter()
            .fold(false, |quit, event| model.update(event).is_quit() || quit)
    }
}
