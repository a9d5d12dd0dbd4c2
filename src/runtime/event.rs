//! Events delivered to `update` and the commands models hand back.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Everything a model can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<M> {
    Key(KeyEvent),
    Paste(String),
    Resize { width: u16, height: u16 },
    /// Ctrl+C. Delivered as its own event so every widget can honor it.
    Interrupt,
    /// A message produced by a command.
    Msg(M),
}

/// Deferred work handed back to the runtime by `init` and `update`.
pub enum Cmd<M> {
    None,
    Quit,
    Batch(Vec<Cmd<M>>),
    /// Deliver a message once the delay has passed.
    Tick(Duration, Box<dyn FnOnce(Instant) -> M + Send>),
    /// Run blocking work on a worker thread and deliver its result.
    Task(Box<dyn FnOnce() -> M + Send>),
    /// Run blocking work that may deliver any number of messages in order.
    Stream(Box<dyn FnOnce(Emitter<M>) + Send>),
}

impl<M> Cmd<M> {
    pub fn tick<F>(after: Duration, f: F) -> Self
    where
        F: FnOnce(Instant) -> M + Send + 'static,
    {
        Cmd::Tick(after, Box::new(f))
    }

    pub fn task<F>(f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Cmd::Task(Box::new(f))
    }

    pub fn stream<F>(f: F) -> Self
    where
        F: FnOnce(Emitter<M>) + Send + 'static,
    {
        Cmd::Stream(Box::new(f))
    }

    /// Combine commands, dropping the empty ones.
    pub fn batch(cmds: impl IntoIterator<Item = Cmd<M>>) -> Self {
        let mut cmds: Vec<Cmd<M>> = cmds
            .into_iter()
            .filter(|cmd| !matches!(cmd, Cmd::None))
            .collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.pop().unwrap_or(Cmd::None),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_quit(&self) -> bool {
        match self {
            Cmd::Quit => true,
            Cmd::Batch(cmds) => cmds.iter().any(Cmd::is_quit),
            _ => false,
        }
    }
}

impl<M> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::None => f.write_str("None"),
            Cmd::Quit => f.write_str("Quit"),
            Cmd::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Cmd::Tick(after, _) => f.debug_tuple("Tick").field(after).finish(),
            Cmd::Task(_) => f.write_str("Task"),
            Cmd::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Sending half handed to [`Cmd::Stream`] work.
pub struct Emitter<M> {
    tx: UnboundedSender<Event<M>>,
}

impl<M> Emitter<M> {
    pub(crate) fn new(tx: UnboundedSender<Event<M>>) -> Self {
        Self { tx }
    }

    /// Deliver a message. Returns `false` once the session has ended.
    pub fn emit(&self, msg: M) -> bool {
        self.tx.send(Event::Msg(msg)).is_ok()
    }
}

impl<M> Clone for Emitter<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Shorthand for matching key presses in `update`.
pub fn is_key(key: &KeyEvent, code: KeyCode) -> bool {
    key.code == code && !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

pub fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_flattens_trivial_cases() {
        assert!(matches!(Cmd::<()>::batch([Cmd::None, Cmd::None]), Cmd::None));
        assert!(matches!(Cmd::<()>::batch([Cmd::None, Cmd::Quit]), Cmd::Quit));
        assert!(matches!(
            Cmd::<()>::batch([Cmd::Quit, Cmd::task(|| ())]),
            Cmd::Batch(_)
        ));
    }

    #[test]
    fn test_quit_detected_inside_batch() {
        let cmd = Cmd::<()>::Batch(vec![Cmd::task(|| ()), Cmd::Quit]);
        assert!(cmd.is_quit());
        assert!(!Cmd::<()>::task(|| ()).is_quit());
    }

    #[test]
    fn test_key_helpers() {
        let plain = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        let ctrl = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(is_key(&plain, KeyCode::Char('j')));
        assert!(!is_key(&ctrl, KeyCode::Char('n')));
        assert!(is_ctrl(&ctrl, 'n'));
        assert!(!is_ctrl(&plain, 'j'));
    }
}
