//! Terminal input: a reader trait so sessions can be driven by scripted
//! events in tests, and the thread that feeds decoded events to the loop.

use super::event::Event;
use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Source of terminal events.
pub trait EventReader: Send {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<TermEvent>>;
}

/// Production reader backed by crossterm's poll + read.
pub struct CrosstermEventReader;

impl EventReader for CrosstermEventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<TermEvent>> {
        if event::poll(timeout).context("Failed to poll for events")? {
            Ok(Some(event::read().context("Failed to read terminal event")?))
        } else {
            Ok(None)
        }
    }
}

/// Replays a fixed list of events, then stays silent.
///
/// An optional pause between events lets timers and commands interleave
/// with scripted key presses.
pub struct ScriptedEvents {
    events: VecDeque<TermEvent>,
    pause: Duration,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = TermEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            pause: Duration::ZERO,
        }
    }

    pub fn keys(codes: impl IntoIterator<Item = KeyCode>) -> Self {
        Self::new(
            codes
                .into_iter()
                .map(|code| TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))),
        )
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

impl EventReader for ScriptedEvents {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<TermEvent>> {
        match self.events.pop_front() {
            Some(event) => {
                if !self.pause.is_zero() {
                    std::thread::sleep(self.pause);
                }
                Ok(Some(event))
            }
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

/// Map a raw terminal event to a model event. Key releases are dropped.
pub fn translate<M>(event: TermEvent) -> Option<Event<M>> {
    match event {
        TermEvent::Key(key) if key.kind == KeyEventKind::Release => None,
        TermEvent::Key(key)
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Event::Interrupt)
        }
        TermEvent::Key(key) => Some(Event::Key(key)),
        TermEvent::Paste(text) => Some(Event::Paste(text)),
        TermEvent::Resize(width, height) => Some(Event::Resize { width, height }),
        _ => None,
    }
}

/// Read events on a dedicated thread until `stop` is raised or the loop
/// goes away.
pub(crate) fn spawn_reader<M: Send + 'static>(
    mut reader: Box<dyn EventReader>,
    tx: UnboundedSender<Event<M>>,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match reader.read_event(POLL_INTERVAL) {
                Ok(Some(raw)) => {
                    tracing::trace!(?raw, "input");
                    if let Some(event) = translate(raw) {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("input reader stopped: {err:#}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_c_becomes_interrupt() {
        let raw = TermEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(translate::<()>(raw), Some(Event::Interrupt));
    }

    #[test]
    fn test_release_is_dropped() {
        let mut key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(translate::<()>(TermEvent::Key(key)), None);
    }

    #[test]
    fn test_resize_and_paste_pass_through() {
        assert_eq!(
            translate::<()>(TermEvent::Resize(100, 40)),
            Some(Event::Resize {
                width: 100,
                height: 40
            })
        );
        assert_eq!(
            translate::<()>(TermEvent::Paste("hi".into())),
            Some(Event::Paste("hi".into()))
        );
    }

    #[test]
    fn test_scripted_events_drain_in_order() {
        let mut reader = ScriptedEvents::keys([KeyCode::Down, KeyCode::Enter]);
        let first = reader.read_event(Duration::ZERO).unwrap();
        let second = reader.read_event(Duration::ZERO).unwrap();
        let third = reader.read_event(Duration::from_millis(1)).unwrap();
        assert!(matches!(first, Some(TermEvent::Key(k)) if k.code == KeyCode::Down));
        assert!(matches!(second, Some(TermEvent::Key(k)) if k.code == KeyCode::Enter));
        assert!(third.is_none());
    }
}
