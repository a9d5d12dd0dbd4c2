//! # Tail
//!
//! Keeps the last N lines of standard input in a ring and redraws them in
//! place as new lines arrive. At end of input the live frame is erased and
//! the final lines are written once, without control sequences.

use crate::exit::{Outcome, Output};
use crate::ui::render::truncate;
use clap::Args;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

#[derive(Debug, Clone, Args)]
pub struct TailArgs {
    /// Number of lines to keep
    #[arg(short = 'n', long, default_value_t = 10, env = "KNIT_TAIL_LINES")]
    pub lines: usize,
}

/// Rolling frame of the last `capacity` lines.
pub struct TailFrame<W: Write> {
    lines: VecDeque<String>,
    capacity: usize,
    live: Option<W>,
    width: usize,
    frame_height: u16,
}

impl<W: Write> TailFrame<W> {
    /// `live` receives the redrawn frame; pass `None` to only collect.
    pub fn new(capacity: usize, live: Option<W>, width: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            live,
            width: width.max(1),
            frame_height: 0,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn push(&mut self, line: String) -> io::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.redraw()
    }

    fn redraw(&mut self) -> io::Result<()> {
        let Some(out) = self.live.as_mut() else {
            return Ok(());
        };
        if self.frame_height > 0 {
            queue!(out, MoveUp(self.frame_height))?;
        }
        for line in &self.lines {
            queue!(out, MoveToColumn(0), Clear(ClearType::UntilNewLine))?;
            // Rows wider than the terminal would wrap and break the count.
            out.write_all(truncate(line, self.width).as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        self.frame_height = u16::try_from(self.lines.len()).unwrap_or(u16::MAX);
        Ok(())
    }

    /// Erase the live frame and hand back the final lines.
    pub fn finish(mut self) -> io::Result<Vec<String>> {
        if let Some(out) = self.live.as_mut() {
            if self.frame_height > 0 {
                queue!(
                    out,
                    MoveUp(self.frame_height),
                    MoveToColumn(0),
                    Clear(ClearType::FromCursorDown)
                )?;
                out.flush()?;
            }
        }
        Ok(self.lines.into_iter().collect())
    }
}

/// Tail `input`, drawing on `live` when given. Invalid UTF-8 is replaced,
/// never fatal.
pub fn tail<R: BufRead, W: Write>(
    mut input: R,
    capacity: usize,
    live: Option<W>,
    width: usize,
) -> io::Result<Vec<String>> {
    let mut frame = TailFrame::new(capacity, live, width);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        frame.push(String::from_utf8_lossy(line).into_owned())?;
    }
    frame.finish()
}

pub fn run(args: &TailArgs) -> anyhow::Result<Outcome> {
    let stderr = io::stderr();
    let live = stderr.is_terminal().then(|| stderr.lock());
    let width = crossterm::terminal::size().map_or(80, |(w, _)| usize::from(w));
    let lines = tail(io::stdin().lock(), args.lines, live, width)?;
    tracing::debug!(kept = lines.len(), "tail finished");
    if lines.is_empty() {
        return Ok(Outcome::Committed(None));
    }
    Ok(Outcome::Committed(Some(Output::Line(lines.join("\n")))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_keeps_last_n_lines() {
        let input = Cursor::new("1\n2\n3\n4\n5\n");
        let lines = tail(input, 3, None::<Vec<u8>>, 80).unwrap();
        assert_eq!(lines, vec!["3", "4", "5"]);
    }

    #[test]
    fn test_short_input_keeps_everything() {
        let lines = tail(Cursor::new("a\r\nb"), 10, None::<Vec<u8>>, 80).unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let input = Cursor::new(b"ok\n\xff\xfe bad\nlast\n".to_vec());
        let lines = tail(input, 2, None::<Vec<u8>>, 80).unwrap();
        assert_eq!(lines, vec!["\u{fffd}\u{fffd} bad", "last"]);
    }

    #[test]
    fn test_live_frame_redraws_in_place() {
        let mut live = Vec::new();
        {
            let mut frame = TailFrame::new(2, Some(&mut live), 80);
            frame.push("one".into()).unwrap();
            frame.push("two".into()).unwrap();
            frame.push("three".into()).unwrap();
            assert_eq!(frame.finish().unwrap(), vec!["two", "three"]);
        }
        let text = String::from_utf8_lossy(&live);
        // Cursor moves up over the previous two-line frame.
        assert!(text.contains("\x1b[2A"), "{text:?}");
        assert!(text.contains("three\n"));
        // The final frame is erased before returning.
        assert!(text.ends_with("\x1b[J"), "{text:?}");
    }

    #[test]
    fn test_long_lines_truncated_in_live_frame() {
        let mut live = Vec::new();
        let mut frame = TailFrame::new(1, Some(&mut live), 4);
        frame.push("abcdefgh".into()).unwrap();
        let lines = frame.finish().unwrap();
        assert_eq!(lines, vec!["abcdefgh"]);
        let text = String::from_utf8_lossy(&live);
        assert!(!text.contains("abcdefgh"));
    }
}
