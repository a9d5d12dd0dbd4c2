//! # Child Process Runner
//!
//! Runs the command wrapped by `spin` in its own process group, either on
//! a pseudo-terminal (when the result stream is a terminal, so the child
//! still sees a TTY) or on plain pipes.
//!
//! Reader threads copy the child's output into capture buffers and, when
//! teeing is on, forward every chunk as a [`ChildEvent::Output`]. A waiter
//! thread reaps the child, gives the readers a short grace period to drain
//! and then sends a single [`ChildEvent::Exited`].

use super::signal::{signal_group, Signal};
use crate::error::Error;
use portable_pty::{CommandBuilder, MasterPty, NativePtySystem, PtySize, PtySystem};
use std::io::{self, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Upper bound on retained error output.
pub const CAPTURE_LIMIT: usize = 1024 * 1024;

const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pty { rows: u16, cols: u16 },
    Pipes,
}

/// Where the child is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEvent {
    Output(Vec<u8>),
    Exited(i32),
}

/// Keeps the most recent `limit` bytes.
#[derive(Debug, Default)]
pub struct RollingBuffer {
    bytes: Vec<u8>,
    limit: usize,
}

impl RollingBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
        if self.bytes.len() > self.limit {
            let excess = self.bytes.len() - self.limit;
            self.bytes.drain(..excess);
        }
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output collected from the child.
#[derive(Debug)]
struct Captured {
    stdout: Vec<u8>,
    errors: RollingBuffer,
}

/// A running child. Dropping the handle before the child has been reaped
/// kills its whole process group.
pub struct ChildHandle {
    pid: u32,
    mode: Mode,
    captured: Arc<Mutex<Captured>>,
    reaped: Arc<AtomicBool>,
    master: Option<Box<dyn MasterPty + Send>>,
}

impl std::fmt::Debug for ChildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildHandle")
            .field("pid", &self.pid)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ChildHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn has_exited(&self) -> bool {
        self.reaped.load(Ordering::Acquire)
    }

    /// Ask the child's group to stop.
    pub fn interrupt(&self) {
        if self.has_exited() {
            return;
        }
        if let Err(e) = signal_group(self.pid, Signal::Interrupt) {
            tracing::debug!(pid = self.pid, error = %e, "SIGINT failed");
        }
    }

    pub fn kill(&self) {
        if self.has_exited() {
            return;
        }
        if let Err(e) = signal_group(self.pid, Signal::Kill) {
            tracing::debug!(pid = self.pid, error = %e, "SIGKILL failed");
        }
    }

    /// Propagate a terminal resize to the pseudo-terminal, if there is one.
    pub fn resize(&self, rows: u16, cols: u16) {
        if let Some(master) = &self.master {
            let size = PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            };
            if let Err(e) = master.resize(size) {
                tracing::debug!(error = %e, "PTY resize failed");
            }
        }
    }

    /// Everything the child wrote to its standard output (the whole
    /// terminal stream in PTY mode).
    pub fn take_stdout(&self) -> Vec<u8> {
        self.captured
            .lock()
            .map(|mut c| std::mem::take(&mut c.stdout))
            .unwrap_or_default()
    }

    /// The tail of the child's error output.
    pub fn take_errors(&self) -> Vec<u8> {
        self.captured
            .lock()
            .map(|mut c| c.errors.take())
            .unwrap_or_default()
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        if !self.has_exited() {
            tracing::debug!(pid = self.pid, "killing unreaped child group");
            let _ = signal_group(self.pid, Signal::Kill);
        }
    }
}

/// Start `command` (program followed by arguments).
///
/// `tee` forwards output chunks as they arrive. A PTY that cannot be
/// opened falls back to pipes; a program that cannot be started is
/// reported as [`Error::Spawn`].
pub fn spawn(
    command: &[String],
    mode: Mode,
    tee: bool,
) -> Result<(ChildHandle, Receiver<ChildEvent>), Error> {
    let Some((program, args)) = command.split_first() else {
        return Err(Error::Spawn {
            command: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "no command given"),
        });
    };
    match mode {
        Mode::Pty { rows, cols } => match open_pty(rows, cols) {
            Ok(pair) => spawn_pty(program, args, pair, mode, tee),
            Err(e) => {
                tracing::warn!(error = %e, "PTY unavailable, using pipes");
                spawn_pipes(program, args, tee)
            }
        },
        Mode::Pipes => spawn_pipes(program, args, tee),
    }
}

fn open_pty(rows: u16, cols: u16) -> anyhow::Result<portable_pty::PtyPair> {
    NativePtySystem::default().openpty(PtySize {
        rows: rows.max(1),
        cols: cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    })
}

fn spawn_error(program: &str, e: impl std::fmt::Display) -> Error {
    Error::Spawn {
        command: program.to_string(),
        source: io::Error::other(e.to_string()),
    }
}

fn spawn_pty(
    program: &str,
    args: &[String],
    pair: portable_pty::PtyPair,
    mode: Mode,
    tee: bool,
) -> Result<(ChildHandle, Receiver<ChildEvent>), Error> {
    let mut cmd = CommandBuilder::new(program);
    cmd.args(args);
    if let Ok(cwd) = std::env::current_dir() {
        cmd.cwd(cwd);
    }

    let mut child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| spawn_error(program, e))?;
    // Only the master is needed from here on.
    drop(pair.slave);

    let pid = child
        .process_id()
        .ok_or_else(|| Error::Invariant("spawned child has no pid".into()))?;
    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| spawn_error(program, e))?;

    let captured = Arc::new(Mutex::new(Captured {
        stdout: Vec::new(),
        errors: RollingBuffer::new(CAPTURE_LIMIT),
    }));
    let (tx, rx) = mpsc::channel();
    let readers = vec![pump(reader, Stream::Terminal, Arc::clone(&captured), tee, tx.clone())];

    let reaped = Arc::new(AtomicBool::new(false));
    let reaped_flag = Arc::clone(&reaped);
    std::thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => i32::try_from(status.exit_code()).unwrap_or(1),
            Err(e) => {
                tracing::warn!(error = %e, "waiting for child failed");
                1
            }
        };
        reaped_flag.store(true, Ordering::Release);
        finish(readers, code, &tx);
    });

    tracing::debug!(pid, program, "spawned on PTY");
    Ok((
        ChildHandle {
            pid,
            mode,
            captured,
            reaped,
            master: Some(pair.master),
        },
        rx,
    ))
}

fn spawn_pipes(
    program: &str,
    args: &[String],
    tee: bool,
) -> Result<(ChildHandle, Receiver<ChildEvent>), Error> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .map_err(|source| Error::Spawn {
            command: program.to_string(),
            source,
        })?;
    let pid = child.id();

    let captured = Arc::new(Mutex::new(Captured {
        stdout: Vec::new(),
        errors: RollingBuffer::new(CAPTURE_LIMIT),
    }));
    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(pump(out, Stream::Stdout, Arc::clone(&captured), tee, tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(pump(err, Stream::Stderr, Arc::clone(&captured), tee, tx.clone()));
    }

    let reaped = Arc::new(AtomicBool::new(false));
    let reaped_flag = Arc::clone(&reaped);
    std::thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => status
                .code()
                .or_else(|| status.signal().map(|sig| 128 + sig))
                .unwrap_or(1),
            Err(e) => {
                tracing::warn!(error = %e, "waiting for child failed");
                1
            }
        };
        reaped_flag.store(true, Ordering::Release);
        finish(readers, code, &tx);
    });

    tracing::debug!(pid, program, "spawned on pipes");
    Ok((
        ChildHandle {
            pid,
            mode: Mode::Pipes,
            captured,
            reaped,
            master: None,
        },
        rx,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Terminal,
    Stdout,
    Stderr,
}

/// Copy one output stream into the capture buffers until EOF. The returned
/// receiver fires when the stream is done.
fn pump<R: Read + Send + 'static>(
    mut source: R,
    stream: Stream,
    captured: Arc<Mutex<Captured>>,
    tee: bool,
    tx: Sender<ChildEvent>,
) -> Receiver<()> {
    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = &buf[..n];
                    if let Ok(mut c) = captured.lock() {
                        match stream {
                            Stream::Stdout => c.stdout.extend_from_slice(chunk),
                            Stream::Stderr => c.errors.push(chunk),
                            Stream::Terminal => {
                                c.stdout.extend_from_slice(chunk);
                                c.errors.push(chunk);
                            }
                        }
                    }
                    if tee {
                        let _ = tx.send(ChildEvent::Output(chunk.to_vec()));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // A closed PTY reports EIO instead of EOF.
                Err(_) => break,
            }
        }
        let _ = done_tx.send(());
    });
    done_rx
}

fn finish(readers: Vec<Receiver<()>>, code: i32, tx: &Sender<ChildEvent>) {
    for done in readers {
        // A grandchild holding the stream open must not stall the exit.
        if done.recv_timeout(DRAIN_GRACE).is_err() {
            tracing::debug!("output stream still open after child exit");
        }
    }
    let _ = tx.send(ChildEvent::Exited(code));
}

/// Block until the child exits, collecting teed output along the way.
pub fn wait_exit(events: &Receiver<ChildEvent>) -> (i32, Vec<u8>) {
    let mut output = Vec::new();
    for event in events.iter() {
        match event {
            ChildEvent::Output(chunk) => output.extend_from_slice(&chunk),
            ChildEvent::Exited(code) => return (code, output),
        }
    }
    (1, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_rolling_buffer_keeps_tail() {
        let mut buf = RollingBuffer::new(4);
        buf.push(b"abc");
        buf.push(b"def");
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.take(), b"cdef");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pipes_capture_stdout_verbatim() {
        let (handle, events) = spawn(&cmd(&["printf", "hello"]), Mode::Pipes, false).unwrap();
        let (code, teed) = wait_exit(&events);
        assert_eq!(code, 0);
        assert!(teed.is_empty());
        assert_eq!(handle.take_stdout(), b"hello");
        assert!(handle.has_exited());
    }

    #[test]
    fn test_exit_status_propagates() {
        let (handle, events) =
            spawn(&cmd(&["sh", "-c", "echo oops >&2; exit 42"]), Mode::Pipes, false).unwrap();
        let (code, _) = wait_exit(&events);
        assert_eq!(code, 42);
        assert_eq!(ExecutionStatus::from_code(code), ExecutionStatus::Failed);
        assert_eq!(handle.take_errors(), b"oops\n");
    }

    #[test]
    fn test_tee_forwards_chunks() {
        let (_handle, events) = spawn(&cmd(&["echo", "hi"]), Mode::Pipes, true).unwrap();
        let (code, teed) = wait_exit(&events);
        assert_eq!(code, 0);
        assert_eq!(teed, b"hi\n");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = spawn(&cmd(&["definitely-not-a-real-program-knit"]), Mode::Pipes, false)
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_empty_command_is_spawn_error() {
        assert!(matches!(spawn(&[], Mode::Pipes, false), Err(Error::Spawn { .. })));
    }

    #[test]
    fn test_interrupt_stops_group() {
        let (handle, events) = spawn(&cmd(&["sleep", "30"]), Mode::Pipes, false).unwrap();
        handle.interrupt();
        let (code, _) = wait_exit(&events);
        assert_eq!(code, 128 + libc::SIGINT);
    }
}
