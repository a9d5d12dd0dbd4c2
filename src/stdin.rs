//! # Standard Input Intake
//!
//! Widgets may be fed through a pipe. Reading only happens when standard
//! input is a pipe, a socket or a non-empty regular file; a terminal (or an
//! empty `/dev/null`) yields an empty string without blocking.

use crate::error::Error;
use regex::Regex;
use std::io::{self, IsTerminal, Read};
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("escape pattern is valid")
});

/// What is attached to standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Terminal,
    Pipe,
    File,
    Empty,
}

impl Source {
    pub fn is_readable(self) -> bool {
        matches!(self, Source::Pipe | Source::File)
    }
}

/// Classify standard input without reading from it.
pub fn detect() -> Result<Source, Error> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Source::Terminal);
    }
    let meta = std::fs::metadata("/dev/stdin").map_err(Error::StdinStat)?;
    Ok(classify(&meta))
}

#[cfg(unix)]
fn classify(meta: &std::fs::Metadata) -> Source {
    use std::os::unix::fs::FileTypeExt;

    let kind = meta.file_type();
    if kind.is_fifo() || kind.is_socket() {
        Source::Pipe
    } else if kind.is_file() && meta.len() > 0 {
        Source::File
    } else {
        Source::Empty
    }
}

#[cfg(not(unix))]
fn classify(meta: &std::fs::Metadata) -> Source {
    if meta.is_file() && meta.len() == 0 {
        Source::Empty
    } else {
        Source::Pipe
    }
}

/// Read all of standard input when it is piped, or return an empty string.
pub fn read(strip: bool) -> Result<String, Error> {
    let source = detect()?;
    tracing::debug!(?source, "standard input");
    if !source.is_readable() {
        return Ok(String::new());
    }
    read_from(io::stdin().lock(), strip)
}

/// Read a whole stream, optionally removing escape sequences.
pub fn read_from<R: Read>(mut reader: R, strip: bool) -> Result<String, Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(Error::StdinRead)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(if strip { strip_ansi(&text) } else { text })
}

/// Remove ANSI escape sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Split piped input into candidates, eliding blank entries.
pub fn split_candidates(input: &str, delimiter: &str) -> Vec<String> {
    let delimiter = if delimiter.is_empty() { "\n" } else { delimiter };
    input
        .split(delimiter)
        .map(|item| item.trim_end_matches('\r'))
        .filter(|item| !item.trim().is_empty())
        .map(str::to_string)
        .collect()
}
