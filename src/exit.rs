//! # Exit Protocol
//!
//! Every widget ends in exactly one [`Outcome`]. The outcome decides what
//! reaches the result stream and which status the process exits with:
//!
//! | Outcome | Result stream | Status |
//! |---|---|---|
//! | `Committed` | the payload | 0 |
//! | `Declined` | optional payload | 1 |
//! | `Aborted` | nothing | 130 |
//! | `TimedOut(None)` | nothing | 124 |
//! | `TimedOut(Some(_))` | the default payload | 0 |
//! | `Exited` | optional payload | child status |

use std::io::{self, Write};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_DECLINED: i32 = 1;
pub const EXIT_TIMEOUT: i32 = 124;
pub const EXIT_ABORTED: i32 = 130;

/// Payload written to the result stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Text terminated with a newline on emission.
    Line(String),
    /// Bytes written verbatim (child output in `spin`).
    Raw(Vec<u8>),
}

impl Output {
    pub fn line(text: impl Into<String>) -> Self {
        Output::Line(text.into())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Output::Line(text) => {
                out.write_all(text.as_bytes())?;
                out.write_all(b"\n")?;
            }
            Output::Raw(bytes) => out.write_all(bytes)?,
        }
        out.flush()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Committed(Option<Output>),
    Declined(Option<Output>),
    Aborted,
    TimedOut(Option<Output>),
    Exited { code: i32, output: Option<Output> },
}

impl Outcome {
    pub fn committed(text: impl Into<String>) -> Self {
        Outcome::Committed(Some(Output::line(text)))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Committed(_) => EXIT_SUCCESS,
            Outcome::Declined(_) => EXIT_DECLINED,
            Outcome::Aborted => EXIT_ABORTED,
            Outcome::TimedOut(None) => EXIT_TIMEOUT,
            Outcome::TimedOut(Some(_)) => EXIT_SUCCESS,
            Outcome::Exited { code, .. } => *code,
        }
    }

    pub fn output(&self) -> Option<&Output> {
        match self {
            Outcome::Committed(out)
            | Outcome::Declined(out)
            | Outcome::TimedOut(out)
            | Outcome::Exited { output: out, .. } => out.as_ref(),
            Outcome::Aborted => None,
        }
    }

    /// Write the payload, if any, to the result stream.
    pub fn emit<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.output() {
            Some(output) => output.write_to(out),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(outcome: &Outcome) -> Vec<u8> {
        let mut buf = Vec::new();
        outcome.emit(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Outcome::committed("a").exit_code(), 0);
        assert_eq!(Outcome::Aborted.exit_code(), 130);
        assert_eq!(Outcome::TimedOut(None).exit_code(), 124);
        assert_eq!(Outcome::TimedOut(Some(Output::line("d"))).exit_code(), 0);
        assert_eq!(Outcome::Declined(None).exit_code(), 1);
        assert_eq!(
            Outcome::Exited {
                code: 42,
                output: None
            }
            .exit_code(),
            42
        );
    }

    #[test]
    fn test_line_gets_trailing_newline() {
        assert_eq!(emitted(&Outcome::committed("Banana")), b"Banana\n");
    }

    #[test]
    fn test_raw_is_verbatim() {
        let outcome = Outcome::Exited {
            code: 0,
            output: Some(Output::Raw(b"hello".to_vec())),
        };
        assert_eq!(emitted(&outcome), b"hello");
    }

    #[test]
    fn test_abort_and_bare_timeout_write_nothing() {
        assert!(emitted(&Outcome::Aborted).is_empty());
        assert!(emitted(&Outcome::TimedOut(None)).is_empty());
    }
}
