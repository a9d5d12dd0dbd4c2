//! Error kinds that carry their own process exit status.
//!
//! Widget entrypoints return `anyhow::Result`; when one of these errors sits
//! somewhere in the chain, `main` uses [`Error::exit_code`] instead of the
//! generic failure status.

use thiserror::Error;

/// Exit status used when nothing more specific is known.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for a command that could not be started.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status for a broken internal invariant (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: i32 = 70;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to inspect standard input: {0}")]
    StdinStat(#[source] std::io::Error),

    #[error("unable to read standard input: {0}")]
    StdinRead(#[source] std::io::Error),

    #[error("no options provided, see `knit {0} --help`")]
    NoOptions(&'static str),

    #[error("invalid option format: {0:?}")]
    InvalidOption(String),

    #[error("invalid padding {0:?}: expected 1 to 4 integers")]
    InvalidPadding(String),

    #[error("invalid row {line}: expected {expected} fields, found {found}")]
    InvalidRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown theme {0:?}")]
    UnknownTheme(String),

    #[error("failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("interrupted")]
    Interrupted,

    #[error("internal error: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Spawn { .. } => EXIT_NOT_FOUND,
            Error::Interrupted => crate::exit::EXIT_ABORTED,
            Error::Invariant(_) => EXIT_INTERNAL,
            _ => EXIT_FAILURE,
        }
    }
}

/// Find the exit status for an arbitrary error chain.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(EXIT_FAILURE, Error::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_spawn_maps_to_127() {
        let err = Error::Spawn {
            command: "nope".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_exit_code_found_through_context() {
        let result: anyhow::Result<()> = Err(Error::Interrupted).context("while drawing");
        let err = result.unwrap_err();
        assert_eq!(exit_code_for(&err), 130);
    }

    #[test]
    fn test_untyped_error_defaults_to_one() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_invariant_has_distinct_code() {
        assert_eq!(Error::Invariant("cursor".into()).exit_code(), 70);
    }
}
