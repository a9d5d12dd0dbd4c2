//! # Widgets
//!
//! One module per subcommand. Each holds its clap options, its [`Model`]
//! and a `run` entrypoint that turns the final model into an [`Outcome`].
//!
//! [`Model`]: crate::runtime::Model
//! [`Outcome`]: crate::exit::Outcome

pub mod choose;
pub mod confirm;
pub mod file;
pub mod filter;
pub mod format;
pub mod input;
pub mod join;
pub mod log;
pub mod pager;
pub mod progress;
pub mod spin;
pub mod style;
pub mod table;
pub mod write;

use crate::config::Padding;
use crate::error::Error;
use crate::runtime::ProgramOptions;
use crate::stdin;

/// Where an interactive widget ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Running,
    Committed,
    Declined,
    Aborted,
    TimedOut,
}

impl Status {
    pub fn is_done(self) -> bool {
        self != Status::Running
    }
}

/// Candidates from positional arguments, or from piped input when there
/// are none.
pub fn gather(options: &[String], input_delimiter: &str, strip: bool) -> Result<Vec<String>, Error> {
    if !options.is_empty() {
        let options = options
            .iter()
            .map(|o| if strip { stdin::strip_ansi(o) } else { o.clone() })
            .collect();
        return Ok(options);
    }
    let piped = stdin::read(strip)?;
    Ok(stdin::split_candidates(&piped, input_delimiter))
}

/// Flatten repeated and comma-separated names.
pub fn split_names(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Session options for an inline widget of `rows` content rows.
pub fn inline_options(rows: usize, padding: Padding) -> ProgramOptions {
    let rows = rows + usize::from(padding.top) + usize::from(padding.bottom);
    ProgramOptions::from_env().inline_height(u16::try_from(rows.max(1)).unwrap_or(u16::MAX))
}
