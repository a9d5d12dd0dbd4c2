//! Knit - small interactive terminal widgets for shell scripts
//!
//! Each subcommand reads options from flags or `KNIT_*` variables, draws a
//! widget on the error stream, writes its result on standard output and
//! reports how it ended through the exit status.

pub mod config;
pub mod error;
pub mod exit;
pub mod logging;
pub mod pager;
pub mod process;
pub mod progress;
pub mod runtime;
pub mod select;
pub mod stdin;
pub mod tail;
pub mod ui;
pub mod widgets;

pub use error::Error;
pub use exit::{Outcome, Output};
