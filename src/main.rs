//! # Knit CLI Entry Point
//!
//! ```bash
//! # pick one branch
//! git branch --format='%(refname:short)' | knit choose --header "Branch"
//!
//! # ask before deleting
//! knit confirm "Delete build output?" && rm -rf target
//!
//! # spinner while a command runs
//! knit spin --title "Fetching" -- git fetch --all
//!
//! # styled banner
//! knit style --border rounded --padding "1 2" "Release ready"
//! ```
//!
//! Widgets draw on the error stream and print their result on standard
//! output, so `$(knit ...)` captures only the answer. The exit status says
//! how the widget ended: 0 committed, 1 declined, 124 timed out,
//! 130 aborted.

use knit::error::exit_code_for;
use knit::exit::Outcome;
use knit::runtime::session::restore_after_panic;
use knit::ui::Theme;
use knit::widgets::{
    choose, confirm, file, filter, format, input, join, log, pager, progress, spin, style, table, write,
};
use knit::{logging, tail};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::panic;

#[derive(Parser, Debug)]
#[command(name = "knit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interactive terminal widgets for shell scripts", long_about = None)]
struct Cli {
    /// Colour theme for interactive widgets
    #[arg(long, global = true, env = "KNIT_THEME")]
    theme: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick one or more options from a list
    Choose(choose::ChooseArgs),
    /// Fuzzy-filter a list of options
    Filter(filter::FilterArgs),
    /// Ask a yes/no question
    Confirm(confirm::ConfirmArgs),
    /// Prompt for a single line of text
    Input(input::InputArgs),
    /// Prompt for multi-line text
    Write(write::WriteArgs),
    /// Show a spinner while a command runs
    Spin(spin::SpinArgs),
    /// Show progress of indicators arriving on stdin
    Progress(progress::ProgressArgs),
    /// Scroll through content
    Pager(pager::PagerArgs),
    /// Pick a file from a directory tree
    File(file::FileArgs),
    /// Pick a row from delimited data
    Table(table::TableArgs),
    /// Render markdown, templates, emoji or code
    Format(format::FormatArgs),
    /// Apply colours, borders and spacing to text
    Style(style::StyleArgs),
    /// Join text blocks horizontally or vertically
    Join(join::JoinArgs),
    /// Write a log record
    Log(log::LogArgs),
    /// Keep the last lines of stdin on screen
    Tail(tail::TailArgs),
    /// Print the version
    Version,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Choose(_) => "choose",
            Command::Filter(_) => "filter",
            Command::Confirm(_) => "confirm",
            Command::Input(_) => "input",
            Command::Write(_) => "write",
            Command::Spin(_) => "spin",
            Command::Progress(_) => "progress",
            Command::Pager(_) => "pager",
            Command::File(_) => "file",
            Command::Table(_) => "table",
            Command::Format(_) => "format",
            Command::Style(_) => "style",
            Command::Join(_) => "join",
            Command::Log(_) => "log",
            Command::Tail(_) => "tail",
            Command::Version => "version",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&logging::LogConfig::from_env()) {
        eprintln!("knit: {err:#}");
    }

    // Restore the terminal before the default hook prints.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_after_panic();
        original_hook(panic_info);
    }));

    let code = match dispatch(cli).await.and_then(|outcome| emit(&outcome)) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            eprintln!("knit: {err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<Outcome> {
    let theme = Theme::resolve(cli.theme.as_deref())?;
    tracing::debug!(command = cli.command.name(), "dispatching");
    match cli.command {
        Command::Choose(args) => choose::run(args, theme).await,
        Command::Filter(args) => filter::run(args, theme).await,
        Command::Confirm(args) => confirm::run(args, theme).await,
        Command::Input(args) => input::run(args, theme).await,
        Command::Write(args) => write::run(args, theme).await,
        Command::Spin(args) => spin::run(args, theme).await,
        Command::Progress(args) => progress::run(args, theme).await,
        Command::Pager(args) => pager::run(args, theme).await,
        Command::File(args) => file::run(args, theme).await,
        Command::Table(args) => table::run(args, theme).await,
        Command::Format(args) => format::run(&args),
        Command::Style(args) => style::run(&args),
        Command::Join(args) => join::run(&args),
        Command::Log(args) => log::run(&args),
        Command::Tail(args) => tail::run(&args),
        Command::Version => Ok(Outcome::committed(format!("knit version {}", env!("CARGO_PKG_VERSION")))),
    }
}

/// Write the payload to stdout and return the exit status.
fn emit(outcome: &Outcome) -> Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    outcome.emit(&mut out).context("writing result")?;
    out.flush().context("flushing result")?;
    Ok(outcome.exit_code())
}
