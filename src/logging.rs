//! Diagnostic logging.
//!
//! Filter directives come from `KNIT_LOG` (default `error`). Records go to
//! the error stream, or are appended to `KNIT_LOG_FILE` when it is set.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const FILTER_VAR: &str = "KNIT_LOG";
pub const FILE_VAR: &str = "KNIT_LOG_FILE";
const DEFAULT_FILTER: &str = "error";

/// Where records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
    pub sink: Sink,
}

impl LogConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = lookup(FILTER_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let sink = lookup(FILE_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or(Sink::Stderr, |path| Sink::File(PathBuf::from(path)));
        Self { filter, sink }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// Install the global subscriber. Call once, before any widget runs.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid {FILTER_VAR} directives {:?}", config.filter))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match &config.sink {
        Sink::Stderr => builder.with_writer(std::io::stderr).try_init(),
        Sink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    };
    installed.map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}
