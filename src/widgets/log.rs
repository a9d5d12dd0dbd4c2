//! `knit log`: write one levelled log record for a shell script.

use crate::error::Error;
use crate::exit::{Outcome, EXIT_DECLINED};
use anyhow::Context;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use clap::builder::BoolishValueParser;
use clap::{Args, ValueEnum};
use crossterm::style::{Attribute, Color, ContentStyle};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    #[default]
    None,
}

impl Level {
    fn label(self) -> Option<&'static str> {
        match self {
            Level::Debug => Some("DEBU"),
            Level::Info => Some("INFO"),
            Level::Warn => Some("WARN"),
            Level::Error => Some("ERRO"),
            Level::Fatal => Some("FATA"),
            Level::None => None,
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Level::Debug => Some("debug"),
            Level::Info => Some("info"),
            Level::Warn => Some("warn"),
            Level::Error => Some("error"),
            Level::Fatal => Some("fatal"),
            Level::None => None,
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Debug => Color::AnsiValue(63),
            Level::Info => Color::AnsiValue(83),
            Level::Warn => Color::AnsiValue(192),
            Level::Error => Color::AnsiValue(204),
            Level::Fatal => Color::AnsiValue(134),
            Level::None => Color::Reset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Formatter {
    #[default]
    Text,
    Json,
    Logfmt,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Message, followed by arguments or key/value pairs
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Append to this file instead of the error stream
    #[arg(short = 'o', long, env = "KNIT_LOG_FILE_OUTPUT")]
    pub file: Option<PathBuf>,

    /// Treat the first word as a printf-style format
    #[arg(short = 'f', long, conflicts_with = "structured", env = "KNIT_LOG_FORMAT", value_parser = BoolishValueParser::new())]
    pub format: bool,

    #[arg(long, value_enum, default_value_t = Formatter::Text, env = "KNIT_LOG_FORMATTER")]
    pub formatter: Formatter,

    #[arg(short, long, value_enum, default_value_t = Level::None, env = "KNIT_LOG_LEVEL")]
    pub level: Level,

    /// Drop records below this level
    #[arg(long, value_enum, env = "KNIT_LOG_MIN_LEVEL")]
    pub min_level: Option<Level>,

    #[arg(long, default_value = "", env = "KNIT_LOG_PREFIX")]
    pub prefix: String,

    /// Treat trailing words as key/value pairs
    #[arg(short, long, env = "KNIT_LOG_STRUCTURED", value_parser = BoolishValueParser::new())]
    pub structured: bool,

    /// Timestamp format: a strftime string or a name such as `rfc3339` or `kitchen`
    #[arg(short, long, default_value = "", env = "KNIT_LOG_TIME")]
    pub time: String,
}

const MISSING: &str = "(MISSING)";

/// strftime equivalents of the named layouts.
const NAMED_TIME_FORMATS: &[(&str, &str)] = &[
    ("layout", "%m/%d %I:%M:%S%p '%y %z"),
    ("ansic", "%a %b %e %H:%M:%S %Y"),
    ("unixdate", "%a %b %e %H:%M:%S %Z %Y"),
    ("rubydate", "%a %b %d %H:%M:%S %z %Y"),
    ("rfc822", "%d %b %y %H:%M %Z"),
    ("rfc822z", "%d %b %y %H:%M %z"),
    ("rfc850", "%A, %d-%b-%y %H:%M:%S %Z"),
    ("rfc1123", "%a, %d %b %Y %H:%M:%S %Z"),
    ("rfc1123z", "%a, %d %b %Y %H:%M:%S %z"),
    ("rfc3339", "%Y-%m-%dT%H:%M:%S%:z"),
    ("rfc3339nano", "%Y-%m-%dT%H:%M:%S%.9f%:z"),
    ("kitchen", "%-I:%M%p"),
    ("stamp", "%b %e %H:%M:%S"),
    ("stampmilli", "%b %e %H:%M:%S%.3f"),
    ("stampmicro", "%b %e %H:%M:%S%.6f"),
    ("stampnano", "%b %e %H:%M:%S%.9f"),
    ("datetime", "%Y-%m-%d %H:%M:%S"),
    ("dateonly", "%Y-%m-%d"),
    ("timeonly", "%H:%M:%S"),
];

/// Resolve a `--time` value to a validated strftime string.
pub fn time_format(raw: &str) -> Result<Option<String>, Error> {
    if raw.is_empty() {
        return Ok(None);
    }
    let lowered = raw.to_ascii_lowercase();
    if let Some((_, fmt)) = NAMED_TIME_FORMATS.iter().find(|(name, _)| *name == lowered) {
        return Ok(Some((*fmt).to_string()));
    }
    if StrftimeItems::new(raw).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidOption(format!("invalid time format {raw:?}")));
    }
    Ok(Some(raw.to_string()))
}

/// Minimal printf: `%s`, `%v`, `%d`, `%q` and `%%`.
pub fn printf(format: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'v' | 'd' | 'q')) => match args.next() {
                Some(arg) if verb == 'q' => out.push_str(&quote(arg)),
                Some(arg) => out.push_str(arg),
                None => out.push_str(&format!("%!{verb}{MISSING}")),
            },
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

fn logfmt_value(value: &str) -> String {
    if needs_quotes(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// One formatted log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub time: Option<String>,
    pub level: Level,
    pub prefix: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Record {
    pub fn from_args(args: &LogArgs, now: DateTime<Local>) -> Result<Self, Error> {
        let time = time_format(&args.time)?.map(|fmt| now.format(&fmt).to_string());
        let (first, rest) = args.text.split_first().map_or(("", &[][..]), |(f, r)| (f.as_str(), r));
        let (message, fields) = if args.format {
            (printf(first, rest), Vec::new())
        } else if args.structured {
            let fields = rest
                .chunks(2)
                .map(|pair| match pair {
                    [key, value] => (key.clone(), value.clone()),
                    [key] => (key.clone(), MISSING.to_string()),
                    _ => (String::new(), String::new()),
                })
                .collect();
            (first.to_string(), fields)
        } else {
            (args.text.join(" "), Vec::new())
        };
        Ok(Self {
            time,
            level: args.level,
            prefix: args.prefix.clone(),
            message,
            fields,
        })
    }

    pub fn text(&self, color: bool) -> String {
        let paint = |style: ContentStyle, text: &str| {
            if color {
                style.apply(text).to_string()
            } else {
                text.to_string()
            }
        };
        let faint = {
            let mut style = ContentStyle::new();
            style.attributes.set(Attribute::Dim);
            style
        };
        let mut parts = Vec::new();
        if let Some(time) = &self.time {
            parts.push(time.clone());
        }
        if let Some(label) = self.level.label() {
            let mut style = ContentStyle::new();
            style.foreground_color = Some(self.level.color());
            style.attributes.set(Attribute::Bold);
            parts.push(paint(style, label));
        }
        if !self.prefix.is_empty() {
            let mut style = faint;
            style.attributes.set(Attribute::Bold);
            parts.push(paint(style, &format!("{}:", self.prefix)));
        }
        if !self.message.is_empty() {
            parts.push(self.message.clone());
        }
        for (key, value) in &self.fields {
            parts.push(format!("{}{}{}", paint(faint, key), paint(faint, "="), logfmt_value(value)));
        }
        parts.join(" ")
    }

    pub fn json(&self) -> String {
        let mut entries: Vec<(&str, &str)> = Vec::new();
        if let Some(time) = &self.time {
            entries.push(("time", time));
        }
        if let Some(level) = self.level.name() {
            entries.push(("level", level));
        }
        if !self.prefix.is_empty() {
            entries.push(("prefix", &self.prefix));
        }
        entries.push(("msg", &self.message));
        entries.extend(self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let body = entries
            .iter()
            .map(|(k, v)| format!("{}:{}", quote(k), quote(v)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{body}}}")
    }

    pub fn logfmt(&self) -> String {
        let mut parts = Vec::new();
        if let Some(time) = &self.time {
            parts.push(format!("time={}", logfmt_value(time)));
        }
        if let Some(level) = self.level.name() {
            parts.push(format!("level={level}"));
        }
        if !self.prefix.is_empty() {
            parts.push(format!("prefix={}", logfmt_value(&self.prefix)));
        }
        parts.push(format!("msg={}", logfmt_value(&self.message)));
        for (key, value) in &self.fields {
            parts.push(format!("{key}={}", logfmt_value(value)));
        }
        parts.join(" ")
    }

    pub fn render(&self, formatter: Formatter, color: bool) -> String {
        match formatter {
            Formatter::Text => self.text(color),
            Formatter::Json => self.json(),
            Formatter::Logfmt => self.logfmt(),
        }
    }
}

pub fn run(args: &LogArgs) -> anyhow::Result<Outcome> {
    let record = Record::from_args(args, Local::now())?;
    let outcome = if record.level == Level::Fatal {
        Outcome::Exited { code: EXIT_DECLINED, output: None }
    } else {
        Outcome::Committed(None)
    };
    if args.min_level.is_some_and(|min| record.level < min) {
        return Ok(outcome);
    }

    match &args.file {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            writeln!(file, "{}", record.render(args.formatter, false))
                .with_context(|| format!("writing log file {}", path.display()))?;
        }
        None => {
            let stderr = io::stderr();
            let color = stderr.is_terminal();
            writeln!(stderr.lock(), "{}", record.render(args.formatter, color)).context("writing log record")?;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(text: &[&str]) -> LogArgs {
        LogArgs {
            text: text.iter().map(|s| (*s).to_string()).collect(),
            file: None,
            format: false,
            formatter: Formatter::Text,
            level: Level::None,
            min_level: None,
            prefix: String::new(),
            structured: false,
            time: String::new(),
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_plain_text_record() {
        let mut a = args(&["disk", "almost", "full"]);
        a.level = Level::Warn;
        a.prefix = "backup".into();
        let record = Record::from_args(&a, noon()).unwrap();
        assert_eq!(record.text(false), "WARN backup: disk almost full");
    }

    #[test]
    fn test_structured_pairs() {
        let mut a = args(&["starting", "port", "8080", "host", "local host", "dangling"]);
        a.structured = true;
        a.level = Level::Info;
        let record = Record::from_args(&a, noon()).unwrap();
        assert_eq!(
            record.text(false),
            "INFO starting port=8080 host=\"local host\" dangling=(MISSING)"
        );
        assert_eq!(
            record.logfmt(),
            "level=info msg=starting port=8080 host=\"local host\" dangling=(MISSING)"
        );
    }

    #[test]
    fn test_json_keeps_field_order() {
        let mut a = args(&["done", "n", "3"]);
        a.structured = true;
        a.level = Level::Error;
        a.time = "datetime".into();
        let record = Record::from_args(&a, noon()).unwrap();
        assert_eq!(
            record.json(),
            r#"{"time":"2024-03-09 12:30:05","level":"error","msg":"done","n":"3"}"#
        );
    }

    #[test]
    fn test_printf_verbs() {
        assert_eq!(printf("%s has %d items (%q) 100%%", &["cart".into(), "3".into(), "a b".into()]), "cart has 3 items (\"a b\") 100%");
        assert_eq!(printf("%s and %s", &["one".into()]), "one and %!s(MISSING)");
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(time_format("").unwrap(), None);
        assert_eq!(time_format("Kitchen").unwrap().as_deref(), Some("%-I:%M%p"));
        assert_eq!(time_format("%H:%M").unwrap().as_deref(), Some("%H:%M"));
        assert!(time_format("%Q").is_err());
        let mut a = args(&["tick"]);
        a.time = "kitchen".into();
        assert_eq!(Record::from_args(&a, noon()).unwrap().text(false), "12:30PM tick");
    }

    #[test]
    fn test_file_output_appends_and_fatal_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut a = args(&["first"]);
        a.file = Some(path.clone());
        assert_eq!(run(&a).unwrap().exit_code(), 0);
        a.text = vec!["second".into()];
        a.level = Level::Fatal;
        assert_eq!(run(&a).unwrap().exit_code(), 1);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "first\nFATA second\n");
    }

    #[test]
    fn test_min_level_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut a = args(&["noise"]);
        a.file = Some(path.clone());
        a.level = Level::Debug;
        a.min_level = Some(Level::Info);
        run(&a).unwrap();
        assert!(!path.exists());
    }
}
