//! Progress line templates.
//!
//! Placeholders: `{Title} {Iter} {Limit} {Elapsed} {Avg} {Pct} {Remaining}
//! {Eta} {Bar}`. Anything else in braces is left alone. Placeholders that
//! need a known limit stay literal while the limit is 0.

use super::info::{format_duration, round_secs, ProgressInfo};
use chrono::{DateTime, Local, TimeDelta};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

static BAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*Bar\s*\}").expect("bar pattern is valid"));
static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\s*(Title|Elapsed|Iter|Avg|Pct|Eta|Remaining|Limit)\s*\}").expect("field pattern is valid")
});

const FILLED: char = '█';
const EMPTY: char = '░';

#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    bars: usize,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let bars = BAR.find_iter(&source).count();
        Self { source, bars }
    }

    /// Default layout for the given options.
    pub fn default_source(limit: u64, title: &str) -> &'static str {
        match (limit == 0, title.is_empty()) {
            (true, true) => "[Elapsed ~ {Elapsed}] Iter {Iter}",
            (true, false) => "[Elapsed ~ {Elapsed}] Iter {Iter} ~ {Title}",
            (false, true) => "{Bar} {Pct}",
            (false, false) => "{Title} ~ {Bar} {Pct}",
        }
    }

    pub fn bars(&self) -> usize {
        self.bars
    }

    /// Render one line at most `max_width` columns wide (bars shrink to fit).
    pub fn render(
        &self,
        info: &ProgressInfo,
        now: Instant,
        clock: DateTime<Local>,
        max_width: usize,
    ) -> String {
        let known = info.limit > 0;
        let rendered = FIELD
            .replace_all(&self.source, |caps: &Captures<'_>| {
                let literal = caps[0].to_string();
                match &caps[1] {
                    "Title" => info.title.clone(),
                    "Iter" => info.iter().to_string(),
                    "Limit" if known => info.limit.to_string(),
                    "Elapsed" => format_duration(info.elapsed(now)),
                    "Avg" => format_duration(round_secs(info.avg(now))),
                    "Pct" if known => format!("{}%", info.pct().unwrap_or(0)),
                    "Remaining" if known => format_duration(round_secs(info.eta(now))),
                    "Eta" if known => {
                        let eta = TimeDelta::from_std(info.eta(now)).unwrap_or(TimeDelta::zero());
                        (clock + eta).format("%H:%M:%S").to_string()
                    }
                    _ => literal,
                }
            })
            .into_owned();

        if !known || self.bars == 0 {
            return rendered;
        }
        let fixed = BAR.replace_all(&rendered, "").width();
        let width = max_width.saturating_sub(fixed) / self.bars;
        let bar = render_bar(info.ratio(), width);
        BAR.replace_all(&rendered, bar.as_str()).into_owned()
    }
}

/// A bar `width` cells wide filled to `ratio`.
pub fn render_bar(ratio: f64, width: usize) -> String {
    let filled = ((width as f64) * ratio.clamp(0.0, 1.0)).round() as usize;
    let filled = filled.min(width);
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(width - filled));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_placeholder_patterns_compile() {
        assert!(BAR.is_match("{ Bar }"));
        assert!(FIELD.is_match("{Pct}"));
        assert!(!FIELD.is_match("{Unknown}"));
    }

    fn clock() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn test_defaults_follow_limit_and_title() {
        assert_eq!(Template::default_source(0, ""), "[Elapsed ~ {Elapsed}] Iter {Iter}");
        assert_eq!(Template::default_source(5, "Copy"), "{Title} ~ {Bar} {Pct}");
    }

    #[test]
    fn test_full_bar_at_limit() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("", 4, start);
        for i in 1..=4 {
            info.increment(1, start + Duration::from_millis(i * 100));
        }
        let tpl = Template::new("{Bar} {Pct} {Remaining}");
        let line = tpl.render(&info, start + Duration::from_secs(1), clock(), 20);
        assert!(line.ends_with(" 100% 0s"), "{line}");
        let bar: String = line.chars().take_while(|c| *c == FILLED || *c == EMPTY).collect();
        assert_eq!(bar.chars().count(), 12);
        assert!(bar.chars().all(|c| c == FILLED));
    }

    #[test]
    fn test_limit_placeholders_stay_literal_without_limit() {
        let info = ProgressInfo::new("Sync", 0, Instant::now());
        let tpl = Template::new("{Title} {Iter}/{Limit} {Pct} {Eta} {Bar}");
        let line = tpl.render(&info, Instant::now(), clock(), 80);
        assert_eq!(line, "Sync 0/{Limit} {Pct} {Eta} {Bar}");
    }

    #[test]
    fn test_unknown_placeholders_untouched() {
        let info = ProgressInfo::new("", 2, Instant::now());
        let tpl = Template::new("{Nope} { Iter }");
        assert_eq!(tpl.render(&info, Instant::now(), clock(), 80), "{Nope} 0");
    }

    #[test]
    fn test_multiple_bars_split_width() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("", 2, start);
        info.increment(1, start);
        let tpl = Template::new("{Bar}|{Bar}");
        let line = tpl.render(&info, start, clock(), 21);
        let halves: Vec<&str> = line.split('|').collect();
        assert_eq!(halves[0].chars().count(), 10);
        assert_eq!(halves[0], halves[1]);
        assert_eq!(halves[0].chars().filter(|c| *c == FILLED).count(), 5);
    }

    #[test]
    fn test_bar_width_never_negative() {
        let info = ProgressInfo::new("a very long title", 3, Instant::now());
        let tpl = Template::new("{Title} {Bar}");
        assert_eq!(tpl.render(&info, Instant::now(), clock(), 5), "a very long title ");
    }

    #[test]
    fn test_eta_clock_format() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("", 3, start);
        info.increment(1, start + Duration::from_secs(10));
        let fixed = Local::now();
        let line = Template::new("{Eta}").render(&info, start + Duration::from_secs(10), fixed, 80);
        let expected = (fixed + TimeDelta::seconds(20)).format("%H:%M:%S").to_string();
        assert_eq!(line, expected);
    }
}
