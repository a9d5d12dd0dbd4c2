//! Regex search over pager content.
//!
//! Matches are found over the whole content (lines joined with `\n`) and
//! stored as per-line byte ranges. A match that spans a line break becomes
//! several pieces that share one index.

use regex::Regex;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub line: usize,
    pub range: Range<usize>,
    /// Which match this piece belongs to.
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Search {
    query: String,
    hits: Vec<Hit>,
    count: usize,
    current: Option<usize>,
}

impl Search {
    /// Run `query` over `lines`. An invalid pattern yields no matches.
    pub fn run(query: &str, lines: &[String]) -> Self {
        let mut search = Search {
            query: query.to_string(),
            ..Search::default()
        };
        if query.is_empty() {
            return search;
        }
        let re = match Regex::new(query) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!(query, error = %e, "invalid search pattern");
                return search;
            }
        };

        let content = lines.join("\n");
        let starts: Vec<usize> = std::iter::once(0)
            .chain(lines.iter().scan(0, |offset, line| {
                *offset += line.len() + 1;
                Some(*offset)
            }))
            .take(lines.len())
            .collect();

        for m in re.find_iter(&content).filter(|m| !m.is_empty()) {
            let index = search.count;
            search.count += 1;
            let first = starts.partition_point(|s| *s <= m.start()).saturating_sub(1);
            for (line, start) in starts.iter().enumerate().skip(first) {
                let end = start + lines[line].len();
                if *start >= m.end() {
                    break;
                }
                let lo = m.start().max(*start) - start;
                let hi = m.end().min(end) - start;
                if lo < hi {
                    search.hits.push(Hit {
                        line,
                        range: lo..hi,
                        index,
                    });
                }
            }
        }
        if search.count > 0 {
            search.current = Some(0);
        }
        search
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// First piece of the current match.
    pub fn current_hit(&self) -> Option<&Hit> {
        let current = self.current?;
        self.hits.iter().find(|h| h.index == current)
    }

    /// Advance to the next match, wrapping past the last.
    pub fn next(&mut self) -> Option<&Hit> {
        if self.count == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |c| (c + 1) % self.count));
        self.current_hit()
    }

    /// Step back to the previous match, wrapping past the first.
    pub fn prev(&mut self) -> Option<&Hit> {
        if self.count == 0 {
            return None;
        }
        self.current = Some(self.current.map_or(0, |c| (c + self.count - 1) % self.count));
        self.current_hit()
    }

    /// Pieces on `line`, each flagged when it belongs to the current match.
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = (Range<usize>, bool)> + '_ {
        let start = self.hits.partition_point(|h| h.line < line);
        self.hits[start..]
            .iter()
            .take_while(move |h| h.line == line)
            .map(|h| (h.range.clone(), Some(h.index) == self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_finds_non_overlapping_ranges_per_line() {
        let content = lines("foo bar foo\nbaz\nfoofoo");
        let search = Search::run("foo", &content);
        assert_eq!(search.len(), 4);
        let first: Vec<_> = search.on_line(0).collect();
        assert_eq!(first, vec![(0..3, true), (8..11, false)]);
        assert_eq!(search.on_line(1).count(), 0);
        let last: Vec<_> = search.on_line(2).map(|(r, _)| r).collect();
        assert_eq!(last, vec![0..3, 3..6]);
    }

    #[test]
    fn test_invalid_pattern_is_zero_matches() {
        let search = Search::run("(unclosed", &lines("(unclosed"));
        assert!(search.is_empty());
        assert_eq!(search.current(), None);
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let content = lines("a\nb\na\na");
        let mut search = Search::run("a", &content);
        assert_eq!(search.len(), 3);
        assert_eq!(search.next().map(|h| h.line), Some(2));
        assert_eq!(search.next().map(|h| h.line), Some(3));
        assert_eq!(search.next().map(|h| h.line), Some(0));
        assert_eq!(search.prev().map(|h| h.line), Some(3));
    }

    #[test]
    fn test_match_across_lines_is_split() {
        let content = lines("ab\ncd");
        let search = Search::run(r"b\nc", &content);
        assert_eq!(search.len(), 1);
        assert_eq!(search.on_line(0).next(), Some((1..2, true)));
        assert_eq!(search.on_line(1).next(), Some((0..1, true)));
    }

    #[test]
    fn test_empty_matches_skipped() {
        let search = Search::run("x*", &lines("abc"));
        assert!(search.is_empty());
    }
}
