//! Query matching over candidate labels.
//!
//! Fuzzy mode scores subsequence matches with skim's V2 algorithm; exact
//! mode looks for a case-insensitive substring. Both report the matched
//! positions as byte ranges into the label, merged where contiguous.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::ops::Range;

/// One selectable entry: what is shown and what is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub value: String,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            value: text,
        }
    }

    /// Split `label<delimiter>value` once. Without the delimiter the whole
    /// text is both label and value.
    pub fn split(text: &str, delimiter: &str) -> Self {
        if delimiter.is_empty() {
            return Self::new(text);
        }
        match text.split_once(delimiter) {
            Some((label, value)) => Self {
                label: label.to_string(),
                value: value.to_string(),
            },
            None => Self::new(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Position in the candidate list.
    pub index: usize,
    pub score: i64,
    /// Byte ranges into the label, ascending and non-overlapping.
    pub ranges: Vec<Range<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Fuzzy,
    Exact,
}

pub struct Matcher {
    mode: MatchMode,
    sort: bool,
    skim: SkimMatcherV2,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("mode", &self.mode)
            .field("sort", &self.sort)
            .finish()
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchMode::Fuzzy, true)
    }
}

impl Matcher {
    pub fn new(mode: MatchMode, sort: bool) -> Self {
        Self {
            mode,
            sort,
            skim: SkimMatcherV2::default().ignore_case(),
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Score one label. `None` when the query does not match.
    pub fn score(&self, query: &str, label: &str) -> Option<(i64, Vec<Range<usize>>)> {
        match self.mode {
            MatchMode::Fuzzy => {
                let (score, char_indices) = self.skim.fuzzy_indices(label, query)?;
                let offsets: Vec<usize> = label.char_indices().map(|(byte, _)| byte).collect();
                let bytes: Vec<usize> = char_indices
                    .into_iter()
                    .filter_map(|i| offsets.get(i).copied())
                    .collect();
                Some((score, collapse(label, &bytes)))
            }
            MatchMode::Exact => exact_match(query, label).map(|range| (0, vec![range])),
        }
    }

    /// Every candidate matching `query`, best first. An empty query matches
    /// everything in input order.
    pub fn matches(&self, query: &str, candidates: &[Candidate]) -> Vec<Match> {
        if query.is_empty() {
            return (0..candidates.len())
                .map(|index| Match {
                    index,
                    score: 0,
                    ranges: Vec::new(),
                })
                .collect();
        }
        let mut matches: Vec<Match> = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                self.score(query, &candidate.label)
                    .map(|(score, ranges)| Match {
                        index,
                        score,
                        ranges,
                    })
            })
            .collect();
        if self.sort {
            // Stable, so ties keep input order.
            matches.sort_by(|a, b| b.score.cmp(&a.score));
        }
        matches
    }
}

/// Case-insensitive substring search returning the matched byte range.
fn exact_match(query: &str, label: &str) -> Option<Range<usize>> {
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }
    let hay: Vec<(usize, char)> = label
        .char_indices()
        .flat_map(|(byte, c)| c.to_lowercase().map(move |lc| (byte, lc)))
        .collect();
    if hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find_map(|start| {
        let window = &hay[start..start + needle.len()];
        if window.iter().map(|(_, c)| *c).eq(needle.iter().copied()) {
            let (first, _) = window[0];
            let (last, _) = window[window.len() - 1];
            let last_len = label[last..].chars().next().map_or(1, char::len_utf8);
            Some(first..last + last_len)
        } else {
            None
        }
    })
}

/// Merge matched character start offsets into contiguous byte ranges.
pub fn collapse(label: &str, byte_starts: &[usize]) -> Vec<Range<usize>> {
    let mut sorted = byte_starts.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for start in sorted {
        let Some(c) = label.get(start..).and_then(|rest| rest.chars().next()) else {
            continue;
        };
        let end = start + c.len_utf8();
        match ranges.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => ranges.push(start..end),
        }
    }
    ranges
}
