//! Selection state shared by `choose`, `filter`, `table` and `file`.
//!
//! Invariants kept by every mutating method:
//!
//! - `cursor` stays within `0..=max(0, matches - 1)`,
//! - the number of selected candidates never exceeds the limit,
//! - selections are keyed by candidate index, so they survive query changes,
//! - the viewport always contains the cursor.

use super::matcher::{Candidate, Match, Matcher};
use std::collections::BTreeMap;

/// How many candidates may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    One,
    AtMost(usize),
    Unlimited,
}

impl Limit {
    pub fn from_flags(limit: usize, no_limit: bool) -> Self {
        if no_limit {
            Limit::Unlimited
        } else if limit <= 1 {
            Limit::One
        } else {
            Limit::AtMost(limit)
        }
    }

    pub fn cap(self) -> usize {
        match self {
            Limit::One => 1,
            Limit::AtMost(n) => n,
            Limit::Unlimited => usize::MAX,
        }
    }

    pub fn is_single(self) -> bool {
        self == Limit::One
    }
}

/// Behaviour when moving past the first or last match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Wrap,
    Clamp,
}

#[derive(Debug)]
pub struct Selection {
    candidates: Vec<Candidate>,
    matcher: Matcher,
    query: String,
    matches: Vec<Match>,
    cursor: usize,
    /// Candidate index to the order it was selected in.
    selected: BTreeMap<usize, u64>,
    next_order: u64,
    limit: Limit,
    edge: Edge,
    top: usize,
    height: usize,
}

impl Selection {
    pub fn new(candidates: Vec<Candidate>, matcher: Matcher, limit: Limit, edge: Edge) -> Self {
        let matches = matcher.matches("", &candidates);
        Self {
            candidates,
            matcher,
            query: String::new(),
            matches,
            cursor: 0,
            selected: BTreeMap::new(),
            next_order: 0,
            limit,
            edge,
            top: 0,
            height: 10,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains_key(&index)
    }

    /// The match under the cursor.
    pub fn current(&self) -> Option<&Match> {
        self.matches.get(self.cursor)
    }

    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.current().and_then(|m| self.candidates.get(m.index))
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.ensure_visible();
    }

    /// Recompute matches for a new query, keeping selections.
    pub fn set_query(&mut self, query: &str) {
        if query == self.query {
            return;
        }
        self.query = query.to_string();
        self.matches = self.matcher.matches(&self.query, &self.candidates);
        self.clamp();
    }

    fn last(&self) -> usize {
        self.matches.len().saturating_sub(1)
    }

    fn clamp(&mut self) {
        self.cursor = self.cursor.min(self.last());
        self.top = self.top.min(self.matches.len().saturating_sub(self.height));
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        if self.cursor < self.top {
            self.top = self.cursor;
        } else if self.cursor >= self.top + self.height {
            self.top = self.cursor + 1 - self.height;
        }
    }

    pub fn move_down(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        if self.cursor < self.last() {
            self.cursor += 1;
        } else if self.edge == Edge::Wrap {
            self.cursor = 0;
        }
        self.ensure_visible();
    }

    pub fn move_up(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.edge == Edge::Wrap {
            self.cursor = self.last();
        }
        self.ensure_visible();
    }

    pub fn page_down(&mut self) {
        self.cursor = (self.cursor + self.height).min(self.last());
        self.top = (self.top + self.height).min(self.matches.len().saturating_sub(self.height));
        self.ensure_visible();
    }

    pub fn page_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(self.height);
        self.top = self.top.saturating_sub(self.height);
        self.ensure_visible();
    }

    pub fn home(&mut self) {
        self.cursor = 0;
        self.ensure_visible();
    }

    pub fn end(&mut self) {
        self.cursor = self.last();
        self.ensure_visible();
    }

    /// Place the cursor on the match for a candidate index, if visible.
    pub fn focus(&mut self, index: usize) {
        if let Some(pos) = self.matches.iter().position(|m| m.index == index) {
            self.cursor = pos;
            self.ensure_visible();
        }
    }

    /// Select a candidate. Ignored past the limit; idempotent when already
    /// selected.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.candidates.len() || self.selected.contains_key(&index) {
            return false;
        }
        if self.selected.len() >= self.limit.cap() {
            return false;
        }
        self.selected.insert(index, self.next_order);
        self.next_order += 1;
        true
    }

    pub fn deselect(&mut self, index: usize) -> bool {
        self.selected.remove(&index).is_some()
    }

    /// Toggle the candidate under the cursor. A no-op with a limit of one.
    pub fn toggle_current(&mut self) -> bool {
        if self.limit.is_single() {
            return false;
        }
        let Some(index) = self.current().map(|m| m.index) else {
            return false;
        };
        if self.is_selected(index) {
            self.deselect(index)
        } else {
            self.select(index)
        }
    }

    /// Select every current match, or clear them all when they already are.
    pub fn toggle_all(&mut self) {
        if self.limit.is_single() {
            return;
        }
        let indices: Vec<usize> = self.matches.iter().map(|m| m.index).collect();
        if indices.iter().all(|i| self.is_selected(*i)) {
            for index in indices {
                self.deselect(index);
            }
        } else {
            for index in indices {
                self.select(index);
            }
        }
    }

    /// Pre-select by label or value; `*` selects everything. With a limit
    /// of one the first name only positions the cursor.
    pub fn preselect(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let all = names.iter().any(|name| name == "*");
        let hits: Vec<usize> = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| all || names.iter().any(|n| *n == c.label || *n == c.value))
            .map(|(i, _)| i)
            .collect();

        if self.limit.is_single() {
            if let Some(first) = hits.first() {
                self.focus(*first);
            }
            return;
        }
        for index in hits {
            self.select(index);
        }
    }

    /// What Enter commits: the cursor item for single selection; otherwise
    /// the selected items, falling back to the cursor item.
    pub fn commit(&self, ordered: bool) -> Vec<&Candidate> {
        if self.limit.is_single() || self.selected.is_empty() {
            return self.current_candidate().into_iter().collect();
        }
        let mut picked: Vec<(usize, u64)> = self.selected.iter().map(|(i, o)| (*i, *o)).collect();
        if ordered {
            picked.sort_by_key(|(_, order)| *order);
        }
        picked
            .into_iter()
            .filter_map(|(index, _)| self.candidates.get(index))
            .collect()
    }

    /// Matches inside the viewport, with their row position.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Match)> {
        self.matches
            .iter()
            .enumerate()
            .skip(self.top)
            .take(self.height)
    }

    /// Page count and current page, for pagination dots.
    pub fn pages(&self) -> (usize, usize) {
        let pages = self.matches.len().div_ceil(self.height).max(1);
        (pages, self.cursor / self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::matcher::MatchMode;
    use proptest::prelude::*;

    fn selection(items: &[&str], limit: Limit, edge: Edge) -> Selection {
        let candidates = items.iter().map(|s| Candidate::new(*s)).collect();
        Selection::new(candidates, Matcher::default(), limit, edge)
    }

    fn committed(sel: &Selection, ordered: bool) -> Vec<String> {
        sel.commit(ordered).iter().map(|c| c.value.clone()).collect()
    }

    #[test]
    fn test_limit_from_flags() {
        assert_eq!(Limit::from_flags(1, false), Limit::One);
        assert_eq!(Limit::from_flags(0, false), Limit::One);
        assert_eq!(Limit::from_flags(3, false), Limit::AtMost(3));
        assert_eq!(Limit::from_flags(1, true), Limit::Unlimited);
    }

    #[test]
    fn test_clamp_edge_stops_at_ends() {
        let mut sel = selection(&["a", "b", "c"], Limit::One, Edge::Clamp);
        sel.move_up();
        assert_eq!(sel.cursor(), 0);
        sel.end();
        sel.move_down();
        assert_eq!(sel.cursor(), 2);
    }

    #[test]
    fn test_wrap_edge_cycles() {
        let mut sel = selection(&["a", "b", "c"], Limit::One, Edge::Wrap);
        sel.move_up();
        assert_eq!(sel.cursor(), 2);
        sel.move_down();
        assert_eq!(sel.cursor(), 0);
    }

    #[test]
    fn test_single_limit_commits_cursor_and_ignores_toggle() {
        let mut sel = selection(&["Strawberry", "Banana", "Cherry"], Limit::One, Edge::Clamp);
        sel.move_down();
        assert!(!sel.toggle_current());
        assert_eq!(committed(&sel, false), vec!["Banana"]);
    }

    #[test]
    fn test_cap_silently_ignores_extra_selections() {
        let mut sel = selection(&["a", "b", "c"], Limit::AtMost(2), Edge::Clamp);
        for _ in 0..3 {
            sel.toggle_current();
            sel.move_down();
        }
        assert_eq!(sel.selected_count(), 2);
        assert_eq!(committed(&sel, false), vec!["a", "b"]);
    }

    #[test]
    fn test_multi_without_selection_commits_cursor() {
        let mut sel = selection(&["a", "b"], Limit::Unlimited, Edge::Clamp);
        sel.move_down();
        assert_eq!(committed(&sel, false), vec!["b"]);
    }

    #[test]
    fn test_ordered_commit_uses_selection_order() {
        let mut sel = selection(&["a", "b", "c"], Limit::Unlimited, Edge::Clamp);
        sel.end();
        sel.toggle_current();
        sel.home();
        sel.toggle_current();
        assert_eq!(committed(&sel, false), vec!["a", "c"]);
        assert_eq!(committed(&sel, true), vec!["c", "a"]);
    }

    #[test]
    fn test_selection_survives_query_changes() {
        let mut sel = selection(&["apple", "banana", "grape"], Limit::Unlimited, Edge::Wrap);
        sel.move_down();
        sel.toggle_current();
        sel.set_query("ap");
        assert!(sel.is_selected(1));
        sel.set_query("");
        assert!(sel.is_selected(1));
    }

    #[test]
    fn test_cursor_clamped_when_matches_shrink() {
        let mut sel = selection(&["apple", "banana", "grape"], Limit::One, Edge::Wrap);
        sel.end();
        sel.set_query("ban");
        assert_eq!(sel.cursor(), 0);
        sel.set_query("zzz");
        assert_eq!(sel.cursor(), 0);
        assert!(sel.current().is_none());
        assert!(sel.commit(false).is_empty());
    }

    #[test]
    fn test_preselect_star_and_names() {
        let mut sel = selection(&["a", "b", "c"], Limit::Unlimited, Edge::Clamp);
        sel.preselect(&["*".to_string()]);
        assert_eq!(sel.selected_count(), 3);

        let mut single = selection(&["a", "b", "c"], Limit::One, Edge::Clamp);
        single.preselect(&["c".to_string()]);
        assert_eq!(single.cursor(), 2);
        assert_eq!(single.selected_count(), 0);
    }

    #[test]
    fn test_toggle_all_respects_cap() {
        let mut sel = selection(&["a", "b", "c"], Limit::AtMost(2), Edge::Clamp);
        sel.toggle_all();
        assert_eq!(sel.selected_count(), 2);
    }

    #[test]
    fn test_viewport_follows_cursor() {
        let items: Vec<String> = (0..20).map(|i| format!("item {i}")).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let mut sel = selection(&refs, Limit::One, Edge::Clamp);
        sel.set_height(5);
        for _ in 0..7 {
            sel.move_down();
        }
        assert_eq!(sel.cursor(), 7);
        assert_eq!(sel.top(), 3);
        let rows: Vec<usize> = sel.visible().map(|(i, _)| i).collect();
        assert_eq!(rows, vec![3, 4, 5, 6, 7]);
        assert_eq!(sel.pages(), (4, 1));
    }

    #[test]
    fn test_exact_mode_selection() {
        let candidates = ["foo bar", "bar", "baz"].iter().map(|s| Candidate::new(*s)).collect();
        let mut sel = Selection::new(
            candidates,
            Matcher::new(MatchMode::Exact, false),
            Limit::One,
            Edge::Wrap,
        );
        sel.set_query("bar");
        assert_eq!(sel.matches().len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Up,
        Down,
        PageUp,
        PageDown,
        Toggle,
        ToggleAll,
        Query(String),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Up),
            Just(Op::Down),
            Just(Op::PageUp),
            Just(Op::PageDown),
            Just(Op::Toggle),
            Just(Op::ToggleAll),
            "[a-e]{0,2}".prop_map(Op::Query),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_and_cap_invariants(
            items in prop::collection::vec("[a-e]{1,6}", 0..25),
            ops in prop::collection::vec(op(), 0..60),
            cap in 1usize..5,
            wrap in any::<bool>(),
            height in 1usize..8,
        ) {
            let candidates = items.iter().map(|s| Candidate::new(s.as_str())).collect();
            let edge = if wrap { Edge::Wrap } else { Edge::Clamp };
            let mut sel = Selection::new(candidates, Matcher::default(), Limit::from_flags(cap, false), edge);
            sel.set_height(height);
            for op in ops {
                match op {
                    Op::Up => sel.move_up(),
                    Op::Down => sel.move_down(),
                    Op::PageUp => sel.page_up(),
                    Op::PageDown => sel.page_down(),
                    Op::Toggle => { sel.toggle_current(); }
                    Op::ToggleAll => sel.toggle_all(),
                    Op::Query(q) => sel.set_query(&q),
                }
                prop_assert!(sel.cursor() <= sel.matches().len().saturating_sub(1));
                prop_assert!(sel.selected_count() <= cap);
                prop_assert!(sel.top() <= sel.cursor());
                prop_assert!(sel.cursor() < sel.top() + sel.height());
            }
        }

        #[test]
        fn prop_match_ranges_strictly_increase(
            label in "[a-zé日 ]{0,12}",
            query in "[a-zé日]{1,3}",
        ) {
            if let Some((_, ranges)) = Matcher::default().score(&query, &label) {
                for pair in ranges.windows(2) {
                    prop_assert!(pair[0].end < pair[1].start);
                }
                for range in &ranges {
                    prop_assert!(range.start < range.end);
                    prop_assert!(label.is_char_boundary(range.start));
                    prop_assert!(label.is_char_boundary(range.end));
                }
            }
        }
    }
}
