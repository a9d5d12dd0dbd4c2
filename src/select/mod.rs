//! # Selection Core
//!
//! Matching, multi-selection under a limit, viewport paging and highlight
//! geometry for the list-based widgets.

pub mod highlight;
pub mod matcher;
pub mod state;

pub use matcher::{Candidate, Match, MatchMode, Matcher};
pub use state::{Edge, Limit, Selection};

/// Build candidates from raw items, splitting labels when a delimiter is set.
pub fn candidates(items: &[String], label_delimiter: &str) -> Vec<Candidate> {
    items
        .iter()
        .map(|item| Candidate::split(item, label_delimiter))
        .collect()
}

/// Join committed values for the result stream.
pub fn join_values(picked: &[&Candidate], delimiter: &str) -> String {
    picked
        .iter()
        .map(|c| c.value.as_str())
        .collect::<Vec<_>>()
        .join(delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_uses_values() {
        let items = vec!["Apple:1".to_string(), "Pear:2".to_string()];
        let cands = candidates(&items, ":");
        let picked: Vec<&Candidate> = cands.iter().collect();
        assert_eq!(join_values(&picked, ","), "1,2");
    }
}
