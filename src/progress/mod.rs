//! # Progress Model
//!
//! [`ProgressInfo`] tracks units of progress against an optional limit;
//! [`Template`] lays them out on one line with embedded bars.

pub mod info;
pub mod template;

pub use info::{format_duration, ProgressInfo};
pub use template::{render_bar, Template};

/// Count non-overlapping occurrences of `indicator` in `chunk`, carrying a
/// partial match across chunk boundaries in `carry`.
pub fn count_indicators(indicator: &[u8], carry: &mut Vec<u8>, chunk: &[u8]) -> u64 {
    if indicator.is_empty() {
        return 0;
    }
    carry.extend_from_slice(chunk);
    let mut count = 0;
    let mut pos = 0;
    while pos + indicator.len() <= carry.len() {
        if carry[pos..].starts_with(indicator) {
            count += 1;
            pos += indicator.len();
        } else {
            pos += 1;
        }
    }
    // Keep only a tail that could still begin an indicator.
    let keep = (indicator.len() - 1).min(carry.len() - pos.min(carry.len()));
    let tail_start = carry.len() - keep;
    carry.drain(..tail_start);
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_newlines() {
        let mut carry = Vec::new();
        assert_eq!(count_indicators(b"\n", &mut carry, b"a\nb\nc"), 2);
        assert_eq!(count_indicators(b"\n", &mut carry, b"\n"), 1);
    }

    #[test]
    fn test_multibyte_indicator_split_across_chunks() {
        let mut carry = Vec::new();
        assert_eq!(count_indicators(b"##", &mut carry, b"x#"), 0);
        assert_eq!(count_indicators(b"##", &mut carry, b"#y##"), 2);
    }

    #[test]
    fn test_empty_indicator_counts_nothing() {
        let mut carry = Vec::new();
        assert_eq!(count_indicators(b"", &mut carry, b"abc"), 0);
    }
}
