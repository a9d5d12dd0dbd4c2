//! # Option Resolution
//!
//! Option values resolve as command-line flag, then `KNIT_*` environment
//! variable, then built-in default. Clap's `env` support covers the first
//! two steps; this module holds the pieces clap cannot express:
//!
//! - boolean parsing shared by `--flag=false` and the environment,
//! - `--no-<flag>` negation,
//! - the `${defaultPadding}` token and CSS-style padding values,
//! - runtime knobs (`KNIT_FPS`, `KNIT_ALTSCREEN`) read once per session.

use crate::error::Error;
use std::str::FromStr;

/// Literal used as the default of every `--padding` option.
pub const DEFAULT_PADDING_TOKEN: &str = "${defaultPadding}";
const DEFAULT_PADDING: &str = "0 0";

pub const FPS_VAR: &str = "KNIT_FPS";
pub const ALTSCREEN_VAR: &str = "KNIT_ALTSCREEN";

/// Parse a boolean the way the environment spells them.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Combine a boolean option with its `--no-` form.
pub fn flag(value: bool, negated: bool) -> bool {
    value && !negated
}

/// Substitute the default padding token.
pub fn resolve_defaults(value: &str) -> String {
    value.replace(DEFAULT_PADDING_TOKEN, DEFAULT_PADDING)
}

/// Padding in cells, CSS order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl FromStr for Padding {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let resolved = resolve_defaults(raw);
        let values = resolved
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse::<u16>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidPadding(raw.to_string()))?;

        let padding = match values.as_slice() {
            [all] => Padding {
                top: *all,
                right: *all,
                bottom: *all,
                left: *all,
            },
            [vertical, horizontal] => Padding {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            },
            [top, horizontal, bottom] => Padding {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            },
            [top, right, bottom, left] => Padding {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            },
            _ => return Err(Error::InvalidPadding(raw.to_string())),
        };
        Ok(padding)
    }
}

/// Knobs every interactive session reads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeKnobs {
    pub fps: Option<u32>,
    pub alt_screen: bool,
}

impl RuntimeKnobs {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve knobs through an arbitrary lookup, for isolated tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fps = lookup(FPS_VAR)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|fps| *fps > 0)
            .and_then(|fps| u32::try_from(fps).ok());
        let alt_screen = lookup(ALTSCREEN_VAR)
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(false);
        Self { fps, alt_screen }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_negation_wins() {
        assert!(flag(true, false));
        assert!(!flag(true, true));
        assert!(!flag(false, false));
    }

    #[test]
    fn test_default_padding_token() {
        let padding: Padding = DEFAULT_PADDING_TOKEN.parse().unwrap();
        assert_eq!(padding, Padding::default());
    }

    #[test]
    fn test_padding_css_shorthand() {
        let p: Padding = "1 2".parse().unwrap();
        assert_eq!((p.top, p.right, p.bottom, p.left), (1, 2, 1, 2));
        let p: Padding = "1 2 3".parse().unwrap();
        assert_eq!((p.top, p.right, p.bottom, p.left), (1, 2, 3, 2));
        let p: Padding = "1,2,3,4".parse().unwrap();
        assert_eq!((p.top, p.right, p.bottom, p.left), (1, 2, 3, 4));
    }

    #[test]
    fn test_padding_rejects_garbage() {
        assert!("a b".parse::<Padding>().is_err());
        assert!("1 2 3 4 5".parse::<Padding>().is_err());
        assert!("".parse::<Padding>().is_err());
    }

    #[test]
    fn test_fps_ignores_invalid_values() {
        assert_eq!(RuntimeKnobs::from_lookup(lookup(&[("KNIT_FPS", "30")])).fps, Some(30));
        assert_eq!(RuntimeKnobs::from_lookup(lookup(&[("KNIT_FPS", "0")])).fps, None);
        assert_eq!(RuntimeKnobs::from_lookup(lookup(&[("KNIT_FPS", "-4")])).fps, None);
        assert_eq!(RuntimeKnobs::from_lookup(lookup(&[("KNIT_FPS", "fast")])).fps, None);
    }

    #[test]
    fn test_altscreen_knob() {
        assert!(RuntimeKnobs::from_lookup(lookup(&[("KNIT_ALTSCREEN", "true")])).alt_screen);
        assert!(!RuntimeKnobs::from_lookup(lookup(&[("KNIT_ALTSCREEN", "nah")])).alt_screen);
        assert!(!RuntimeKnobs::from_lookup(lookup(&[])).alt_screen);
    }
}
