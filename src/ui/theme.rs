//! # Colour Themes
//!
//! Widgets never hardcode colours; they ask the active [`Theme`] for the
//! style of a semantic role (cursor, header, match highlight, ...). The
//! theme is picked once per invocation with `--theme` / `KNIT_THEME`.
//!
//! ## Built-in Themes
//!
//! - **Terminal** (default) - indexed ANSI colours, follows the terminal palette
//! - **Catppuccin Mocha**, **Catppuccin Macchiato**, **Catppuccin Frappe**
//! - **Dracula**
//! - **Nord**
//! - **Gruvbox Dark**

use crate::error::Error;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,

    /// Regular item text.
    pub fg: Color,
    /// Help lines, placeholders, unselected prefixes.
    pub fg_dim: Color,
    /// Cursor, prompt and spinner.
    pub accent: Color,
    /// Headers and titles.
    pub header: Color,
    /// Matched characters in filter results and pager search hits.
    pub matched: Color,
    /// Selected prefix and affirmative button.
    pub selected: Color,
    /// Failures and the negative button when focused.
    pub error: Color,
    /// Background of the focused confirm button and current search hit.
    pub highlight_bg: Color,
}

impl Theme {
    pub fn all() -> &'static [Theme] {
        &BUILT_IN_THEMES
    }

    /// Find a built-in theme by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        BUILT_IN_THEMES
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn default_theme() -> &'static Theme {
        &BUILT_IN_THEMES[0]
    }

    /// Resolve the `--theme` option; `None` means the default.
    pub fn resolve(name: Option<&str>) -> Result<&'static Theme, Error> {
        match name {
            None => Ok(Self::default_theme()),
            Some(name) => Self::by_name(name).ok_or_else(|| Error::UnknownTheme(name.to_string())),
        }
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn cursor(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn header(&self) -> Style {
        Style::default().fg(self.header).add_modifier(Modifier::BOLD)
    }

    pub fn matched(&self) -> Style {
        Style::default()
            .fg(self.matched)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn selected(&self) -> Style {
        Style::default().fg(self.selected)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn button(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(Color::Black)
                .bg(self.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.fg).bg(self.highlight_bg)
        }
    }

    pub fn current_hit(&self) -> Style {
        Style::default().fg(Color::Black).bg(self.matched)
    }
}

static BUILT_IN_THEMES: [Theme; 7] = [
    Theme {
        name: "Terminal",
        fg: Color::Reset,
        fg_dim: Color::Indexed(244),
        accent: Color::Indexed(212),
        header: Color::Indexed(99),
        matched: Color::Indexed(212),
        selected: Color::Indexed(212),
        error: Color::Indexed(9),
        highlight_bg: Color::Indexed(235),
    },
    Theme {
        name: "Catppuccin Mocha",
        fg: Color::Rgb(205, 214, 244),           // text
        fg_dim: Color::Rgb(108, 112, 134),       // overlay0
        accent: Color::Rgb(245, 194, 231),       // pink
        header: Color::Rgb(203, 166, 247),       // mauve
        matched: Color::Rgb(249, 226, 175),      // yellow
        selected: Color::Rgb(166, 227, 161),     // green
        error: Color::Rgb(243, 139, 168),        // red
        highlight_bg: Color::Rgb(69, 71, 90),    // surface1
    },
    Theme {
        name: "Catppuccin Macchiato",
        fg: Color::Rgb(202, 211, 245),
        fg_dim: Color::Rgb(110, 115, 141),
        accent: Color::Rgb(245, 189, 230),
        header: Color::Rgb(198, 160, 246),
        matched: Color::Rgb(238, 212, 159),
        selected: Color::Rgb(166, 218, 149),
        error: Color::Rgb(237, 135, 150),
        highlight_bg: Color::Rgb(73, 77, 100),
    },
    Theme {
        name: "Catppuccin Frappe",
        fg: Color::Rgb(198, 208, 245),
        fg_dim: Color::Rgb(115, 121, 148),
        accent: Color::Rgb(244, 184, 228),
        header: Color::Rgb(202, 158, 230),
        matched: Color::Rgb(229, 200, 144),
        selected: Color::Rgb(166, 209, 137),
        error: Color::Rgb(231, 130, 132),
        highlight_bg: Color::Rgb(81, 87, 109),
    },
    Theme {
        name: "Dracula",
        fg: Color::Rgb(248, 248, 242),
        fg_dim: Color::Rgb(98, 114, 164),
        accent: Color::Rgb(255, 121, 198),
        header: Color::Rgb(189, 147, 249),
        matched: Color::Rgb(241, 250, 140),
        selected: Color::Rgb(80, 250, 123),
        error: Color::Rgb(255, 85, 85),
        highlight_bg: Color::Rgb(68, 71, 90),
    },
    Theme {
        name: "Nord",
        fg: Color::Rgb(216, 222, 233),
        fg_dim: Color::Rgb(76, 86, 106),
        accent: Color::Rgb(136, 192, 208),
        header: Color::Rgb(180, 142, 173),
        matched: Color::Rgb(235, 203, 139),
        selected: Color::Rgb(163, 190, 140),
        error: Color::Rgb(191, 97, 106),
        highlight_bg: Color::Rgb(67, 76, 94),
    },
    Theme {
        name: "Gruvbox Dark",
        fg: Color::Rgb(235, 219, 178),
        fg_dim: Color::Rgb(146, 131, 116),
        accent: Color::Rgb(211, 134, 155),
        header: Color::Rgb(131, 165, 152),
        matched: Color::Rgb(250, 189, 47),
        selected: Color::Rgb(184, 187, 38),
        error: Color::Rgb(251, 73, 52),
        highlight_bg: Color::Rgb(80, 73, 69),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn ctp(color: catppuccin::Color) -> Color {
        Color::Rgb(color.rgb.r, color.rgb.g, color.rgb.b)
    }

    #[test]
    fn test_default_follows_terminal_palette() {
        assert_eq!(Theme::default_theme().name, "Terminal");
        assert_eq!(Theme::default_theme().fg, Color::Reset);
    }

    #[test]
    fn test_resolve_unknown_theme_is_an_error() {
        assert!(Theme::resolve(Some("dracula")).is_ok());
        assert!(Theme::resolve(None).is_ok());
        assert!(matches!(
            Theme::resolve(Some("neon")),
            Err(Error::UnknownTheme(name)) if name == "neon"
        ));
    }

    #[test]
    fn test_catppuccin_mocha_matches_palette() {
        let mocha = catppuccin::PALETTE.mocha.colors;
        let theme = Theme::by_name("catppuccin mocha").expect("theme exists");
        assert_eq!(theme.fg, ctp(mocha.text));
        assert_eq!(theme.accent, ctp(mocha.pink));
        assert_eq!(theme.header, ctp(mocha.mauve));
        assert_eq!(theme.matched, ctp(mocha.yellow));
        assert_eq!(theme.error, ctp(mocha.red));
    }

    #[test]
    fn test_catppuccin_macchiato_matches_palette() {
        let macchiato = catppuccin::PALETTE.macchiato.colors;
        let theme = Theme::by_name("CATPPUCCIN MACCHIATO").expect("theme exists");
        assert_eq!(theme.fg, ctp(macchiato.text));
        assert_eq!(theme.selected, ctp(macchiato.green));
    }

    #[test]
    fn test_catppuccin_frappe_matches_palette() {
        let frappe = catppuccin::PALETTE.frappe.colors;
        let theme = Theme::by_name("Catppuccin Frappe").expect("theme exists");
        assert_eq!(theme.fg, ctp(frappe.text));
        assert_eq!(theme.fg_dim, ctp(frappe.overlay0));
    }

    #[test]
    fn test_theme_names_are_distinct() {
        let mut names: Vec<&str> = Theme::all().iter().map(|t| t.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
