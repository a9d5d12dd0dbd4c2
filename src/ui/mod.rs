//! # UI Building Blocks
//!
//! Pieces the widgets compose their views from:
//!
//! - [`theme`] - semantic colour roles and the built-in themes
//! - [`render`] - help lines, headers, padding, pagination dots
//! - [`textinput`] / [`textarea`] - single and multi-line editors
//! - [`terminal_widget`] - styled snapshot of a vt100 screen

pub mod render;
pub mod terminal_widget;
pub mod textarea;
pub mod textinput;
pub mod theme;

pub use textarea::TextArea;
pub use textinput::TextInput;
pub use theme::Theme;
