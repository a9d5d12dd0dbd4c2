//! `knit join`: place multi-line blocks side by side or on top of each other.

use crate::exit::Outcome;
use crate::stdin::strip_ansi;
use clap::{Args, ValueEnum};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum JoinAlign {
    #[default]
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

/// Where shorter blocks sit along the cross axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Start,
    Center,
    End,
}

impl From<JoinAlign> for Position {
    fn from(align: JoinAlign) -> Self {
        match align {
            JoinAlign::Left | JoinAlign::Top => Position::Start,
            JoinAlign::Center | JoinAlign::Middle => Position::Center,
            JoinAlign::Right | JoinAlign::Bottom => Position::End,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct JoinArgs {
    /// Blocks to join
    #[arg(required = true)]
    pub text: Vec<String>,

    #[arg(long, value_enum, default_value_t = JoinAlign::Left, env = "KNIT_JOIN_ALIGN")]
    pub align: JoinAlign,

    /// Join side by side
    #[arg(long, conflicts_with = "vertical")]
    pub horizontal: bool,

    /// Join top to bottom
    #[arg(long)]
    pub vertical: bool,
}

/// Display width, ignoring escape sequences.
pub fn visible_width(text: &str) -> usize {
    strip_ansi(text).width()
}

fn block_width(lines: &[&str]) -> usize {
    lines.iter().map(|l| visible_width(l)).max().unwrap_or(0)
}

/// Split `extra` cells between the two sides for `position`.
fn split(extra: usize, position: Position) -> (usize, usize) {
    match position {
        Position::Start => (0, extra),
        Position::End => (extra, 0),
        Position::Center => (extra / 2, extra - extra / 2),
    }
}

/// Side by side, shorter blocks padded vertically per `position`.
pub fn join_horizontal(blocks: &[String], position: Position) -> String {
    let blocks: Vec<Vec<&str>> = blocks.iter().map(|b| b.lines().collect()).collect();
    let height = blocks.iter().map(Vec::len).max().unwrap_or(0);
    let columns: Vec<Vec<String>> = blocks
        .iter()
        .map(|lines| {
            let width = block_width(lines);
            let (above, below) = split(height - lines.len(), position);
            let blank = " ".repeat(width);
            std::iter::repeat_n(blank.clone(), above)
                .chain(lines.iter().map(|line| {
                    let fill = width - visible_width(line);
                    format!("{line}{}", " ".repeat(fill))
                }))
                .chain(std::iter::repeat_n(blank, below))
                .collect()
        })
        .collect();
    (0..height)
        .map(|row| columns.iter().map(|col| col[row].as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top to bottom, narrower lines padded horizontally per `position`.
pub fn join_vertical(blocks: &[String], position: Position) -> String {
    let lines: Vec<&str> = blocks.iter().flat_map(|b| b.lines()).collect();
    let width = block_width(&lines);
    lines
        .iter()
        .map(|line| {
            let extra = width - visible_width(line);
            let (left, right) = match position {
                // Odd leftovers go to the left when centering.
                Position::Center => (extra - extra / 2, extra / 2),
                _ => split(extra, position),
            };
            format!("{}{line}{}", " ".repeat(left), " ".repeat(right))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn run(args: &JoinArgs) -> anyhow::Result<Outcome> {
    let position = Position::from(args.align);
    let joined = if args.vertical {
        join_vertical(&args.text, position)
    } else {
        join_horizontal(&args.text, position)
    };
    Ok(Outcome::committed(joined))
}
