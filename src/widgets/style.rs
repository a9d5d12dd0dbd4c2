//! `knit style`: colours, attributes, borders and spacing for a block of text.

use crate::config::Padding;
use crate::error::Error;
use crate::exit::Outcome;
use crate::pager::wrap;
use crate::stdin;
use clap::builder::BoolishValueParser;
use clap::{Args, ValueEnum};
use crossterm::style::{Attribute, Color, ContentStyle};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Border {
    #[default]
    None,
    Hidden,
    Normal,
    Rounded,
    Double,
    Thick,
}

/// Corner and edge glyphs: top-left, top, top-right, side, bottom-left, bottom-right.
struct Glyphs([char; 6]);

impl Border {
    fn glyphs(self) -> Option<Glyphs> {
        let set = match self {
            Border::None => return None,
            Border::Hidden => [' '; 6],
            Border::Normal => ['┌', '─', '┐', '│', '└', '┘'],
            Border::Rounded => ['╭', '─', '╮', '│', '╰', '╯'],
            Border::Double => ['╔', '═', '╗', '║', '╚', '╝'],
            Border::Thick => ['┏', '━', '┓', '┃', '┗', '┛'],
        };
        Some(Glyphs(set))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Args)]
pub struct StyleArgs {
    /// Text to style, read from stdin when omitted
    pub text: Vec<String>,

    #[arg(long, env = "KNIT_STYLE_FOREGROUND")]
    pub foreground: Option<String>,

    #[arg(long, env = "KNIT_STYLE_BACKGROUND")]
    pub background: Option<String>,

    #[arg(long, value_enum, default_value_t = Border::None, env = "KNIT_STYLE_BORDER")]
    pub border: Border,

    #[arg(long, env = "KNIT_STYLE_BORDER_FOREGROUND")]
    pub border_foreground: Option<String>,

    #[arg(long, env = "KNIT_STYLE_BORDER_BACKGROUND")]
    pub border_background: Option<String>,

    #[arg(long, value_enum, default_value_t = TextAlign::Left, env = "KNIT_STYLE_ALIGN")]
    pub align: TextAlign,

    /// Block width including padding (0 fits the text)
    #[arg(long, default_value_t = 0, env = "KNIT_STYLE_WIDTH")]
    pub width: u16,

    /// Minimum block height including padding
    #[arg(long, default_value_t = 0, env = "KNIT_STYLE_HEIGHT")]
    pub height: u16,

    #[arg(long, default_value = "0 0", env = "KNIT_STYLE_MARGIN")]
    pub margin: Padding,

    #[arg(long, default_value = "0 0", env = "KNIT_STYLE_PADDING")]
    pub padding: Padding,

    #[arg(long, env = "KNIT_STYLE_BOLD", value_parser = BoolishValueParser::new())]
    pub bold: bool,

    #[arg(long, env = "KNIT_STYLE_ITALIC", value_parser = BoolishValueParser::new())]
    pub italic: bool,

    #[arg(long, env = "KNIT_STYLE_UNDERLINE", value_parser = BoolishValueParser::new())]
    pub underline: bool,

    #[arg(long, env = "KNIT_STYLE_FAINT", value_parser = BoolishValueParser::new())]
    pub faint: bool,

    #[arg(long, env = "KNIT_STYLE_STRIKETHROUGH", value_parser = BoolishValueParser::new())]
    pub strikethrough: bool,
}

/// Parse `#rrggbb`, an ANSI index or a basic colour name.
pub fn parse_color(raw: &str) -> Result<Color, Error> {
    let value = raw.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
        };
        return match (hex.len(), channel(0), channel(2), channel(4)) {
            (6, Some(r), Some(g), Some(b)) => Ok(Color::Rgb { r, g, b }),
            _ => Err(Error::InvalidOption(format!("invalid colour {raw:?}"))),
        };
    }
    if let Ok(index) = value.parse::<u8>() {
        return Ok(Color::AnsiValue(index));
    }
    let color = match value.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::DarkRed,
        "green" => Color::DarkGreen,
        "yellow" => Color::DarkYellow,
        "blue" => Color::DarkBlue,
        "magenta" => Color::DarkMagenta,
        "cyan" => Color::DarkCyan,
        "white" => Color::Grey,
        "gray" | "grey" => Color::DarkGrey,
        _ => return Err(Error::InvalidOption(format!("invalid colour {raw:?}"))),
    };
    Ok(color)
}

fn parse_opt(raw: Option<&str>) -> Result<Option<Color>, Error> {
    raw.filter(|r| !r.trim().is_empty()).map(parse_color).transpose()
}

/// Everything needed to lay out and paint one block.
#[derive(Debug, Clone, Default)]
pub struct BlockStyle {
    pub content: ContentStyle,
    pub border: Border,
    pub border_style: ContentStyle,
    pub align: TextAlign,
    pub width: usize,
    pub height: usize,
    pub padding: Padding,
    pub margin: Padding,
}

impl BlockStyle {
    pub fn from_args(args: &StyleArgs) -> Result<Self, Error> {
        let mut content = ContentStyle::new();
        content.foreground_color = parse_opt(args.foreground.as_deref())?;
        content.background_color = parse_opt(args.background.as_deref())?;
        for (on, attribute) in [
            (args.bold, Attribute::Bold),
            (args.italic, Attribute::Italic),
            (args.underline, Attribute::Underlined),
            (args.faint, Attribute::Dim),
            (args.strikethrough, Attribute::CrossedOut),
        ] {
            if on {
                content.attributes.set(attribute);
            }
        }
        let mut border_style = ContentStyle::new();
        border_style.foreground_color = parse_opt(args.border_foreground.as_deref())?;
        border_style.background_color = parse_opt(args.border_background.as_deref())?;
        Ok(Self {
            content,
            border: args.border,
            border_style,
            align: args.align,
            width: usize::from(args.width),
            height: usize::from(args.height),
            padding: args.padding,
            margin: args.margin,
        })
    }

    pub fn render(&self, text: &str) -> String {
        let pad_x = usize::from(self.padding.left) + usize::from(self.padding.right);
        let pad_y = usize::from(self.padding.top) + usize::from(self.padding.bottom);

        let wrap_at = (self.width > 0).then(|| self.width.saturating_sub(pad_x).max(1));
        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            match wrap_at {
                Some(width) => lines.extend(wrap(line, width).into_iter().map(|r| line[r].to_string())),
                None => lines.push(line.to_string()),
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        let inner = wrap_at.unwrap_or_else(|| lines.iter().map(|l| l.width()).max().unwrap_or(0));
        let rows = lines.len().max(self.height.saturating_sub(pad_y));
        lines.resize(rows, String::new());

        let left_pad = " ".repeat(usize::from(self.padding.left));
        let right_pad = " ".repeat(usize::from(self.padding.right));
        let block_width = inner + pad_x;
        let blank = " ".repeat(block_width);
        let mut body: Vec<String> = Vec::with_capacity(rows + pad_y);
        body.extend(std::iter::repeat_n(blank.clone(), usize::from(self.padding.top)));
        for line in &lines {
            let extra = inner.saturating_sub(line.width());
            let (before, after) = match self.align {
                TextAlign::Left => (0, extra),
                TextAlign::Right => (extra, 0),
                TextAlign::Center => (extra / 2, extra - extra / 2),
            };
            body.push(format!(
                "{left_pad}{}{line}{}{right_pad}",
                " ".repeat(before),
                " ".repeat(after)
            ));
        }
        body.extend(std::iter::repeat_n(blank, usize::from(self.padding.bottom)));
        let mut painted: Vec<String> = body.iter().map(|l| paint(self.content, l)).collect();

        if let Some(Glyphs([tl, top, tr, side, bl, br])) = self.border.glyphs() {
            let edge: String = std::iter::repeat_n(top, block_width).collect();
            let side = paint(self.border_style, &side.to_string());
            painted = std::iter::once(paint(self.border_style, &format!("{tl}{edge}{tr}")))
                .chain(painted.into_iter().map(|l| format!("{side}{l}{side}")))
                .chain(std::iter::once(paint(self.border_style, &format!("{bl}{edge}{br}"))))
                .collect();
        }

        let margin_left = " ".repeat(usize::from(self.margin.left));
        let margin_right = " ".repeat(usize::from(self.margin.right));
        let mut out: Vec<String> = vec![String::new(); usize::from(self.margin.top)];
        out.extend(painted.into_iter().map(|l| format!("{margin_left}{l}{margin_right}")));
        out.extend(std::iter::repeat_n(String::new(), usize::from(self.margin.bottom)));
        out.join("\n")
    }
}

fn paint(style: ContentStyle, text: &str) -> String {
    if style == ContentStyle::new() {
        return text.to_string();
    }
    style.apply(text).to_string()
}

pub fn run(args: &StyleArgs) -> anyhow::Result<Outcome> {
    let style = BlockStyle::from_args(args)?;
    let text = if args.text.is_empty() {
        stdin::read(false)?
    } else {
        args.text.join("\n")
    };
    tracing::debug!(border = ?style.border, width = style.width, "styling block");
    Ok(Outcome::committed(style.render(text.trim_end_matches('\n'))))
}
