//! `knit format`: render markdown, templates, emoji shortcodes or code.

use crate::error::Error;
use crate::exit::Outcome;
use crate::stdin;
use crate::widgets::style::parse_color;
use clap::{Args, ValueEnum};
use crossterm::style::{Attribute, Color, ContentStyle};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatType {
    #[default]
    Markdown,
    Code,
    Template,
    Emoji,
}

#[derive(Debug, Clone, Args)]
pub struct FormatArgs {
    /// Text to format, read from stdin when omitted
    pub template: Vec<String>,

    #[arg(short = 't', long = "type", value_enum, default_value_t = FormatType::Markdown, env = "KNIT_FORMAT_TYPE")]
    pub kind: FormatType,
}

pub fn run(args: &FormatArgs) -> anyhow::Result<Outcome> {
    let source = if args.template.is_empty() {
        stdin::read(false)?
    } else {
        args.template.join("\n")
    };
    let rendered = match args.kind {
        FormatType::Markdown => markdown(&source),
        FormatType::Code => source.trim_end_matches('\n').to_string(),
        FormatType::Template => template(&source, |name| std::env::var(name).ok())?,
        FormatType::Emoji => emoji(&source),
    };
    Ok(Outcome::committed(rendered))
}

fn styled(style: ContentStyle, text: &str) -> String {
    if style == ContentStyle::new() {
        return text.to_string();
    }
    style.apply(text).to_string()
}

fn with_attribute(attribute: Attribute) -> ContentStyle {
    let mut style = ContentStyle::new();
    style.attributes.set(attribute);
    style
}

// --- markdown ---------------------------------------------------------------

const RULE_WIDTH: usize = 40;

struct Markdown {
    out: String,
    styles: Vec<ContentStyle>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    link_target: Vec<String>,
}

impl Markdown {
    fn new() -> Self {
        Self {
            out: String::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            link_target: Vec::new(),
        }
    }

    /// Union of every active style, later foregrounds winning.
    fn current(&self) -> ContentStyle {
        self.styles.iter().fold(ContentStyle::new(), |mut acc, s| {
            acc.attributes.extend(s.attributes);
            if s.foreground_color.is_some() {
                acc.foreground_color = s.foreground_color;
            }
            acc
        })
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn prefix(&mut self) {
        if self.at_line_start() && self.quote_depth > 0 {
            let bar = styled(with_attribute(Attribute::Dim), &"│ ".repeat(self.quote_depth));
            self.out.push_str(&bar);
        }
    }

    fn write(&mut self, text: &str) {
        let style = self.current();
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            if piece.is_empty() {
                continue;
            }
            self.prefix();
            if self.in_code_block && self.at_line_start_after_prefix() {
                self.out.push_str("    ");
            }
            self.out.push_str(&styled(style, piece));
        }
    }

    fn at_line_start_after_prefix(&self) -> bool {
        let line = self.out.rsplit('\n').next().unwrap_or_default();
        stdin::strip_ansi(line).chars().all(|c| c == '│' || c == ' ')
    }

    fn newline(&mut self) {
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn end_block(&mut self) {
        self.newline();
        if self.lists.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(level, ..) => {
                let depth = match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    HeadingLevel::H3 => 3,
                    HeadingLevel::H4 => 4,
                    HeadingLevel::H5 => 5,
                    HeadingLevel::H6 => 6,
                };
                let mut style = with_attribute(Attribute::Bold);
                style.foreground_color = Some(Color::DarkMagenta);
                self.styles.push(style);
                self.write(&format!("{} ", "#".repeat(depth)));
            }
            Tag::Emphasis => self.styles.push(with_attribute(Attribute::Italic)),
            Tag::Strong => self.styles.push(with_attribute(Attribute::Bold)),
            Tag::Strikethrough => self.styles.push(with_attribute(Attribute::CrossedOut)),
            Tag::BlockQuote => self.quote_depth += 1,
            Tag::CodeBlock(kind) => {
                self.newline();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    tracing::trace!(language = %lang, "code block");
                }
            }
            Tag::List(first) => {
                self.newline();
                self.lists.push(first);
            }
            Tag::Item => {
                self.newline();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.write(&format!("{indent}{bullet}"));
            }
            Tag::Link(_, url, _) | Tag::Image(_, url, _) => {
                self.styles.push(with_attribute(Attribute::Underlined));
                self.link_target.push(url.to_string());
            }
            Tag::TableCell => {
                if !self.at_line_start() {
                    self.write(" │ ");
                }
            }
            Tag::Paragraph
            | Tag::Table(_)
            | Tag::TableHead
            | Tag::TableRow
            | Tag::FootnoteDefinition(_) => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(..) => {
                self.styles.pop();
                self.end_block();
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.styles.pop();
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.end_block();
                }
            }
            Tag::BlockQuote => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.end_block();
            }
            Tag::CodeBlock(_) => {
                self.in_code_block = false;
                self.end_block();
            }
            Tag::List(_) => {
                self.lists.pop();
                self.end_block();
            }
            Tag::Item => self.newline(),
            Tag::Link(..) | Tag::Image(..) => {
                self.styles.pop();
                if let Some(url) = self.link_target.pop() {
                    let rendered = styled(with_attribute(Attribute::Dim), &format!(" ({url})"));
                    self.out.push_str(&rendered);
                }
            }
            Tag::TableHead | Tag::TableRow => self.newline(),
            Tag::Table(_) => self.end_block(),
            Tag::TableCell | Tag::FootnoteDefinition(_) => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.write(&text),
            Event::Code(code) => {
                let mut style = self.current();
                style.foreground_color = Some(Color::DarkYellow);
                self.prefix();
                self.out.push_str(&styled(style, &code));
            }
            Event::Html(html) => self.write(&html),
            Event::SoftBreak => self.write(" "),
            Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.newline();
                self.write(&"─".repeat(RULE_WIDTH));
                self.end_block();
            }
            Event::TaskListMarker(done) => self.write(if done { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(name) => self.write(&format!("[^{name}]")),
        }
    }
}

/// Render markdown to text with ANSI attributes.
pub fn markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let mut renderer = Markdown::new();
    for event in Parser::new_ext(source, options) {
        renderer.event(event);
    }
    renderer.out.trim_end_matches('\n').to_string()
}

// --- templates --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Str(String),
    Env(String),
    Ident(String),
    Pipe,
}

fn tokenize(action: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = action.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            tokens.push(Token::Pipe);
        } else if c == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some(other) => value.push(other),
                        None => break,
                    },
                    Some(other) => value.push(other),
                    None => return Err(Error::InvalidOption(format!("unterminated string in {{{{{action}}}}}"))),
                }
            }
            tokens.push(Token::Str(value));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '|' || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            match word.strip_prefix(".Env.") {
                Some(name) => tokens.push(Token::Env(name.to_string())),
                None => tokens.push(Token::Ident(word)),
            }
        }
    }
    Ok(tokens)
}

fn apply_function(name: &str, args: &[String]) -> Result<String, Error> {
    let one = |attribute: Attribute| match args {
        [text] => Ok(styled(with_attribute(attribute), text)),
        _ => Err(Error::InvalidOption(format!("{name} takes one argument"))),
    };
    match name {
        "Bold" => one(Attribute::Bold),
        "Italic" => one(Attribute::Italic),
        "Underline" => one(Attribute::Underlined),
        "Faint" => one(Attribute::Dim),
        "Strikethrough" => one(Attribute::CrossedOut),
        "Color" => match args {
            [fg, bg, text] => {
                let mut style = ContentStyle::new();
                if !fg.is_empty() {
                    style.foreground_color = Some(parse_color(fg)?);
                }
                if !bg.is_empty() {
                    style.background_color = Some(parse_color(bg)?);
                }
                Ok(styled(style, text))
            }
            _ => Err(Error::InvalidOption("Color takes foreground, background and text".into())),
        },
        other => Err(Error::InvalidOption(format!("unknown template function {other:?}"))),
    }
}

fn evaluate<F>(action: &str, env: &F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let tokens = tokenize(action)?;
    let mut value: Option<String> = None;
    for stage in tokens.split(|t| *t == Token::Pipe) {
        let mut args = Vec::new();
        let mut function = None;
        for token in stage {
            match token {
                Token::Str(s) => args.push(s.clone()),
                Token::Env(name) => args.push(env(name).unwrap_or_default()),
                Token::Ident(name) if function.is_none() && args.is_empty() => function = Some(name.as_str()),
                Token::Ident(name) => {
                    return Err(Error::InvalidOption(format!("unexpected {name:?} in template")))
                }
                Token::Pipe => {}
            }
        }
        if let Some(previous) = value.take() {
            args.push(previous);
        }
        value = Some(match function {
            Some(name) => apply_function(name, &args)?,
            None => args.concat(),
        });
    }
    Ok(value.unwrap_or_default())
}

/// Expand `{{ ... }}` actions against `env`.
pub fn template<F>(source: &str, env: F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| Error::InvalidOption("unclosed {{ in template".into()))?;
        out.push_str(&evaluate(after[..close].trim(), &env)?);
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    Ok(out.trim_end_matches('\n').to_string())
}

// --- emoji ------------------------------------------------------------------

const EMOJI: &[(&str, &str)] = &[
    ("+1", "👍"),
    ("-1", "👎"),
    ("beer", "🍺"),
    ("bug", "🐛"),
    ("check", "✔️"),
    ("coffee", "☕"),
    ("construction", "🚧"),
    ("fire", "🔥"),
    ("heart", "❤️"),
    ("hourglass", "⌛"),
    ("laughing", "😆"),
    ("lock", "🔒"),
    ("memo", "📝"),
    ("package", "📦"),
    ("rocket", "🚀"),
    ("smile", "😄"),
    ("sparkles", "✨"),
    ("star", "⭐"),
    ("tada", "🎉"),
    ("thinking", "🤔"),
    ("warning", "⚠️"),
    ("wave", "👋"),
    ("white_check_mark", "✅"),
    ("x", "❌"),
    ("zap", "⚡"),
];

/// Replace known `:shortcode:`s, leaving unknown ones as typed.
pub fn emoji(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find(':') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let code = after.find(':').map(|close| &after[..close]).and_then(|name| {
            EMOJI
                .iter()
                .find(|(code, _)| *code == name)
                .map(|(_, glyph)| (name.len(), *glyph))
        });
        match code {
            Some((len, glyph)) => {
                out.push_str(glyph);
                rest = &after[len + 1..];
            }
            None => {
                out.push(':');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.trim_end_matches('\n').to_string()
}
