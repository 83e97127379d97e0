//! Markdown to SGR-styled terminal text.
//!
//! Parsing is done by `pulldown-cmark`; fenced code blocks are coloured with
//! `syntect`. Output is plain text with SGR escapes and `\n` line breaks,
//! word-wrapped to the requested width.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::error::{AppError, Result};

/// Default syntect theme for code blocks.
pub const DEFAULT_CODE_THEME: &str = "base16-ocean.dark";

const RESET: &str = "\x1b[0m";
const STYLE_H1: &str = "1;35";
const STYLE_H2: &str = "1;34";
const STYLE_HEADING: &str = "1;36";
const STYLE_EMPHASIS: &str = "3";
const STYLE_STRONG: &str = "1";
const STYLE_STRIKE: &str = "9";
const STYLE_CODE: &str = "33";
const STYLE_LINK: &str = "4;34";
const STYLE_MUTED: &str = "2";

/// Turns raw document text into styled text at a given wrap width.
pub trait Renderer: Send {
    fn render(&self, raw: &str, width: usize) -> Result<String>;
}

/// Renderer for CommonMark plus the usual GitHub extensions.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl MarkdownRenderer {
    /// Build a renderer using the named syntect theme, falling back to
    /// [`DEFAULT_CODE_THEME`] when the name is unknown.
    pub fn new(code_theme: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(code_theme) {
            Some(theme) => theme,
            None => {
                warn!(theme = code_theme, "unknown code theme, using default");
                themes.remove(DEFAULT_CODE_THEME).unwrap_or_default()
            }
        };
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    fn highlight_code(&self, lang: &str, code: &str) -> Result<Vec<String>> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut out = Vec::new();
        for line in LinesWithEndings::from(code) {
            let ranges = highlighter
                .highlight_line(line, &self.syntax_set)
                .map_err(|e| AppError::Render(e.to_string()))?;
            let escaped = as_24_bit_terminal_escaped(&ranges, false);
            out.push(format!("{}{RESET}", escaped.trim_end_matches(['\n', '\r'])));
        }
        Ok(out)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_THEME)
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, raw: &str, width: usize) -> Result<String> {
        let mut writer = Writer::new(self, width.max(1));
        for event in Parser::new_ext(raw, Options::all()) {
            writer.event(event)?;
        }
        Ok(writer.finish())
    }
}

/// A run of text sharing one SGR style.
#[derive(Debug, Clone)]
struct Piece {
    text: String,
    style: String,
}

#[derive(Debug, Clone)]
enum Token {
    Word(Vec<Piece>),
    Break,
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

struct Writer<'r> {
    renderer: &'r MarkdownRenderer,
    width: usize,
    lines: Vec<String>,
    tokens: Vec<Token>,
    word: Vec<Piece>,
    styles: Vec<&'static str>,
    quote_depth: usize,
    lists: Vec<ListKind>,
    /// Marker for the first line of the current list item.
    item_marker: Option<String>,
    code: Option<(String, String)>,
    links: Vec<String>,
    table_row: Vec<String>,
    cell: Option<String>,
    in_table_head: bool,
}

impl<'r> Writer<'r> {
    fn new(renderer: &'r MarkdownRenderer, width: usize) -> Self {
        Self {
            renderer,
            width,
            lines: Vec::new(),
            tokens: Vec::new(),
            word: Vec::new(),
            styles: Vec::new(),
            quote_depth: 0,
            lists: Vec::new(),
            item_marker: None,
            code: None,
            links: Vec::new(),
            table_row: Vec::new(),
            cell: None,
            in_table_head: false,
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        if let Some((_, buf)) = self.code.as_mut() {
            match event {
                Event::Text(text) => buf.push_str(&text),
                Event::End(TagEnd::CodeBlock) => self.end_code_block()?,
                _ => {}
            }
            return Ok(());
        }
        if let Some(cell) = self.cell.as_mut() {
            match event {
                Event::Text(text) | Event::Code(text) => {
                    cell.push_str(&text);
                    return Ok(());
                }
                Event::End(TagEnd::TableCell) => {}
                _ => return Ok(()),
            }
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(text) => {
                self.styles.push(STYLE_CODE);
                self.text(&text);
                self.styles.pop();
            }
            Event::InlineMath(text) | Event::DisplayMath(text) => self.text(&text),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.styles.push(STYLE_MUTED);
                self.text(&html);
                self.styles.pop();
            }
            Event::SoftBreak => self.break_word(),
            Event::HardBreak => {
                self.break_word();
                self.tokens.push(Token::Break);
            }
            Event::Rule => {
                self.flush_block();
                let rule = "─".repeat(self.width.min(60));
                self.lines.push(format!("\x1b[{STYLE_MUTED}m{rule}{RESET}"));
                self.blank();
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(name) => self.text(&format!("[^{name}]")),
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_block();
                let (marks, style) = match level {
                    HeadingLevel::H1 => (1, STYLE_H1),
                    HeadingLevel::H2 => (2, STYLE_H2),
                    HeadingLevel::H3 => (3, STYLE_HEADING),
                    HeadingLevel::H4 => (4, STYLE_HEADING),
                    HeadingLevel::H5 => (5, STYLE_HEADING),
                    HeadingLevel::H6 => (6, STYLE_HEADING),
                };
                self.styles.push(style);
                self.text(&"#".repeat(marks));
                self.break_word();
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                self.flush_block();
                self.lists.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Bullet,
                });
            }
            Tag::Item => {
                self.flush_block();
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::CodeBlock(kind) => {
                self.flush_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::Emphasis => self.styles.push(STYLE_EMPHASIS),
            Tag::Strong => self.styles.push(STYLE_STRONG),
            Tag::Strikethrough => self.styles.push(STYLE_STRIKE),
            Tag::Link { dest_url, .. } => {
                self.styles.push(STYLE_LINK);
                self.links.push(dest_url.to_string());
            }
            Tag::Image { .. } => {
                self.styles.push(STYLE_MUTED);
                self.text("[image: ");
            }
            Tag::Table(_) => self.flush_block(),
            Tag::TableHead => self.in_table_head = true,
            Tag::TableCell => self.cell = Some(String::new()),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_block();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush_block();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush_block();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush_block(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.links.pop() {
                    let shown: String = self
                        .word
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect();
                    if !url.is_empty() && shown != url {
                        self.break_word();
                        self.styles.push(STYLE_MUTED);
                        self.text(&format!("({url})"));
                        self.styles.pop();
                    }
                }
            }
            TagEnd::Image => {
                self.text("]");
                self.styles.pop();
            }
            TagEnd::TableCell => {
                if let Some(cell) = self.cell.take() {
                    self.table_row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                self.end_table_row();
                self.in_table_head = false;
            }
            TagEnd::TableRow => self.end_table_row(),
            TagEnd::Table => self.blank(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let style = self.styles.join(";");
        for c in text.chars() {
            if c.is_whitespace() {
                self.break_word();
                continue;
            }
            match self.word.last_mut() {
                Some(piece) if piece.style == style => piece.text.push(c),
                _ => self.word.push(Piece {
                    text: c.to_string(),
                    style: style.clone(),
                }),
            }
        }
    }

    fn break_word(&mut self) {
        if !self.word.is_empty() {
            let word = std::mem::take(&mut self.word);
            self.tokens.push(Token::Word(word));
        }
    }

    fn quote_prefix(&self) -> String {
        if self.quote_depth == 0 {
            return String::new();
        }
        format!("\x1b[{STYLE_MUTED}m{}{RESET}", "│ ".repeat(self.quote_depth))
    }

    /// Visible indentation before list content, excluding the item marker.
    fn list_indent(&self) -> usize {
        self.lists.len().saturating_sub(1) * 2
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.is_empty()) || self.lines.is_empty() {
            return;
        }
        self.lines.push(String::new());
    }

    /// Word-wrap the pending tokens into output lines.
    fn flush_block(&mut self) {
        self.break_word();
        if self.tokens.is_empty() {
            return;
        }
        let tokens = std::mem::take(&mut self.tokens);

        let quote = self.quote_prefix();
        let quote_width = self.quote_depth * 2;
        let indent = " ".repeat(self.list_indent());
        let marker = self.item_marker.take();
        let marker_width = if self.lists.is_empty() { 0 } else { 2 };
        let first_prefix = match &marker {
            Some(m) => format!("{quote}{indent}{m}"),
            None if marker_width > 0 => format!("{quote}{indent}  "),
            None => format!("{quote}{indent}"),
        };
        let hang = marker.as_ref().map_or(marker_width, |m| m.width());
        let rest_prefix = format!("{quote}{indent}{}", " ".repeat(hang));
        let available = self
            .width
            .saturating_sub(quote_width + indent.len() + hang)
            .max(1);

        let mut line = first_prefix;
        let mut used = 0;
        for token in tokens {
            match token {
                Token::Break => {
                    self.lines.push(std::mem::replace(&mut line, rest_prefix.clone()));
                    used = 0;
                }
                Token::Word(pieces) => {
                    let word_width: usize = pieces.iter().map(|p| p.text.width()).sum();
                    if used > 0 && used + 1 + word_width > available {
                        self.lines.push(std::mem::replace(&mut line, rest_prefix.clone()));
                        used = 0;
                    }
                    if used > 0 {
                        line.push(' ');
                        used += 1;
                    }
                    for piece in pieces {
                        if piece.style.is_empty() {
                            line.push_str(&piece.text);
                        } else {
                            line.push_str(&format!("\x1b[{}m{}{RESET}", piece.style, piece.text));
                        }
                    }
                    used += word_width;
                }
            }
        }
        self.lines.push(line);
    }

    fn end_code_block(&mut self) -> Result<()> {
        let Some((lang, code)) = self.code.take() else {
            return Ok(());
        };
        let quote = self.quote_prefix();
        let indent = " ".repeat(self.list_indent() + 2);
        for line in self.renderer.highlight_code(&lang, &code)? {
            self.lines.push(format!("{quote}{indent}{line}"));
        }
        self.blank();
        Ok(())
    }

    fn end_table_row(&mut self) {
        let cells = std::mem::take(&mut self.table_row);
        if cells.is_empty() {
            return;
        }
        let sep = format!(" \x1b[{STYLE_MUTED}m│{RESET} ");
        let row = if self.in_table_head {
            cells
                .iter()
                .map(|c| format!("\x1b[{STYLE_STRONG}m{c}{RESET}"))
                .collect::<Vec<_>>()
                .join(&sep)
        } else {
            cells.join(&sep)
        };
        self.lines.push(format!("{}{row}", self.quote_prefix()));
    }

    fn finish(mut self) -> String {
        self.flush_block();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.lines.join("\n")
    }
}
