//! SGR-styled text handling.
//!
//! Uses the `vte` crate to walk styled text produced by the renderer. Two
//! consumers share the same parser: conversion into ratatui [`Line`]s for
//! drawing, and stripping into visible text with a per-character byte offset
//! table for the search highlighter.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Current SGR attributes while walking a styled string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SgrState {
    fg: Option<Color>,
    bg: Option<Color>,
    modifiers: Modifier,
}

impl SgrState {
    fn style(&self) -> Style {
        let mut style = Style::default().add_modifier(self.modifiers);
        if let Some(fg) = self.fg {
            style = style.fg(fg);
        }
        if let Some(bg) = self.bg {
            style = style.bg(bg);
        }
        style
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn apply(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.reset(),
                1 => self.modifiers |= Modifier::BOLD,
                2 => self.modifiers |= Modifier::DIM,
                3 => self.modifiers |= Modifier::ITALIC,
                4 => self.modifiers |= Modifier::UNDERLINED,
                5 => self.modifiers |= Modifier::SLOW_BLINK,
                7 => self.modifiers |= Modifier::REVERSED,
                8 => self.modifiers |= Modifier::HIDDEN,
                9 => self.modifiers |= Modifier::CROSSED_OUT,
                21 | 22 => self.modifiers -= Modifier::BOLD | Modifier::DIM,
                23 => self.modifiers -= Modifier::ITALIC,
                24 => self.modifiers -= Modifier::UNDERLINED,
                25 => self.modifiers -= Modifier::SLOW_BLINK,
                27 => self.modifiers -= Modifier::REVERSED,
                28 => self.modifiers -= Modifier::HIDDEN,
                29 => self.modifiers -= Modifier::CROSSED_OUT,
                n @ 30..=37 => self.fg = Some(base_color(n - 30)),
                38 => {
                    if let Some((color, used)) = extended_color(&params[i + 1..]) {
                        self.fg = Some(color);
                        i += used;
                    }
                }
                39 => self.fg = None,
                n @ 40..=47 => self.bg = Some(base_color(n - 40)),
                48 => {
                    if let Some((color, used)) = extended_color(&params[i + 1..]) {
                        self.bg = Some(color);
                        i += used;
                    }
                }
                49 => self.bg = None,
                n @ 90..=97 => self.fg = Some(bright_color(n - 90)),
                n @ 100..=107 => self.bg = Some(bright_color(n - 100)),
                _ => {}
            }
            i += 1;
        }
    }
}

fn base_color(n: u16) -> Color {
    match n {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::White,
    }
}

fn bright_color(n: u16) -> Color {
    match n {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::Gray,
    }
}

/// Parse `5;N` or `2;R;G;B` following a 38/48 code. Returns the color and
/// how many parameters it consumed.
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    match rest {
        [5, n, ..] => Some((Color::Indexed(*n as u8), 2)),
        [2, r, g, b, ..] => Some((Color::Rgb(*r as u8, *g as u8, *b as u8), 4)),
        _ => None,
    }
}

fn flatten_params(params: &vte::Params) -> Vec<u16> {
    params
        .iter()
        .flat_map(|sub| sub.iter().copied())
        .collect()
}

/// Builds styled lines from vte callbacks.
struct LineBuilder {
    state: SgrState,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    run: String,
    run_style: Style,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            state: SgrState::default(),
            lines: Vec::new(),
            spans: Vec::new(),
            run: String::new(),
            run_style: Style::default(),
        }
    }

    fn flush_run(&mut self) {
        if !self.run.is_empty() {
            let text = std::mem::take(&mut self.run);
            self.spans.push(Span::styled(text, self.run_style));
        }
    }

    fn push_char(&mut self, c: char) {
        let style = self.state.style();
        if style != self.run_style {
            self.flush_run();
            self.run_style = style;
        }
        self.run.push(c);
    }

    fn end_line(&mut self) {
        self.flush_run();
        let spans = std::mem::take(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.run.is_empty() || !self.spans.is_empty() {
            self.end_line();
        }
        self.lines
    }
}

impl vte::Perform for LineBuilder {
    fn print(&mut self, c: char) {
        self.push_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.end_line(),
            b'\t' => {
                for _ in 0..4 {
                    self.push_char(' ');
                }
            }
            _ => {}
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &vte::Params,
        _intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        if action == 'm' {
            self.state.apply(&flatten_params(params));
        }
    }
}

/// Convert styled text into ratatui lines, one per `\n`-separated line.
///
/// A trailing newline does not produce an extra empty line. Control
/// sequences other than SGR are dropped.
pub fn to_lines(styled: &str) -> Vec<Line<'static>> {
    let mut parser = vte::Parser::new();
    let mut builder = LineBuilder::new();
    for &byte in styled.as_bytes() {
        parser.advance(&mut builder, byte);
    }
    builder.finish()
}

/// Visible text with the byte offset of each character in the styled source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub chars: Vec<char>,
    pub offsets: Vec<usize>,
}

#[cfg(test)]
impl Stripped {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }
}

struct StripPerformer {
    position: usize,
    out: Stripped,
}

impl vte::Perform for StripPerformer {
    fn print(&mut self, c: char) {
        // Called on the final byte of the character.
        let start = (self.position + 1).saturating_sub(c.len_utf8());
        self.out.chars.push(c);
        self.out.offsets.push(start);
    }

    fn execute(&mut self, byte: u8) {
        if byte == b'\n' || byte == b'\t' {
            self.out.chars.push(byte as char);
            self.out.offsets.push(self.position);
        }
    }
}

/// Remove every control sequence from `styled`, keeping newlines and tabs.
pub fn strip(styled: &str) -> Stripped {
    let mut parser = vte::Parser::new();
    let mut performer = StripPerformer {
        position: 0,
        out: Stripped::default(),
    };
    for (idx, &byte) in styled.as_bytes().iter().enumerate() {
        performer.position = idx;
        parser.advance(&mut performer, byte);
    }
    performer.out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn plain_text_splits_on_newlines() {
        let lines = to_lines("one\ntwo\n\nfour\n");
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["one", "two", "", "four"]);
    }

    #[test]
    fn sgr_codes_become_styles() {
        let lines = to_lines("plain \x1b[1;31mbold red\x1b[0m done");
        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].content, "plain ");
        assert_eq!(spans[1].content, "bold red");
        assert_eq!(spans[1].style.fg, Some(Color::Red));
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].style, Style::default());
    }

    #[test]
    fn truecolor_and_indexed_colors() {
        let lines = to_lines("\x1b[38;2;10;20;30mrgb\x1b[48;5;236mboth");
        let spans = &lines[0].spans;
        assert_eq!(spans[0].style.fg, Some(Color::Rgb(10, 20, 30)));
        assert_eq!(spans[1].style.bg, Some(Color::Indexed(236)));
        assert_eq!(spans[1].style.fg, Some(Color::Rgb(10, 20, 30)));
    }

    #[test]
    fn style_carries_across_lines() {
        let lines = to_lines("\x1b[3mfirst\nsecond\x1b[23m");
        assert!(lines[1].spans[0]
            .style
            .add_modifier
            .contains(Modifier::ITALIC));
    }

    #[test]
    fn reverse_video_toggles() {
        let lines = to_lines("a\x1b[7mb\x1b[27mc");
        let spans = &lines[0].spans;
        assert!(spans[1].style.add_modifier.contains(Modifier::REVERSED));
        assert!(!spans[2].style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn strip_records_source_offsets() {
        let styled = "\x1b[1mab\x1b[0m c";
        let stripped = strip(styled);
        assert_eq!(stripped.text(), "ab c");
        assert_eq!(stripped.offsets, vec![4, 5, 10, 11]);
    }

    #[test]
    fn strip_handles_multibyte_characters() {
        let styled = "\x1b[32mé→x\x1b[0m";
        let stripped = strip(styled);
        assert_eq!(stripped.text(), "é→x");
        assert_eq!(stripped.offsets, vec![5, 7, 10]);
        assert_eq!(&styled[stripped.offsets[1]..stripped.offsets[2]], "→");
    }

    #[test]
    fn strip_keeps_newlines() {
        let stripped = strip("a\nb");
        assert_eq!(stripped.text(), "a\nb");
        assert_eq!(stripped.offsets, vec![0, 1, 2]);
    }
}
