//! In-document search: raw line matching, match cycling, and highlight
//! splicing over styled text.

use super::ansi;

/// Inserted before each visible match (reverse video on).
pub const HIGHLIGHT_START: &str = "\x1b[7m";
/// Inserted after each visible match (reverse video off).
pub const HIGHLIGHT_END: &str = "\x1b[27m";

/// Committed search query and the raw source lines it matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    match_lines: Vec<usize>,
    current: usize,
}

impl SearchState {
    /// Scan `raw` line by line for `query`, case-insensitively.
    pub fn new(query: &str, raw: &str) -> Self {
        Self {
            query: query.to_string(),
            match_lines: match_lines(raw, query),
            current: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn match_lines(&self) -> &[usize] {
        &self.match_lines
    }

    pub fn has_matches(&self) -> bool {
        !self.match_lines.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Raw line of the current match.
    pub fn current_line(&self) -> Option<usize> {
        self.match_lines.get(self.current).copied()
    }

    /// Advance to the next match, wrapping at the end.
    pub fn next(&mut self) -> Option<usize> {
        if self.match_lines.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.match_lines.len();
        self.current_line()
    }

    /// Step back to the previous match, wrapping at the start.
    pub fn previous(&mut self) -> Option<usize> {
        if self.match_lines.is_empty() {
            return None;
        }
        let len = self.match_lines.len();
        self.current = (self.current + len - 1) % len;
        self.current_line()
    }

    /// `(current, total)` with a 1-based current index, for the status line.
    pub fn counter(&self) -> Option<(usize, usize)> {
        self.has_matches()
            .then(|| (self.current + 1, self.match_lines.len()))
    }
}

/// Single-char lowercase of `c`. Chars whose lowercase form expands to
/// several chars are compared as they are.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Non-overlapping case-insensitive matches of `needle` in `haystack`, as
/// half-open character index ranges.
pub fn find_ranges(haystack: &[char], needle: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    let folded: Vec<char> = haystack.iter().copied().map(fold).collect();

    let mut ranges = Vec::new();
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        if folded[i..i + needle.len()] == needle[..] {
            ranges.push((i, i + needle.len()));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    ranges
}

/// Indices of the lines of `raw` containing `query`, case-insensitively.
pub fn match_lines(raw: &str, query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let chars: Vec<char> = line.chars().collect();
            !find_ranges(&chars, query).is_empty()
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Wrap every visible occurrence of `query` in `styled` with reverse-video
/// markers. Control sequences are never split and the rest of the text is
/// left byte-for-byte intact.
pub fn highlight(styled: &str, query: &str) -> String {
    let stripped = ansi::strip(styled);
    let ranges = find_ranges(&stripped.chars, query);
    if ranges.is_empty() {
        return styled.to_string();
    }

    let mut out = String::with_capacity(
        styled.len() + ranges.len() * (HIGHLIGHT_START.len() + HIGHLIGHT_END.len()),
    );
    let mut cursor = 0;
    for (start, end) in ranges {
        let from = stripped.offsets[start];
        out.push_str(&styled[cursor..from]);
        out.push_str(HIGHLIGHT_START);
        let mut pos = from;
        for k in start..end {
            let at = stripped.offsets[k];
            if at != pos {
                // Re-assert after a sequence inside the match.
                out.push_str(&styled[pos..at]);
                out.push_str(HIGHLIGHT_START);
            }
            pos = at + stripped.chars[k].len_utf8();
            out.push_str(&styled[at..pos]);
        }
        out.push_str(HIGHLIGHT_END);
        cursor = pos;
    }
    out.push_str(&styled[cursor..]);
    out
}

/// Estimate the rendered line for raw line `line` and return the scroll
/// offset that puts it mid-screen.
pub fn scroll_target(
    line: usize,
    raw_total: usize,
    rendered_total: usize,
    visible_height: usize,
) -> usize {
    if raw_total == 0 {
        return 0;
    }
    let ratio = line as f64 / raw_total as f64;
    let target = (ratio * rendered_total as f64).round() as usize;
    target.saturating_sub(visible_height / 2)
}
