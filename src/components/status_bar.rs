use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::theme::ThemeColors;

/// Cut `text` to at most `max` columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Status line: active prompt or search, loading state, last error and the
/// watched file.
pub struct StatusBarWidget<'a> {
    theme: &'a ThemeColors,
    prompt: Option<(&'a str, &'a str)>,
    search: Option<(&'a str, Option<(usize, usize)>)>,
    loading: bool,
    error: Option<&'a str>,
    watching: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(theme: &'a ThemeColors) -> Self {
        Self {
            theme,
            prompt: None,
            search: None,
            loading: false,
            error: None,
            watching: None,
        }
    }

    /// Text being typed, shown as `label` followed by the input and a cursor.
    pub fn prompt(mut self, label: &'a str, input: &'a str) -> Self {
        self.prompt = Some((label, input));
        self
    }

    /// A committed search with its `current/total` counter.
    pub fn search(mut self, query: &'a str, counter: Option<(usize, usize)>) -> Self {
        self.search = Some((query, counter));
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    pub fn watching(mut self, name: Option<&'a str>) -> Self {
        self.watching = name;
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;
        let base = Style::default().bg(self.theme.status_bg).fg(self.theme.status_fg);
        let key_style = base
            .fg(self.theme.status_key_fg)
            .add_modifier(Modifier::BOLD);

        let mut spans: Vec<Span> = vec![Span::styled(" ", base)];
        if let Some((label, input)) = self.prompt {
            spans.push(Span::styled(label.to_string(), key_style));
            spans.push(Span::styled(format!("{input}_"), base));
        } else if let Some((query, counter)) = self.search {
            spans.push(Span::styled("Search: ", key_style));
            spans.push(Span::styled(query.to_string(), base));
            let counter = match counter {
                Some((current, total)) => format!(" [{current}/{total}]"),
                None => " [no matches]".to_string(),
            };
            spans.push(Span::styled(counter, base.fg(self.theme.muted_fg)));
        }
        if self.loading {
            spans.push(Span::styled(" Loading…", base.fg(self.theme.accent_fg)));
        }

        let right = self
            .watching
            .map(|name| format!("● {name} "))
            .unwrap_or_default();
        let right_width = right.width();

        if let Some(error) = self.error {
            let used: usize = spans.iter().map(|s| s.width()).sum();
            let budget = width.saturating_sub(used + right_width + 3);
            if budget > 0 {
                spans.push(Span::styled(
                    format!(" ✗ {}", truncate_to_width(error, budget)),
                    base.fg(self.theme.error_fg),
                ));
            }
        }

        let used: usize = spans.iter().map(|s| s.width()).sum();
        let pad = width.saturating_sub(used + right_width);
        spans.push(Span::styled(" ".repeat(pad), base));
        if used + right_width <= width {
            spans.push(Span::styled(right, base.fg(self.theme.accent_fg)));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

/// Which key hints to show under the panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintSet {
    Tree,
    Preview,
    Filter,
    SearchInput,
}

impl HintSet {
    fn hints(self) -> &'static [(&'static str, &'static str)] {
        match self {
            HintSet::Tree => &[
                ("↑↓", "navigate"),
                ("⏎", "open"),
                ("/", "filter"),
                ("Tab", "switch"),
                ("?", "help"),
                ("q", "quit"),
            ],
            HintSet::Preview => &[
                ("↑↓", "scroll"),
                ("/", "search"),
                ("n/N", "match"),
                ("f", "fullscreen"),
                ("Tab", "switch"),
                ("q", "quit"),
            ],
            HintSet::Filter => &[("⏎", "accept"), ("Esc", "clear"), ("↑↓", "move")],
            HintSet::SearchInput => &[("⏎", "search"), ("Esc", "cancel")],
        }
    }
}

/// One line of `key description` pairs.
pub struct HintsWidget<'a> {
    set: HintSet,
    theme: &'a ThemeColors,
}

impl<'a> HintsWidget<'a> {
    pub fn new(set: HintSet, theme: &'a ThemeColors) -> Self {
        Self { set, theme }
    }
}

impl<'a> Widget for HintsWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let key_style = Style::default().fg(self.theme.status_key_fg);
        let desc_style = Style::default().fg(self.theme.muted_fg);
        let sep_style = Style::default().fg(self.theme.subtle_fg);

        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in self.set.hints().iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  │  ", sep_style));
            }
            spans.push(Span::styled(*key, key_style));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(*desc, desc_style));
        }
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn render_line(widget: impl Widget, width: u16) -> (Buffer, String) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (buf, content)
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn prompt_shows_input_with_cursor() {
        let tc = theme::dark_theme();
        let (_, content) = render_line(StatusBarWidget::new(&tc).prompt("Filter: ", "gui"), 40);
        assert!(content.contains("Filter: gui_"));
    }

    #[test]
    fn search_shows_counter() {
        let tc = theme::dark_theme();
        let (_, content) =
            render_line(StatusBarWidget::new(&tc).search("hello", Some((2, 5))), 40);
        assert!(content.contains("Search: hello [2/5]"));
        let (_, content) = render_line(StatusBarWidget::new(&tc).search("zzz", None), 40);
        assert!(content.contains("[no matches]"));
    }

    #[test]
    fn error_is_truncated_and_colored() {
        let tc = theme::dark_theme();
        let long = "permission denied while reading a very long path name";
        let (buf, content) = render_line(StatusBarWidget::new(&tc).error(Some(long)), 30);
        assert!(content.contains("✗ permission"));
        assert!(content.contains('…'));
        assert!(!content.contains("name"));
        assert_eq!(buf.cell((3, 0)).unwrap().fg, tc.error_fg);
    }

    #[test]
    fn watched_file_is_right_aligned() {
        let tc = theme::dark_theme();
        let (_, content) = render_line(
            StatusBarWidget::new(&tc).loading(true).watching(Some("README.md")),
            50,
        );
        assert!(content.contains("Loading…"));
        assert!(content.trim_end().ends_with("● README.md"));
    }

    #[test]
    fn hints_follow_the_mode() {
        let tc = theme::dark_theme();
        let (_, tree) = render_line(HintsWidget::new(HintSet::Tree, &tc), 80);
        assert!(tree.contains("⏎ open"));
        assert!(tree.contains("Tab switch"));
        let (_, search) = render_line(HintsWidget::new(HintSet::SearchInput, &tc), 80);
        assert!(search.contains("Esc cancel"));
        assert!(!search.contains("filter"));
    }

    #[test]
    fn zero_area_does_not_panic() {
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::new(&tc).render(area, &mut buf);
        HintsWidget::new(HintSet::Tree, &tc).render(area, &mut buf);
    }
}
