//! Scrollable preview of one rendered document, with in-document search.

use std::path::{Path, PathBuf};

use ratatui::text::Line;
use tracing::{debug, warn};

use super::ansi;
use super::markdown::Renderer;
use super::search::{self, SearchState};
use crate::error::Result;

const WELCOME: &str = "\
# Welcome to mdview

Select a Markdown file from the left panel to preview it here.

## Quick Start

- Use **j/k** or the **arrow keys** to navigate
- Press **Enter** to open a file
- Press **Tab** to switch panels
- Press **/** to filter files or search the preview
- Press **f** for fullscreen
- Press **?** for help, **q** to quit
";

/// Preview state: the loaded document in raw and styled form, the lines
/// currently drawn, the scroll position and any active search.
pub struct Viewport {
    renderer: Box<dyn Renderer>,
    path: Option<PathBuf>,
    raw_content: String,
    styled_content: String,
    highlighted_content: Option<String>,
    lines: Vec<Line<'static>>,
    error: Option<String>,
    scroll_offset: usize,
    width: usize,
    visible_height: usize,
    search: Option<SearchState>,
    search_input: Option<String>,
}

impl Viewport {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        let mut viewport = Self {
            renderer,
            path: None,
            raw_content: String::new(),
            styled_content: String::new(),
            highlighted_content: None,
            lines: Vec::new(),
            error: None,
            scroll_offset: 0,
            width: 80,
            visible_height: 20,
            search: None,
            search_input: None,
        };
        viewport.render_welcome();
        viewport
    }

    /// Path of the document being shown (also set when it failed to load).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn has_document(&self) -> bool {
        self.path.is_some() && self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Show a newly loaded document from the top with no search.
    ///
    /// If rendering fails the error panel is shown instead and the error is
    /// returned.
    pub fn set_content(&mut self, path: &Path, raw: String) -> Result<()> {
        self.path = Some(path.to_path_buf());
        self.raw_content = raw;
        self.error = None;
        self.search = None;
        self.search_input = None;
        self.highlighted_content = None;
        self.scroll_offset = 0;
        if let Err(e) = self.render() {
            self.set_error(path, &e.to_string());
            return Err(e);
        }
        debug!(path = %path.display(), lines = self.lines.len(), "preview updated");
        Ok(())
    }

    /// Replace the content with an error panel.
    pub fn set_error(&mut self, path: &Path, message: &str) {
        self.path = Some(path.to_path_buf());
        self.raw_content.clear();
        self.search = None;
        self.search_input = None;
        self.highlighted_content = None;
        self.scroll_offset = 0;
        self.error = Some(message.to_string());
        self.styled_content = format!(
            "\x1b[1;31m  Error loading file:\x1b[0m\n\n\x1b[31m  {message}\x1b[0m"
        );
        self.lines = ansi::to_lines(&self.styled_content);
    }

    /// Re-wrap for a new panel size, keeping the scroll position in range and
    /// any search highlight applied.
    pub fn resize(&mut self, width: usize, height: usize) {
        let rewrap = width != self.width;
        self.width = width;
        self.visible_height = height;
        if rewrap {
            if self.has_document() {
                if let Err(e) = self.render() {
                    warn!(error = %e, "re-render after resize failed");
                }
            } else if self.path.is_none() {
                self.render_welcome();
            }
        }
        self.clamp_scroll();
    }

    fn wrap_width(&self) -> usize {
        self.width.saturating_sub(2).max(1)
    }

    fn render(&mut self) -> Result<()> {
        self.styled_content = self
            .renderer
            .render(&self.raw_content, self.wrap_width())?;
        self.apply_highlight();
        Ok(())
    }

    fn render_welcome(&mut self) {
        match self.renderer.render(WELCOME, self.wrap_width()) {
            Ok(styled) => {
                self.styled_content = styled;
                self.lines = ansi::to_lines(&self.styled_content);
            }
            Err(e) => warn!(error = %e, "welcome screen failed to render"),
        }
    }

    fn apply_highlight(&mut self) {
        self.highlighted_content = self
            .search
            .as_ref()
            .filter(|s| s.has_matches())
            .map(|s| search::highlight(&self.styled_content, s.query()));
        let shown = self
            .highlighted_content
            .as_deref()
            .unwrap_or(&self.styled_content);
        self.lines = ansi::to_lines(shown);
        self.clamp_scroll();
    }

    // --- Scrolling ---

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn visible_height(&self) -> usize {
        self.visible_height
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.visible_height)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_offset());
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = (self.scroll_offset + n).min(self.max_offset());
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.visible_height / 2).max(1));
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.visible_height / 2).max(1));
    }

    pub fn goto_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn goto_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
    }

    /// Scroll position as a percentage of the scrollable range.
    pub fn scroll_percent(&self) -> u16 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        ((self.scroll_offset * 100) / max) as u16
    }

    /// The lines that fit in the panel at the current offset.
    pub fn visible_lines(&self) -> &[Line<'static>] {
        let start = self.scroll_offset.min(self.lines.len());
        let end = (start + self.visible_height).min(self.lines.len());
        &self.lines[start..end]
    }

    // --- Search ---

    /// Start typing a query. Existing matches stay in place until commit.
    pub fn begin_search(&mut self) {
        if self.has_document() {
            self.search_input = Some(String::new());
        }
    }

    pub fn is_search_input(&self) -> bool {
        self.search_input.is_some()
    }

    pub fn search_input(&self) -> Option<&str> {
        self.search_input.as_deref()
    }

    pub fn push_search_char(&mut self, c: char) {
        if let Some(input) = self.search_input.as_mut() {
            input.push(c);
        }
    }

    pub fn pop_search_char(&mut self) {
        if let Some(input) = self.search_input.as_mut() {
            input.pop();
        }
    }

    /// Run the typed query. An empty query leaves the previous search as is.
    pub fn commit_search(&mut self) {
        if let Some(query) = self.search_input.take() {
            if !query.is_empty() {
                self.search(&query);
            }
        }
    }

    /// Abandon the typed query, keeping whatever search was active before.
    pub fn cancel_search(&mut self) {
        self.search_input = None;
    }

    /// Search the raw document and highlight matches in the styled text,
    /// scrolling to the first match.
    pub fn search(&mut self, query: &str) {
        let state = SearchState::new(query, &self.raw_content);
        debug!(query, matches = state.match_lines().len(), "search");
        let first = state.current_line();
        self.search = Some(state);
        self.apply_highlight();
        if let Some(line) = first {
            self.scroll_to_raw_line(line);
        }
    }

    pub fn next_match(&mut self) {
        if let Some(line) = self.search.as_mut().and_then(SearchState::next) {
            self.scroll_to_raw_line(line);
        }
    }

    pub fn previous_match(&mut self) {
        if let Some(line) = self.search.as_mut().and_then(SearchState::previous) {
            self.scroll_to_raw_line(line);
        }
    }

    pub fn clear_search(&mut self) {
        self.search = None;
        self.apply_highlight();
    }

    /// Whether a committed search is in effect.
    pub fn has_active_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn search_state(&self) -> Option<&SearchState> {
        self.search.as_ref()
    }

    fn scroll_to_raw_line(&mut self, line: usize) {
        let raw_total = self.raw_content.lines().count();
        self.scroll_offset =
            search::scroll_target(line, raw_total, self.lines.len(), self.visible_height);
        self.clamp_scroll();
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("path", &self.path)
            .field("lines", &self.lines.len())
            .field("scroll_offset", &self.scroll_offset)
            .field("error", &self.error)
            .field("search", &self.search)
            .finish()
    }
}

/// Renders each raw line verbatim. Used where Markdown styling is beside the
/// point.
#[cfg(test)]
pub(crate) struct PlainRenderer;

#[cfg(test)]
impl Renderer for PlainRenderer {
    fn render(&self, raw: &str, _width: usize) -> Result<String> {
        Ok(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, raw: &str, _width: usize) -> Result<String> {
            if raw.contains("boom") {
                Err(AppError::Render("boom".into()))
            } else {
                Ok(raw.to_string())
            }
        }
    }

    fn viewport(height: usize) -> Viewport {
        let mut vp = Viewport::new(Box::new(PlainRenderer));
        vp.resize(40, height);
        vp
    }

    fn numbered(n: usize) -> String {
        (0..n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn starts_with_welcome_screen() {
        let vp = viewport(10);
        assert!(!vp.has_document());
        assert!(line_text(&vp.visible_lines()[0]).contains("Welcome to mdview"));
    }

    #[test]
    fn set_content_resets_scroll_and_search() {
        let mut vp = viewport(5);
        vp.set_content(Path::new("/d/a.md"), numbered(50)).unwrap();
        vp.scroll_down(10);
        vp.search("line 4");
        assert!(vp.has_active_search());

        vp.set_content(Path::new("/d/b.md"), numbered(20)).unwrap();
        assert_eq!(vp.scroll_offset(), 0);
        assert!(!vp.has_active_search());
        assert_eq!(vp.file_name().as_deref(), Some("b.md"));
    }

    #[test]
    fn scroll_offset_stays_in_range() {
        let mut vp = viewport(5);
        vp.set_content(Path::new("/d/a.md"), numbered(12)).unwrap();
        vp.scroll_down(100);
        assert_eq!(vp.scroll_offset(), 7);
        assert_eq!(vp.scroll_percent(), 100);
        vp.scroll_up(100);
        assert_eq!(vp.scroll_offset(), 0);
        vp.half_page_down();
        assert_eq!(vp.scroll_offset(), 2);
        vp.goto_bottom();
        assert_eq!(vp.visible_lines().len(), 5);
        assert_eq!(line_text(&vp.visible_lines()[4]), "line 11");
        vp.goto_top();
        assert_eq!(line_text(&vp.visible_lines()[0]), "line 0");
    }

    #[test]
    fn growing_the_panel_clamps_scroll() {
        let mut vp = viewport(5);
        vp.set_content(Path::new("/d/a.md"), numbered(12)).unwrap();
        vp.goto_bottom();
        vp.resize(40, 10);
        assert_eq!(vp.scroll_offset(), 2);
        vp.resize(40, 50);
        assert_eq!(vp.scroll_offset(), 0);
    }

    #[test]
    fn short_content_never_scrolls() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), numbered(3)).unwrap();
        vp.scroll_down(1);
        assert_eq!(vp.scroll_offset(), 0);
    }

    #[test]
    fn error_panel_replaces_content() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), numbered(3)).unwrap();
        vp.search("line");
        vp.set_error(Path::new("/d/gone.md"), "No such file");
        assert_eq!(vp.error(), Some("No such file"));
        assert!(!vp.has_document());
        assert!(!vp.has_active_search());
        let text: Vec<String> = vp.visible_lines().iter().map(line_text).collect();
        assert!(text.iter().any(|l| l.contains("No such file")));
    }

    #[test]
    fn render_failure_shows_error() {
        let mut vp = Viewport::new(Box::new(FailingRenderer));
        vp.resize(40, 10);
        let result = vp.set_content(Path::new("/d/a.md"), "boom".into());
        assert!(matches!(result, Err(AppError::Render(_))));
        assert!(vp.error().is_some());
    }

    #[test]
    fn search_scenario_and_wraparound() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), "hi\nhello world\nhello again".into())
            .unwrap();
        vp.search("hello");
        let state = vp.search_state().unwrap();
        assert_eq!(state.match_lines(), &[1, 2]);
        vp.previous_match();
        assert_eq!(vp.search_state().unwrap().current_index(), 1);
        vp.next_match();
        assert_eq!(vp.search_state().unwrap().current_index(), 0);
    }

    #[test]
    fn highlight_is_drawn_and_cleared() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), "say hello".into()).unwrap();
        vp.search("hello");
        let spans = &vp.visible_lines()[0].spans;
        assert_eq!(spans[1].content, "hello");
        assert!(spans[1]
            .style
            .add_modifier
            .contains(ratatui::style::Modifier::REVERSED));

        vp.clear_search();
        assert_eq!(vp.visible_lines()[0].spans.len(), 1);
    }

    #[test]
    fn next_match_scrolls_near_the_match() {
        let mut vp = viewport(10);
        let mut doc = numbered(100);
        doc.push_str("\nneedle");
        vp.set_content(Path::new("/d/a.md"), doc).unwrap();
        vp.search("needle");
        assert_eq!(vp.scroll_offset(), 91);
    }

    #[test]
    fn search_input_commit_and_cancel() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), "alpha\nbeta".into()).unwrap();

        vp.begin_search();
        for c in "beta".chars() {
            vp.push_search_char(c);
        }
        vp.commit_search();
        assert!(!vp.is_search_input());
        assert_eq!(vp.search_state().unwrap().match_lines(), &[1]);

        vp.begin_search();
        vp.push_search_char('x');
        vp.pop_search_char();
        vp.push_search_char('a');
        assert_eq!(vp.search_input(), Some("a"));
        vp.cancel_search();
        assert_eq!(vp.search_state().unwrap().query(), "beta");

        vp.begin_search();
        vp.commit_search();
        assert_eq!(vp.search_state().unwrap().query(), "beta");
    }

    #[test]
    fn search_needs_a_document() {
        let mut vp = viewport(10);
        vp.begin_search();
        assert!(!vp.is_search_input());
    }

    #[test]
    fn resize_keeps_highlight() {
        let mut vp = viewport(10);
        vp.set_content(Path::new("/d/a.md"), "say hello".into()).unwrap();
        vp.search("hello");
        vp.resize(60, 10);
        assert_eq!(vp.visible_lines()[0].spans[1].content, "hello");
    }
}
