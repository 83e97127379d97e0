use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::preview::viewport::Viewport;
use crate::theme::ThemeColors;

/// Panel title: the file name plus the scroll position.
pub fn preview_title(viewport: &Viewport) -> String {
    match viewport.file_name() {
        Some(name) if viewport.has_document() => {
            format!(" {} · {}% ", name, viewport.scroll_percent())
        }
        Some(name) => format!(" {name} "),
        None => " Preview ".to_string(),
    }
}

/// Preview widget that draws the viewport's visible lines.
pub struct PreviewWidget<'a> {
    viewport: &'a Viewport,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(viewport: &'a Viewport, theme: &'a ThemeColors) -> Self {
        Self {
            viewport,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines = self.viewport.visible_lines();
        if lines.is_empty() {
            let line = Line::from(Span::styled(
                "Nothing to show",
                Style::default().fg(self.theme.muted_fg),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        for (i, line) in lines.iter().take(inner.height as usize).enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}
