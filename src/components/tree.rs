use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::tree::{FlatItem, TreeState};
use crate::theme::ThemeColors;

const EXPANDED: &str = "▾ ";
const COLLAPSED: &str = "▸ ";
const SELECTED_MARK: &str = " ◀";

/// Tree widget that renders the Markdown tree with box-drawing characters.
pub struct TreeWidget<'a> {
    tree_state: &'a TreeState,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree_state: &'a TreeState, theme: &'a ThemeColors) -> Self {
        Self {
            tree_state,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Connector prefix for a row. Continuation bars are drawn for every
    /// ancestor level that still has siblings below it.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        if item.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..item.depth {
            let mut ancestor_is_last = false;
            for row in items[..item_index].iter().rev() {
                if row.depth == d {
                    ancestor_is_last = row.is_last_sibling;
                    break;
                }
                if row.depth < d {
                    break;
                }
            }
            prefix.push_str(if ancestor_is_last { "    " } else { "│   " });
        }
        prefix.push_str(if item.is_last_sibling { "└── " } else { "├── " });
        prefix
    }

    fn empty_message(&self) -> &'static str {
        if !self.tree_state.filter_query.is_empty() {
            "No files match the filter"
        } else if self.tree_state.is_empty() {
            "No Markdown files found"
        } else {
            ""
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.tree_state.flat_items;
        let visible_height = inner_area.height as usize;
        if visible_height == 0 {
            return;
        }

        if items.is_empty() {
            let line = Line::from(Span::styled(
                self.empty_message(),
                Style::default()
                    .fg(self.theme.muted_fg)
                    .add_modifier(Modifier::ITALIC),
            ));
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            return;
        }

        let selected = self.tree_state.selected_index;
        let scroll = self.tree_state.scroll_offset;
        let indicator_style = Style::default().fg(self.theme.tree_indicator_fg);

        for (i, (idx, item)) in items
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible_height)
            .enumerate()
        {
            let y = inner_area.y + i as u16;
            let is_selected = idx == selected;

            let name_style = if is_selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if item.is_dir {
                Style::default()
                    .fg(self.theme.tree_dir_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };

            let marker = match (item.is_dir, item.is_expanded) {
                (true, true) => EXPANDED,
                (true, false) => COLLAPSED,
                (false, _) => "  ",
            };

            let mut spans = vec![
                Span::styled(Self::build_prefix(item, items, idx), indicator_style),
                Span::styled(marker, indicator_style),
                Span::styled(item.name.clone(), name_style),
            ];
            if is_selected {
                spans.push(Span::styled(SELECTED_MARK, indicator_style));
            }

            buf.set_line(inner_area.x, y, &Line::from(spans), inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::scanner::ScanPolicy;
    use crate::theme::dark_theme;
    use std::fs;
    use tempfile::TempDir;

    fn row_text(buf: &Buffer, y: u16) -> String {
        let width = buf.area.width;
        (0..width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn render(state: &TreeState, width: u16, height: u16) -> Buffer {
        let theme = dark_theme();
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(state, &theme).render(area, &mut buf);
        buf
    }

    fn sample() -> (TempDir, TreeState) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/api")).unwrap();
        fs::write(dir.path().join("docs/api/ref.md"), "").unwrap();
        fs::write(dir.path().join("docs/guide.md"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        let state = TreeState::scan(dir.path(), ScanPolicy::default()).unwrap();
        (dir, state)
    }

    #[test]
    fn renders_indicators_and_selection_mark() {
        let (_dir, state) = sample();
        let buf = render(&state, 40, 5);
        assert_eq!(row_text(&buf, 0), "▸ docs ◀");
        assert_eq!(row_text(&buf, 1), "  README.md");
    }

    #[test]
    fn renders_connectors_for_nested_rows() {
        let (_dir, mut state) = sample();
        state.toggle_selected();
        state.move_selection(1);
        state.toggle_selected();
        state.select_last();
        let buf = render(&state, 40, 6);
        assert_eq!(row_text(&buf, 0), "▾ docs");
        assert_eq!(row_text(&buf, 1), "├── ▾ api");
        assert_eq!(row_text(&buf, 2), "│   └──   ref.md");
        assert_eq!(row_text(&buf, 3), "└──   guide.md");
        assert_eq!(row_text(&buf, 4), "  README.md ◀");
    }

    #[test]
    fn empty_tree_shows_message() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let state = TreeState::scan(dir.path(), ScanPolicy::default()).unwrap();
        let buf = render(&state, 40, 3);
        assert_eq!(row_text(&buf, 0), "No Markdown files found");
    }

    #[test]
    fn filter_without_matches_shows_message() {
        let (_dir, mut state) = sample();
        state.set_filter("zzz");
        let buf = render(&state, 40, 3);
        assert_eq!(row_text(&buf, 0), "No files match the filter");
    }
}
