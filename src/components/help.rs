use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::theme::ThemeColors;

/// A single keybinding entry for display.
struct KeyEntry {
    key: &'static str,
    description: &'static str,
}

/// A category of keybindings.
struct KeyCategory {
    name: &'static str,
    entries: &'static [KeyEntry],
}

const KEY_WIDTH: usize = 18;

const NAVIGATION_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "↑ / k",
        description: "Move up",
    },
    KeyEntry {
        key: "↓ / j",
        description: "Move down",
    },
    KeyEntry {
        key: "g / G",
        description: "First / last row",
    },
    KeyEntry {
        key: "Enter / l / →",
        description: "Open file / toggle folder",
    },
    KeyEntry {
        key: "h / ←",
        description: "Collapse folder",
    },
    KeyEntry {
        key: "Tab",
        description: "Switch panel focus",
    },
    KeyEntry {
        key: "i",
        description: "Toggle ignored directories",
    },
];

const PREVIEW_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "↑ / k, ↓ / j",
        description: "Scroll one line",
    },
    KeyEntry {
        key: "PgUp / Ctrl+u",
        description: "Scroll up half page",
    },
    KeyEntry {
        key: "PgDn / Ctrl+d",
        description: "Scroll down half page",
    },
    KeyEntry {
        key: "g",
        description: "Go to top",
    },
    KeyEntry {
        key: "G",
        description: "Go to bottom",
    },
    KeyEntry {
        key: "f",
        description: "Toggle fullscreen mode",
    },
];

const FILTER_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "/",
        description: "Enter filter mode (file tree)",
    },
    KeyEntry {
        key: "Esc",
        description: "Clear filter / exit",
    },
    KeyEntry {
        key: "Enter",
        description: "Accept filter",
    },
];

const SEARCH_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "/",
        description: "Search in content (preview)",
    },
    KeyEntry {
        key: "n",
        description: "Next match",
    },
    KeyEntry {
        key: "N",
        description: "Previous match",
    },
    KeyEntry {
        key: "Esc",
        description: "Clear search",
    },
];

const GENERAL_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "?",
        description: "Toggle this help",
    },
    KeyEntry {
        key: "q / Ctrl+c",
        description: "Quit",
    },
];

const CATEGORIES: &[KeyCategory] = &[
    KeyCategory {
        name: "Navigation",
        entries: NAVIGATION_KEYS,
    },
    KeyCategory {
        name: "Preview",
        entries: PREVIEW_KEYS,
    },
    KeyCategory {
        name: "File Tree Filter",
        entries: FILTER_KEYS,
    },
    KeyCategory {
        name: "Preview Search",
        entries: SEARCH_KEYS,
    },
    KeyCategory {
        name: "General",
        entries: GENERAL_KEYS,
    },
];

/// Plain-text key reference for `mdview help`.
pub fn reference_text() -> String {
    let mut out = String::new();
    for category in CATEGORIES {
        out.push_str(category.name);
        out.push('\n');
        for entry in category.entries {
            out.push_str(&format!(
                "  {:<width$}{}\n",
                entry.key,
                entry.description,
                width = KEY_WIDTH
            ));
        }
        out.push('\n');
    }
    out
}

/// Help overlay widget showing all keybindings.
pub struct HelpOverlay<'a> {
    theme: &'a ThemeColors,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a ThemeColors) -> Self {
        Self { theme }
    }

    fn build_content_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = vec![
            Line::from(Span::styled(
                "Keyboard Shortcuts",
                Style::default()
                    .fg(self.theme.accent_fg)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        for category in CATEGORIES {
            lines.push(Line::from(Span::styled(
                category.name,
                Style::default()
                    .fg(self.theme.header_fg)
                    .add_modifier(Modifier::BOLD),
            )));

            for entry in category.entries {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {:<width$}", entry.key, width = KEY_WIDTH),
                        Style::default().fg(self.theme.status_key_fg),
                    ),
                    Span::styled(entry.description, Style::default().fg(self.theme.muted_fg)),
                ]));
            }

            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            "Press ? or Esc to close",
            Style::default().fg(self.theme.subtle_fg),
        )));
        lines
    }

    pub fn total_lines() -> usize {
        // title, blank, footer, and a header plus blank per category
        3 + CATEGORIES
            .iter()
            .map(|c| c.entries.len() + 2)
            .sum::<usize>()
    }
}

impl<'a> Widget for HelpOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let content_lines = self.build_content_lines();

        let overlay_width = 56.min(area.width);
        let overlay_height = (content_lines.len() as u16 + 2).min(area.height);
        let x = area.x + area.width.saturating_sub(overlay_width) / 2;
        let y = area.y + area.height.saturating_sub(overlay_height) / 2;
        let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_focused_fg))
            .style(Style::default().bg(self.theme.help_bg));
        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        for (i, line) in content_lines
            .iter()
            .take(inner.height as usize)
            .enumerate()
        {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }
    }
}
