use std::path::Path;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus, InputMode};
use crate::components::help::HelpOverlay;
use crate::components::preview::{preview_title, PreviewWidget};
use crate::components::status_bar::{HintSet, HintsWidget, StatusBarWidget};
use crate::components::tree::TreeWidget;

const TITLE: &str = "mdview";

/// Root path for the header, cut from the left with `~` when it does not
/// fit in `max` columns.
fn header_path(root: &Path, max: usize) -> String {
    let path = root.display().to_string();
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= max || max <= 10 {
        return path;
    }
    let keep = max - 1;
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("~{tail}")
}

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    if app.fullscreen {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);
        render_header(app, frame, chunks[0]);
        render_preview(app, frame, chunks[1], true);
        render_status(app, frame, chunks[2]);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);
        render_header(app, frame, chunks[0]);

        let layout = app.panel_layout();
        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(layout.tree_width as u16 + 2),
                Constraint::Min(0),
            ])
            .split(chunks[2]);

        app.tree.update_scroll(layout.content_height);
        render_tree(app, frame, panels[0]);
        render_preview(app, frame, panels[1], app.focus == Focus::Preview);
        render_status(app, frame, chunks[3]);
        frame.render_widget(HintsWidget::new(hint_set(app), &app.theme), chunks[4]);
    }

    if app.help_visible {
        frame.render_widget(HelpOverlay::new(&app.theme), area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Span::styled(
        format!(" {TITLE}"),
        Style::default()
            .fg(app.theme.accent_fg)
            .add_modifier(Modifier::BOLD),
    );
    let count = format!(" · {} files ", app.file_count);
    let budget = (area.width as usize)
        .saturating_sub(title.width() + count.width() + 2);
    let path = header_path(&app.tree.root_path, budget);

    let used = title.width() + path.width() + count.width();
    let pad = (area.width as usize).saturating_sub(used);
    let line = Line::from(vec![
        title,
        Span::raw(" ".repeat(pad)),
        Span::styled(path, Style::default().fg(app.theme.header_path_fg)),
        Span::styled(count, Style::default().fg(app.theme.muted_fg)),
    ]);
    frame.render_widget(line, area);
}

fn panel_block(app: &App, title: String, focused: bool) -> Block<'static> {
    let color = if focused {
        app.theme.border_focused_fg
    } else {
        app.theme.border_fg
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(title, Style::default().fg(app.theme.header_fg)))
}

fn render_tree(app: &App, frame: &mut Frame, area: Rect) {
    let block = panel_block(app, " Files ".to_string(), app.focus == Focus::Tree);
    let widget = TreeWidget::new(&app.tree, &app.theme).block(block);
    frame.render_widget(widget, area);
}

fn render_preview(app: &App, frame: &mut Frame, area: Rect, focused: bool) {
    let block = panel_block(app, preview_title(&app.viewport), focused);
    let widget = PreviewWidget::new(&app.viewport, &app.theme).block(block);
    frame.render_widget(widget, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let watched = app
        .watched_file
        .as_deref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());

    let mut status = StatusBarWidget::new(&app.theme)
        .loading(app.loading)
        .error(app.last_error.as_deref())
        .watching(watched.as_deref());

    status = match app.input_mode() {
        InputMode::TreeFiltering => status.prompt("Filter: ", &app.tree.filter_query),
        InputMode::PreviewSearchInput => {
            status.prompt("Search: ", app.viewport.search_input().unwrap_or_default())
        }
        InputMode::Navigating => match app.viewport.search_state() {
            Some(search) => status.search(search.query(), search.counter()),
            None => status,
        },
    };

    frame.render_widget(status, area);
}

fn hint_set(app: &App) -> HintSet {
    match app.input_mode() {
        InputMode::TreeFiltering => HintSet::Filter,
        InputMode::PreviewSearchInput => HintSet::SearchInput,
        InputMode::Navigating if app.focus == Focus::Preview => HintSet::Preview,
        InputMode::Navigating => HintSet::Tree,
    }
}
